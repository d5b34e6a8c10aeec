//! Canvas snapshot domain models.
//!
//! A [`CanvasState`] is the whole canvas at one instant. It is plain data:
//! every edit produces a new value, and the history and save layers keep their
//! own copies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Display position of a node on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A single component placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasNode {
    /// Unique node identifier
    pub id: String,
    /// Component kind (e.g. "database", "frontend", "queue")
    pub kind: String,
    /// Display position
    pub position: Position,
    /// Domain attributes of the component
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Value>,
}

impl CanvasNode {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            position,
            data: BTreeMap::new(),
        }
    }

    /// Returns a copy of this node with an extra domain attribute.
    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// A directed link between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasConnection {
    pub id: String,
    /// Source node ID
    pub source: String,
    /// Target node ID
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CanvasConnection {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: None,
        }
    }
}

/// The complete canvas at one instant.
///
/// Equality is structural. The `with_*`/`without_*` helpers return new
/// snapshots and leave the receiver untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasState {
    #[serde(default)]
    pub nodes: Vec<CanvasNode>,
    #[serde(default)]
    pub connections: Vec<CanvasConnection>,
    /// Builder metadata (selected template, project name, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl CanvasState {
    /// Creates a canvas with no nodes and no connections.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }

    /// Looks up a node by ID.
    pub fn node(&self, id: &str) -> Option<&CanvasNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns a snapshot with `node` appended, replacing any node with the same ID.
    pub fn with_node(&self, node: CanvasNode) -> Self {
        let mut next = self.clone();
        match next.nodes.iter_mut().find(|n| n.id == node.id) {
            Some(existing) => *existing = node,
            None => next.nodes.push(node),
        }
        next
    }

    /// Returns a snapshot without the node and without any connection touching it.
    pub fn without_node(&self, node_id: &str) -> Self {
        let mut next = self.clone();
        next.nodes.retain(|n| n.id != node_id);
        next.connections
            .retain(|c| c.source != node_id && c.target != node_id);
        next
    }

    /// Returns a snapshot with the node moved; unchanged if the node is unknown.
    pub fn with_node_moved(&self, node_id: &str, position: Position) -> Self {
        let mut next = self.clone();
        if let Some(node) = next.nodes.iter_mut().find(|n| n.id == node_id) {
            node.position = position;
        }
        next
    }

    /// Returns a snapshot with `connection` added, replacing any connection with the same ID.
    pub fn with_connection(&self, connection: CanvasConnection) -> Self {
        let mut next = self.clone();
        match next.connections.iter_mut().find(|c| c.id == connection.id) {
            Some(existing) => *existing = connection,
            None => next.connections.push(connection),
        }
        next
    }

    pub fn without_connection(&self, connection_id: &str) -> Self {
        let mut next = self.clone();
        next.connections.retain(|c| c.id != connection_id);
        next
    }

    pub fn with_metadata(&self, key: impl Into<String>, value: Value) -> Self {
        let mut next = self.clone();
        next.metadata.insert(key.into(), value);
        next
    }

    /// True when every node and connection of `other` is present in `self`
    /// with an identical value.
    ///
    /// Metadata is compared the same way: every key of `other` must map to an
    /// equal value here.
    pub fn contains(&self, other: &CanvasState) -> bool {
        other.nodes.iter().all(|n| self.nodes.contains(n))
            && other.connections.iter().all(|c| self.connections.contains(c))
            && other
                .metadata
                .iter()
                .all(|(k, v)| self.metadata.get(k) == Some(v))
    }

    /// Approximate byte cost of this snapshot (serialized JSON length).
    ///
    /// Diagnostics only.
    pub fn approximate_size(&self) -> usize {
        serde_json::to_vec(self).map(|bytes| bytes.len()).unwrap_or(0)
    }
}
