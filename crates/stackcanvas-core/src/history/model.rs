use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::snapshot::CanvasState;

/// Free-form metadata attached to a history entry (e.g. the moved node ID).
pub type HistoryMetadata = BTreeMap<String, Value>;

/// Metadata key naming the node an action applied to.
///
/// Drag coalescing only merges consecutive `move_node` entries carrying the
/// same value under this key.
pub const NODE_ID_KEY: &str = "node_id";

/// The kind of edit that produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Seed entry created from the session's starting snapshot
    Initial,
    AddNode,
    RemoveNode,
    MoveNode,
    UpdateNode,
    Connect,
    Disconnect,
    Import,
    LoadTemplate,
    ClearAll,
    Unknown,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Initial => "initial",
            ActionType::AddNode => "add_node",
            ActionType::RemoveNode => "remove_node",
            ActionType::MoveNode => "move_node",
            ActionType::UpdateNode => "update_node",
            ActionType::Connect => "connect",
            ActionType::Disconnect => "disconnect",
            ActionType::Import => "import",
            ActionType::LoadTemplate => "load_template",
            ActionType::ClearAll => "clear_all",
            ActionType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snapshot tagged with the action that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub state: CanvasState,
    pub action_type: ActionType,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HistoryMetadata>,
}

impl HistoryEntry {
    pub fn new(
        state: CanvasState,
        action_type: ActionType,
        metadata: Option<HistoryMetadata>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            state,
            action_type,
            timestamp,
            metadata,
        }
    }

    /// The node this entry's action applied to, if recorded.
    pub fn node_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(NODE_ID_KEY))
            .and_then(Value::as_str)
    }
}

/// Diagnostic view of the history log, for toolbars and debug panels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub can_undo: bool,
    pub can_redo: bool,
    pub current_index: usize,
    pub total_entries: usize,
    pub last_action: ActionType,
    /// Approximate bytes held by all entry snapshots
    pub memory_usage: usize,
}
