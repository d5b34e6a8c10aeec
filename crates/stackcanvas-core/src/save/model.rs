use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::CanvasState;

/// Which destination a save record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOrigin {
    Local,
    Remote,
}

/// A persisted canvas snapshot.
///
/// Local and remote records are independent; they only converge when a save
/// succeeds against both destinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    pub state: CanvasState,
    pub saved_at: DateTime<Utc>,
    pub origin: SaveOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl SaveRecord {
    pub fn local(state: CanvasState, saved_at: DateTime<Utc>, owner_id: Option<String>) -> Self {
        Self {
            state,
            saved_at,
            origin: SaveOrigin::Local,
            owner_id,
        }
    }

    pub fn remote(state: CanvasState, saved_at: DateTime<Utc>, owner_id: Option<String>) -> Self {
        Self {
            state,
            saved_at,
            origin: SaveOrigin::Remote,
            owner_id,
        }
    }

    /// Same record, relabelled for the other destination.
    pub fn with_origin(mut self, origin: SaveOrigin) -> Self {
        self.origin = origin;
        self
    }
}

/// Save-status state machine.
///
/// ```text
/// idle ──▶ saving ──▶ saved
///            │
///            └──▶ error
/// idle/saved ──▶ conflict ──(resolve)──▶ saving
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
    Conflict,
}

impl SaveStatus {
    /// Text shown next to the save indicator.
    pub fn label(&self) -> &'static str {
        match self {
            SaveStatus::Idle => "",
            SaveStatus::Saving => "Saving…",
            SaveStatus::Saved => "Saved",
            SaveStatus::Error => "Save failed — retry",
            SaveStatus::Conflict => "Conflict detected",
        }
    }
}

/// Point-in-time view of the save state machine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStatusSnapshot {
    pub status: SaveStatus,
    pub last_saved: Option<DateTime<Utc>>,
    pub has_unsaved_changes: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Local and remote saves that could not be reconciled automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictPayload {
    pub local_save: SaveRecord,
    pub remote_save: SaveRecord,
}

/// Notifications published by the auto-save service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SaveEvent {
    /// A save was requested (debounced or forced)
    SaveStart { forced: bool },
    /// The pending snapshot reached every configured destination
    SaveSuccess {
        saved_at: DateTime<Utc>,
        /// Whether the remote destination was written as well
        remote: bool,
    },
    SaveError { message: String },
    /// A local save exists that the remote store does not know about
    RestoreAvailable { local_save: SaveRecord },
    ConflictDetected {
        local_save: SaveRecord,
        remote_save: SaveRecord,
    },
}

impl SaveEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SaveEvent::SaveStart { .. } => "save_start",
            SaveEvent::SaveSuccess { .. } => "save_success",
            SaveEvent::SaveError { .. } => "save_error",
            SaveEvent::RestoreAvailable { .. } => "restore_available",
            SaveEvent::ConflictDetected { .. } => "conflict_detected",
        }
    }
}
