//! Canvas edit history.
//!
//! # Module Structure
//!
//! - `model`: History entry types (`HistoryEntry`, `ActionType`, `HistorySummary`)
//! - `manager`: The bounded undo/redo log (`HistoryManager`)

mod manager;
mod model;

// Re-export public API
pub use manager::HistoryManager;
pub use model::{ActionType, HistoryEntry, HistoryMetadata, HistorySummary, NODE_ID_KEY};
