//! Domain layer for StackCanvas.
//!
//! Pure data and in-memory logic: canvas snapshots, the undo/redo history, the
//! save model with its reconciliation rules, and the traits the persistence
//! layer implements. Nothing here performs I/O.

pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod identity;
pub mod save;
pub mod snapshot;

// Re-export common types
pub use error::{CanvasError, Result};
pub use history::{ActionType, HistoryManager};
pub use snapshot::CanvasState;
