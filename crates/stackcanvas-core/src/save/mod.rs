//! Canvas persistence domain module.
//!
//! # Module Structure
//!
//! - `model`: Save records, the save-status state machine and save events
//! - `reconcile`: Rules for comparing local and remote saves
//! - `repository`: Store traits for the local and remote destinations

mod model;
mod reconcile;
mod repository;

// Re-export public API
pub use model::{
    ConflictPayload, SaveEvent, SaveOrigin, SaveRecord, SaveStatus, SaveStatusSnapshot,
};
pub use reconcile::{Reconciliation, reconcile};
pub use repository::{LocalSaveStore, RemoteSaveStore};
