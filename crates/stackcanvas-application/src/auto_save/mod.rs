//! Auto-save service.
//!
//! Persists canvas snapshots to a local store and, for signed-in users, a
//! remote store. Edits are debounced and coalesced so only the latest
//! snapshot is written.

mod service;

pub use service::AutoSaveService;
