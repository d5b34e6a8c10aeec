//! Save store traits.
//!
//! Defines the interfaces for the two persistence destinations of the
//! auto-save service.

use async_trait::async_trait;

use super::model::SaveRecord;
use crate::error::Result;

/// Fast, session-local persistence (browser storage, a file on disk, ...).
///
/// The store is synchronous so that `has_local_save` can answer before any
/// network call completes.
///
/// # Implementation Notes
///
/// Implementations should handle:
/// - Atomic replacement of an existing record
/// - Treating a missing record as `Ok(None)`, not as an error
pub trait LocalSaveStore: Send + Sync {
    /// Loads the record stored under `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(SaveRecord))`: Record found
    /// - `Ok(None)`: Nothing stored under this key
    /// - `Err(_)`: The stored payload could not be read or parsed
    fn get(&self, key: &str) -> Result<Option<SaveRecord>>;

    /// Stores `record` under `key`, replacing any previous record.
    fn set(&self, key: &str, record: &SaveRecord) -> Result<()>;

    /// Removes the record under `key`. Removing a missing record succeeds.
    fn remove(&self, key: &str) -> Result<()>;

    /// Cheap existence check.
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Durable, network-backed persistence namespaced by owner identity.
///
/// Calls may be slow or fail; the auto-save service bounds every call with a
/// timeout.
#[async_trait]
pub trait RemoteSaveStore: Send + Sync {
    /// Fetches the owner's current save.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(SaveRecord))`: Save found
    /// - `Ok(None)`: The owner has no save
    /// - `Err(_)`: Request failed
    async fn fetch(&self, owner_id: &str) -> Result<Option<SaveRecord>>;

    /// Inserts or replaces the owner's save and returns the stored record.
    async fn upsert(&self, owner_id: &str, record: &SaveRecord) -> Result<SaveRecord>;

    /// Deletes the owner's save. Deleting a missing save succeeds.
    async fn delete(&self, owner_id: &str) -> Result<()>;
}
