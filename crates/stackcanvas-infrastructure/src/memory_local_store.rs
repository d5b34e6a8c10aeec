//! In-memory local save store.

use stackcanvas_core::error::{CanvasError, Result};
use stackcanvas_core::save::{LocalSaveStore, SaveRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Shared {
    records: Mutex<HashMap<String, SaveRecord>>,
    writes: Mutex<Vec<(String, SaveRecord)>>,
    fail_writes: AtomicBool,
}

/// Local store kept in process memory.
///
/// Clones share the same map, so a second service built from a clone sees
/// everything the first one wrote. Every successful `set` is also appended to
/// a write log for diagnostics.
#[derive(Clone, Default)]
pub struct InMemoryLocalSaveStore {
    shared: Arc<Shared>,
}

impl InMemoryLocalSaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, SaveRecord>> {
        self.shared
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_log(&self) -> MutexGuard<'_, Vec<(String, SaveRecord)>> {
        self.shared
            .writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes subsequent `set` calls fail (simulates a full quota).
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every record written so far, in order.
    pub fn writes(&self) -> Vec<(String, SaveRecord)> {
        self.write_log().clone()
    }

    pub fn write_count(&self) -> usize {
        self.write_log().len()
    }
}

impl LocalSaveStore for InMemoryLocalSaveStore {
    fn get(&self, key: &str) -> Result<Option<SaveRecord>> {
        Ok(self.records().get(key).cloned())
    }

    fn set(&self, key: &str, record: &SaveRecord) -> Result<()> {
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(CanvasError::data_access("Local storage quota exceeded"));
        }
        self.records().insert(key.to_string(), record.clone());
        self.write_log().push((key.to_string(), record.clone()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.records().remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.records().contains_key(key))
    }
}
