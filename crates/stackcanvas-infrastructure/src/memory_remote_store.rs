//! In-memory remote save store.
//!
//! Behaves like the hosted backend (owner-namespaced records, `upsert`
//! returning the stored row) with optional latency and failure injection.

use async_trait::async_trait;
use stackcanvas_core::error::{CanvasError, Result};
use stackcanvas_core::save::{RemoteSaveStore, SaveOrigin, SaveRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct Shared {
    records: Mutex<HashMap<String, SaveRecord>>,
    upserts: Mutex<Vec<SaveRecord>>,
    fetch_count: AtomicUsize,
    latency: Mutex<Option<Duration>>,
    offline: AtomicBool,
}

#[derive(Clone, Default)]
pub struct InMemoryRemoteSaveStore {
    shared: Arc<Shared>,
}

impl InMemoryRemoteSaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call by `latency` (uses tokio time, so paused-clock tests
    /// stay deterministic).
    pub fn with_latency(self, latency: Duration) -> Self {
        self.set_latency(Some(latency));
        self
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        *self
            .shared
            .latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Makes every call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.store(offline, Ordering::SeqCst);
    }

    /// Writes a record directly, bypassing latency and failure settings.
    ///
    /// Simulates another tab or device saving for the same owner.
    pub fn insert(&self, owner_id: &str, record: SaveRecord) {
        self.records().insert(owner_id.to_string(), record);
    }

    /// Every record accepted by `upsert`, in order.
    pub fn upserts(&self) -> Vec<SaveRecord> {
        self.shared
            .upserts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.shared.fetch_count.load(Ordering::SeqCst)
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, SaveRecord>> {
        self.shared
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_network(&self) -> Result<()> {
        let latency = *self
            .shared
            .latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.shared.offline.load(Ordering::SeqCst) {
            return Err(CanvasError::remote("Network unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteSaveStore for InMemoryRemoteSaveStore {
    async fn fetch(&self, owner_id: &str) -> Result<Option<SaveRecord>> {
        self.shared.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.simulate_network().await?;
        Ok(self.records().get(owner_id).cloned())
    }

    async fn upsert(&self, owner_id: &str, record: &SaveRecord) -> Result<SaveRecord> {
        self.simulate_network().await?;
        let mut stored = record.clone().with_origin(SaveOrigin::Remote);
        stored.owner_id = Some(owner_id.to_string());

        self.records().insert(owner_id.to_string(), stored.clone());
        self.shared
            .upserts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, owner_id: &str) -> Result<()> {
        self.simulate_network().await?;
        self.records().remove(owner_id);
        Ok(())
    }
}
