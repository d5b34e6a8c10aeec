use chrono::Utc;
use stackcanvas_core::config::AutoSaveConfig;
use stackcanvas_core::error::{CanvasError, Result};
use stackcanvas_core::events::{EventBus, ListenerHandle};
use stackcanvas_core::identity::{AnonymousIdentity, IdentityProvider};
use stackcanvas_core::save::{
    ConflictPayload, LocalSaveStore, Reconciliation, RemoteSaveStore, SaveEvent, SaveOrigin,
    SaveRecord, SaveStatus, SaveStatusSnapshot, reconcile,
};
use stackcanvas_core::snapshot::CanvasState;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Mutable part of the save state machine.
///
/// Guarded by a `std::sync::Mutex` that is never held across an await or
/// while listeners run.
#[derive(Default)]
struct SaveState {
    status: SaveStatus,
    last_saved: Option<chrono::DateTime<Utc>>,
    has_unsaved_changes: bool,
    last_error: Option<String>,
    /// Latest snapshot not yet durably written
    pending: Option<CanvasState>,
    /// Cancels the running debounce timer
    debounce: Option<CancellationToken>,
    conflict: Option<ConflictPayload>,
    /// Last remote record this service fetched or wrote
    remote_baseline: Option<SaveRecord>,
}

struct Inner {
    session_key: String,
    local: Arc<dyn LocalSaveStore>,
    remote: Option<Arc<dyn RemoteSaveStore>>,
    identity: Arc<dyn IdentityProvider>,
    config: AutoSaveConfig,
    state: Mutex<SaveState>,
    events: EventBus<SaveEvent>,
    /// Serializes writes; a second writer picks up whatever is pending once
    /// the first one settles.
    write_lock: tokio::sync::Mutex<()>,
}

enum WriteOutcome {
    Saved { remote: bool },
    Conflict(ConflictPayload),
}

/// Debounced, conflict-aware persistence of canvas snapshots.
///
/// `AutoSaveService` is responsible for:
/// - Debouncing rapid edits into a single write (latest snapshot wins)
/// - Writing to the local store, then the remote store when an owner is known
/// - Driving the `idle / saving / saved / error / conflict` state machine
/// - Publishing [`SaveEvent`]s to registered listeners
///
/// One instance serves one canvas-editing session. Clones share state.
#[derive(Clone)]
pub struct AutoSaveService {
    inner: Arc<Inner>,
}

impl AutoSaveService {
    /// Creates a local-only service.
    ///
    /// # Arguments
    ///
    /// * `session_key` - Key of this session's record in the local store
    /// * `local` - Local persistence backend
    /// * `config` - Debounce and timeout settings
    pub fn new(
        session_key: impl Into<String>,
        local: Arc<dyn LocalSaveStore>,
        config: AutoSaveConfig,
    ) -> Self {
        Self::build(
            session_key.into(),
            local,
            None,
            Arc::new(AnonymousIdentity),
            config,
        )
    }

    /// Creates a service that also persists to `remote` whenever `identity`
    /// yields an owner.
    pub fn with_remote(
        session_key: impl Into<String>,
        local: Arc<dyn LocalSaveStore>,
        remote: Arc<dyn RemoteSaveStore>,
        identity: Arc<dyn IdentityProvider>,
        config: AutoSaveConfig,
    ) -> Self {
        Self::build(session_key.into(), local, Some(remote), identity, config)
    }

    fn build(
        session_key: String,
        local: Arc<dyn LocalSaveStore>,
        remote: Option<Arc<dyn RemoteSaveStore>>,
        identity: Arc<dyn IdentityProvider>,
        config: AutoSaveConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                session_key,
                local,
                remote,
                identity,
                config,
                state: Mutex::new(SaveState::default()),
                events: EventBus::new(),
                write_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn session_key(&self) -> &str {
        &self.inner.session_key
    }

    pub fn config(&self) -> &AutoSaveConfig {
        &self.inner.config
    }

    fn lock_state(&self) -> MutexGuard<'_, SaveState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SaveEvent) {
        self.inner.events.emit(&event);
    }

    /// Remote store and owner for this call, if remote persistence applies.
    fn remote_target(&self) -> Option<(Arc<dyn RemoteSaveStore>, String)> {
        let store = self.inner.remote.clone()?;
        let owner_id = self.inner.identity.owner_id()?;
        Some((store, owner_id))
    }

    /// Runs a remote call under the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let limit = self.inner.config.remote_timeout();
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(CanvasError::timeout(operation, limit.as_millis() as u64)),
        }
    }

    // ============================================================================
    // Lifecycle
    // ============================================================================

    /// Loads the local save and, when an owner is known, the remote save.
    ///
    /// Ends in `conflict` (with a `conflict_detected` event) when both exist
    /// and neither contains the other. A local save without a remote
    /// counterpart emits `restore_available`. A failed remote fetch is logged
    /// and treated as local-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the local payload cannot be read or parsed.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.inner.write_lock.lock().await;

        let local = self.inner.local.get(&self.inner.session_key)?;
        let remote = self.fetch_remote_lenient().await;

        let event = {
            let mut state = self.lock_state();
            match (local, remote) {
                (Some(local), Some(remote)) => match reconcile(&local, &remote) {
                    Reconciliation::Conflict => {
                        state.status = SaveStatus::Conflict;
                        state.conflict = Some(ConflictPayload {
                            local_save: local.clone(),
                            remote_save: remote.clone(),
                        });
                        Some(SaveEvent::ConflictDetected {
                            local_save: local,
                            remote_save: remote,
                        })
                    }
                    resolved => {
                        tracing::debug!(
                            "[AutoSave] Local and remote saves reconciled as {:?}",
                            resolved
                        );
                        state.status = SaveStatus::Idle;
                        state.remote_baseline = Some(remote);
                        None
                    }
                },
                (Some(local), None) => {
                    state.status = SaveStatus::Idle;
                    Some(SaveEvent::RestoreAvailable { local_save: local })
                }
                (None, remote) => {
                    state.status = SaveStatus::Idle;
                    state.remote_baseline = remote;
                    None
                }
            }
        };

        if let Some(event) = event {
            match &event {
                SaveEvent::ConflictDetected { .. } => tracing::info!(
                    "[AutoSave] Conflict detected for session '{}'",
                    self.inner.session_key
                ),
                _ => tracing::info!(
                    "[AutoSave] Restorable local save found for session '{}'",
                    self.inner.session_key
                ),
            }
            self.emit(event);
        }

        Ok(())
    }

    /// Fetches the remote save, logging and swallowing failures.
    async fn fetch_remote_lenient(&self) -> Option<SaveRecord> {
        let (store, owner_id) = self.remote_target()?;
        match self
            .bounded("fetch remote save", store.fetch(&owner_id))
            .await
        {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(
                    "[AutoSave] Remote fetch failed, continuing local-only: {}",
                    err
                );
                self.lock_state().last_error = Some(err.to_string());
                None
            }
        }
    }

    // ============================================================================
    // Saving
    // ============================================================================

    /// Requests persistence of `state`.
    ///
    /// Non-forced calls restart the debounce timer and return immediately;
    /// only the latest snapshot is written once the quiet period elapses.
    /// Forced calls cancel the timer and return after the write settles.
    /// Failures are reported through status and events, never returned.
    pub async fn auto_save(&self, state: CanvasState, force: bool) {
        let in_conflict = {
            let mut save_state = self.lock_state();
            save_state.pending = Some(state);
            save_state.has_unsaved_changes = true;
            if let Some(token) = save_state.debounce.take() {
                token.cancel();
            }
            let in_conflict = save_state.status == SaveStatus::Conflict;
            if !in_conflict {
                save_state.status = SaveStatus::Saving;
            }
            in_conflict
        };

        if in_conflict {
            tracing::debug!("[AutoSave] Conflict unresolved, snapshot kept pending");
            return;
        }

        self.emit(SaveEvent::SaveStart { forced: force });

        if force {
            self.write_pending().await;
        } else {
            self.schedule_debounced_write();
        }
    }

    fn schedule_debounced_write(&self) {
        let token = CancellationToken::new();
        self.lock_state().debounce = Some(token.clone());

        let delay = self.inner.config.debounce();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        tracing::debug!("[AutoSave] Debounce timer (re)started: {:?}", delay);

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Some(inner) = weak.upgrade() {
                        AutoSaveService { inner }.write_pending().await;
                    }
                }
            }
        });
    }

    /// Writes any pending snapshot now, cancelling the debounce timer.
    pub async fn flush(&self) {
        if let Some(token) = self.lock_state().debounce.take() {
            token.cancel();
        }
        self.write_pending().await;
    }

    /// Re-attempts the snapshot that failed to save.
    pub async fn retry(&self) {
        let has_pending = {
            let mut state = self.lock_state();
            if state.status == SaveStatus::Conflict || state.pending.is_none() {
                false
            } else {
                if let Some(token) = state.debounce.take() {
                    token.cancel();
                }
                state.status = SaveStatus::Saving;
                true
            }
        };

        if has_pending {
            tracing::info!("[AutoSave] Retrying save for '{}'", self.inner.session_key);
            self.emit(SaveEvent::SaveStart { forced: true });
            self.write_pending().await;
        }
    }

    /// Takes the pending snapshot under the write lock and persists it.
    async fn write_pending(&self) {
        let _guard = self.inner.write_lock.lock().await;

        let snapshot = {
            let mut state = self.lock_state();
            if state.status == SaveStatus::Conflict {
                return;
            }
            state.pending.take()
        };
        let Some(snapshot) = snapshot else {
            return;
        };

        let owner_id = self.inner.identity.owner_id();
        let saved_at = Utc::now();
        let record = SaveRecord::local(snapshot, saved_at, owner_id);

        match self.write_record(&record).await {
            Ok(WriteOutcome::Saved { remote }) => {
                let still_pending = {
                    let mut state = self.lock_state();
                    state.last_saved = Some(saved_at);
                    state.last_error = None;
                    if state.pending.is_some() {
                        state.status = SaveStatus::Saving;
                    } else {
                        state.status = SaveStatus::Saved;
                        state.has_unsaved_changes = false;
                    }
                    state.pending.is_some()
                };
                tracing::info!(
                    "[AutoSave] Saved '{}' (remote: {}, newer pending: {})",
                    self.inner.session_key,
                    remote,
                    still_pending
                );
                self.emit(SaveEvent::SaveSuccess { saved_at, remote });
            }
            Ok(WriteOutcome::Conflict(payload)) => {
                {
                    let mut state = self.lock_state();
                    state.status = SaveStatus::Conflict;
                    state.conflict = Some(payload.clone());
                    if state.pending.is_none() {
                        state.pending = Some(record.state.clone());
                    }
                }
                tracing::info!(
                    "[AutoSave] Remote save changed elsewhere, conflict for '{}'",
                    self.inner.session_key
                );
                self.emit(SaveEvent::ConflictDetected {
                    local_save: payload.local_save,
                    remote_save: payload.remote_save,
                });
            }
            Err(err) => {
                let message = err.to_string();
                {
                    let mut state = self.lock_state();
                    state.status = SaveStatus::Error;
                    state.last_error = Some(message.clone());
                    if state.pending.is_none() {
                        state.pending = Some(record.state.clone());
                    }
                }
                tracing::warn!(
                    "[AutoSave] Save failed for '{}': {}",
                    self.inner.session_key,
                    message
                );
                self.emit(SaveEvent::SaveError { message });
            }
        }
    }

    /// Local store first, then the remote store when an owner is known.
    async fn write_record(&self, record: &SaveRecord) -> Result<WriteOutcome> {
        self.inner.local.set(&self.inner.session_key, record)?;

        let Some((store, owner_id)) = self.remote_target() else {
            return Ok(WriteOutcome::Saved { remote: false });
        };

        if self.inner.config.detect_conflicts_on_save {
            let current = self
                .bounded("fetch remote save", store.fetch(&owner_id))
                .await?;
            if let Some(current) = current {
                let seen = self
                    .lock_state()
                    .remote_baseline
                    .as_ref()
                    .is_some_and(|baseline| baseline.state == current.state);
                if !seen && current.state != record.state {
                    return Ok(WriteOutcome::Conflict(ConflictPayload {
                        local_save: record.clone(),
                        remote_save: current,
                    }));
                }
            }
        }

        let outgoing = record.clone().with_origin(SaveOrigin::Remote);
        let stored = self
            .bounded("upsert remote save", store.upsert(&owner_id, &outgoing))
            .await?;
        self.lock_state().remote_baseline = Some(stored);

        Ok(WriteOutcome::Saved { remote: true })
    }

    /// Accepts `state` as the resolution of the current conflict and
    /// force-saves it over both destinations.
    pub async fn resolve_conflict(&self, state: CanvasState) {
        {
            let mut save_state = self.lock_state();
            if let Some(conflict) = save_state.conflict.take() {
                save_state.remote_baseline = Some(conflict.remote_save);
            }
            if save_state.status == SaveStatus::Conflict {
                save_state.status = SaveStatus::Idle;
            }
        }
        tracing::info!(
            "[AutoSave] Conflict resolved for '{}'",
            self.inner.session_key
        );
        self.auto_save(state, true).await;
    }

    // ============================================================================
    // Loading and clearing
    // ============================================================================

    /// Returns the most recent reconciled snapshot, or `None` when nothing is
    /// saved or the saves are in conflict.
    ///
    /// Reads the stores directly, so a fresh service over the same storage
    /// sees every forced save made by a previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the local payload cannot be read or parsed.
    pub async fn load_save(&self) -> Result<Option<CanvasState>> {
        if self.lock_state().status == SaveStatus::Conflict {
            return Ok(None);
        }

        let local = self.inner.local.get(&self.inner.session_key)?;
        let remote = self.fetch_remote_lenient().await;

        let (loaded, conflict) = {
            let mut state = self.lock_state();
            match (local, remote) {
                (Some(local), Some(remote)) => match reconcile(&local, &remote) {
                    Reconciliation::Identical | Reconciliation::PreferLocal => {
                        state.remote_baseline = Some(remote);
                        (Some(local.state), None)
                    }
                    Reconciliation::PreferRemote => {
                        let loaded = remote.state.clone();
                        state.remote_baseline = Some(remote);
                        (Some(loaded), None)
                    }
                    Reconciliation::Conflict => {
                        let payload = ConflictPayload {
                            local_save: local,
                            remote_save: remote,
                        };
                        state.status = SaveStatus::Conflict;
                        state.conflict = Some(payload.clone());
                        (None, Some(payload))
                    }
                },
                (Some(local), None) => (Some(local.state), None),
                (None, Some(remote)) => {
                    let loaded = remote.state.clone();
                    state.remote_baseline = Some(remote);
                    (Some(loaded), None)
                }
                (None, None) => (None, None),
            }
        };

        if let Some(payload) = conflict {
            tracing::info!(
                "[AutoSave] Conflict detected while loading '{}'",
                self.inner.session_key
            );
            self.emit(SaveEvent::ConflictDetected {
                local_save: payload.local_save,
                remote_save: payload.remote_save,
            });
        }

        Ok(loaded)
    }

    /// Cancels pending work and deletes both the local and remote records.
    ///
    /// # Errors
    ///
    /// Returns an error if either store fails to delete.
    pub async fn clear_save(&self) -> Result<()> {
        if let Some(token) = self.lock_state().debounce.take() {
            token.cancel();
        }
        let _guard = self.inner.write_lock.lock().await;

        self.lock_state().pending = None;
        self.inner.local.remove(&self.inner.session_key)?;
        if let Some((store, owner_id)) = self.remote_target() {
            self.bounded("delete remote save", store.delete(&owner_id))
                .await?;
        }

        {
            let mut state = self.lock_state();
            state.status = SaveStatus::Idle;
            state.has_unsaved_changes = false;
            state.last_error = None;
            state.conflict = None;
            state.remote_baseline = None;
        }
        tracing::info!("[AutoSave] Cleared saves for '{}'", self.inner.session_key);
        Ok(())
    }

    // ============================================================================
    // Queries
    // ============================================================================

    /// Synchronous existence check on the local store.
    pub fn has_local_save(&self) -> bool {
        self.inner
            .local
            .contains(&self.inner.session_key)
            .unwrap_or_else(|err| {
                tracing::warn!("[AutoSave] Local existence check failed: {}", err);
                false
            })
    }

    pub fn save_status(&self) -> SaveStatusSnapshot {
        let state = self.lock_state();
        SaveStatusSnapshot {
            status: state.status,
            last_saved: state.last_saved,
            has_unsaved_changes: state.has_unsaved_changes,
            last_error: state.last_error.clone(),
        }
    }

    pub fn conflict(&self) -> Option<ConflictPayload> {
        self.lock_state().conflict.clone()
    }

    // ============================================================================
    // Events
    // ============================================================================

    /// Registers `handler` for every [`SaveEvent`]. Delivery follows
    /// registration order; a panicking handler does not affect the others.
    pub fn add_event_listener<F>(&self, handler: F) -> ListenerHandle
    where
        F: Fn(&SaveEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(handler)
    }

    /// Streams events into a channel, for consumers living on another task.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<SaveEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner.events.subscribe(move |event: &SaveEvent| {
            // Receiver gone; nothing left to notify.
            let _ = sender.send(event.clone());
        });
        receiver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackcanvas_core::identity::StaticIdentity;
    use stackcanvas_core::snapshot::{CanvasNode, Position};
    use stackcanvas_infrastructure::{InMemoryLocalSaveStore, InMemoryRemoteSaveStore};
    use std::time::Duration;

    fn canvas(ids: &[&str]) -> CanvasState {
        ids.iter().fold(CanvasState::empty(), |state, id| {
            state.with_node(CanvasNode::new(*id, "service", Position::new(0.0, 0.0)))
        })
    }

    fn recorded(service: &AutoSaveService) -> Arc<Mutex<Vec<&'static str>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        service.add_event_listener(move |event: &SaveEvent| sink.lock().unwrap().push(event.kind()));
        seen
    }

    fn remote_service(
        local: &InMemoryLocalSaveStore,
        remote: &InMemoryRemoteSaveStore,
    ) -> AutoSaveService {
        AutoSaveService::with_remote(
            "main",
            Arc::new(local.clone()),
            Arc::new(remote.clone()),
            Arc::new(StaticIdentity::new("owner-1")),
            AutoSaveConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_save_transitions_to_saved() {
        let local = InMemoryLocalSaveStore::new();
        let service = AutoSaveService::new("main", Arc::new(local.clone()), AutoSaveConfig::default());
        let events = recorded(&service);

        service.auto_save(canvas(&["a"]), false).await;
        let status = service.save_status();
        assert_eq!(status.status, SaveStatus::Saving);
        assert!(status.has_unsaved_changes);
        assert_eq!(local.write_count(), 0);

        tokio::time::sleep(Duration::from_millis(1600)).await;

        let status = service.save_status();
        assert_eq!(status.status, SaveStatus::Saved);
        assert!(!status.has_unsaved_changes);
        assert!(status.last_saved.is_some());
        assert_eq!(local.write_count(), 1);
        assert_eq!(*events.lock().unwrap(), vec!["save_start", "save_success"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_call_restarts_debounce_window() {
        let local = InMemoryLocalSaveStore::new();
        let service = AutoSaveService::new("main", Arc::new(local.clone()), AutoSaveConfig::default());

        service.auto_save(canvas(&["a"]), false).await;
        tokio::time::sleep(Duration::from_millis(1000)).await;
        service.auto_save(canvas(&["a", "b"]), false).await;
        tokio::time::sleep(Duration::from_millis(1000)).await;

        // 2000ms since the first call, but only 1000ms of quiet
        assert_eq!(local.write_count(), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(local.write_count(), 1);
    }

    #[tokio::test]
    async fn test_local_failure_keeps_snapshot_for_retry() {
        let local = InMemoryLocalSaveStore::new();
        local.set_fail_writes(true);
        let service = AutoSaveService::new("main", Arc::new(local.clone()), AutoSaveConfig::default());
        let events = recorded(&service);

        service.auto_save(canvas(&["a"]), true).await;
        let status = service.save_status();
        assert_eq!(status.status, SaveStatus::Error);
        assert!(status.has_unsaved_changes);
        assert!(status.last_error.unwrap().contains("quota"));

        local.set_fail_writes(false);
        service.retry().await;

        assert_eq!(service.save_status().status, SaveStatus::Saved);
        assert_eq!(local.writes()[0].1.state, canvas(&["a"]));
        assert_eq!(
            *events.lock().unwrap(),
            vec!["save_start", "save_error", "save_start", "save_success"]
        );
    }

    #[tokio::test]
    async fn test_retry_without_pending_is_noop() {
        let local = InMemoryLocalSaveStore::new();
        let service = AutoSaveService::new("main", Arc::new(local.clone()), AutoSaveConfig::default());

        service.retry().await;
        assert_eq!(service.save_status().status, SaveStatus::Idle);
        assert_eq!(local.write_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_debounced_snapshot_now() {
        let local = InMemoryLocalSaveStore::new();
        let service = AutoSaveService::new("main", Arc::new(local.clone()), AutoSaveConfig::default());

        service.auto_save(canvas(&["a"]), false).await;
        service.flush().await;
        assert_eq!(local.write_count(), 1);

        // The cancelled timer does not write again
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(local.write_count(), 1);
    }

    #[tokio::test]
    async fn test_remote_write_records_owner() {
        let local = InMemoryLocalSaveStore::new();
        let remote = InMemoryRemoteSaveStore::new();
        let service = remote_service(&local, &remote);
        let mut rx = service.subscribe_channel();

        service.auto_save(canvas(&["a"]), true).await;

        let upserts = remote.upserts();
        assert_eq!(upserts.len(), 1);
        assert_eq!(upserts[0].owner_id.as_deref(), Some("owner-1"));
        assert_eq!(rx.recv().await.unwrap().kind(), "save_start");
        assert!(matches!(
            rx.recv().await.unwrap(),
            SaveEvent::SaveSuccess { remote: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_sequential_saves_do_not_self_conflict() {
        let local = InMemoryLocalSaveStore::new();
        let remote = InMemoryRemoteSaveStore::new();
        let service = remote_service(&local, &remote);
        service.initialize().await.unwrap();

        service.auto_save(canvas(&["a"]), true).await;
        service.auto_save(canvas(&["a", "b"]), true).await;
        service.auto_save(canvas(&["b"]), true).await;

        assert_eq!(service.save_status().status, SaveStatus::Saved);
        assert_eq!(remote.upserts().len(), 3);
    }

    #[tokio::test]
    async fn test_remote_changed_elsewhere_conflicts_on_save() {
        let local = InMemoryLocalSaveStore::new();
        let remote = InMemoryRemoteSaveStore::new();
        let service = remote_service(&local, &remote);
        service.initialize().await.unwrap();

        service.auto_save(canvas(&["a"]), true).await;
        // Another device overwrites the remote save
        remote.insert(
            "owner-1",
            SaveRecord::remote(canvas(&["z"]), Utc::now(), Some("owner-1".into())),
        );
        service.auto_save(canvas(&["a", "b"]), true).await;

        assert_eq!(service.save_status().status, SaveStatus::Conflict);
        let conflict = service.conflict().unwrap();
        assert_eq!(conflict.remote_save.state, canvas(&["z"]));
        assert_eq!(conflict.local_save.state, canvas(&["a", "b"]));
        // Remote was not overwritten; local still was
        assert_eq!(remote.upserts().len(), 1);
        assert_eq!(local.get("main").unwrap().unwrap().state, canvas(&["a", "b"]));

        // Saves during a conflict are held back
        service.auto_save(canvas(&["a", "b", "c"]), true).await;
        assert_eq!(remote.upserts().len(), 1);

        service.resolve_conflict(canvas(&["a", "b", "z"])).await;
        assert_eq!(service.save_status().status, SaveStatus::Saved);
        assert!(service.conflict().is_none());
        assert_eq!(remote.upserts().last().unwrap().state, canvas(&["a", "b", "z"]));
    }

    #[tokio::test]
    async fn test_conflict_detection_can_be_disabled() {
        let local = InMemoryLocalSaveStore::new();
        let remote = InMemoryRemoteSaveStore::new();
        remote.insert(
            "owner-1",
            SaveRecord::remote(canvas(&["z"]), Utc::now(), Some("owner-1".into())),
        );
        let config = AutoSaveConfig {
            detect_conflicts_on_save: false,
            ..AutoSaveConfig::default()
        };
        let service = AutoSaveService::with_remote(
            "main",
            Arc::new(local.clone()),
            Arc::new(remote.clone()),
            Arc::new(StaticIdentity::new("owner-1")),
            config,
        );

        service.auto_save(canvas(&["a"]), true).await;
        assert_eq!(service.save_status().status, SaveStatus::Saved);
        assert_eq!(remote.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_initialize_restore_available() {
        let local = InMemoryLocalSaveStore::new();
        local
            .set("main", &SaveRecord::local(canvas(&["a"]), Utc::now(), None))
            .unwrap();
        let service = AutoSaveService::new("main", Arc::new(local), AutoSaveConfig::default());
        let events = recorded(&service);

        assert!(service.has_local_save());
        service.initialize().await.unwrap();

        assert_eq!(service.save_status().status, SaveStatus::Idle);
        assert_eq!(*events.lock().unwrap(), vec!["restore_available"]);
    }

    #[tokio::test]
    async fn test_initialize_adopts_containing_remote() {
        let local = InMemoryLocalSaveStore::new();
        let remote = InMemoryRemoteSaveStore::new();
        local
            .set("main", &SaveRecord::local(canvas(&["a"]), Utc::now(), None))
            .unwrap();
        remote.insert(
            "owner-1",
            SaveRecord::remote(canvas(&["a", "b"]), Utc::now(), Some("owner-1".into())),
        );
        let service = remote_service(&local, &remote);
        let events = recorded(&service);

        service.initialize().await.unwrap();

        assert_eq!(service.save_status().status, SaveStatus::Idle);
        assert!(events.lock().unwrap().is_empty());
        assert_eq!(service.load_save().await.unwrap(), Some(canvas(&["a", "b"])));
    }

    #[tokio::test]
    async fn test_initialize_remote_failure_degrades_to_local() {
        let local = InMemoryLocalSaveStore::new();
        let remote = InMemoryRemoteSaveStore::new();
        remote.set_offline(true);
        local
            .set("main", &SaveRecord::local(canvas(&["a"]), Utc::now(), None))
            .unwrap();
        let service = remote_service(&local, &remote);
        let events = recorded(&service);

        service.initialize().await.unwrap();

        let status = service.save_status();
        assert_eq!(status.status, SaveStatus::Idle);
        assert!(status.last_error.is_some());
        assert_eq!(*events.lock().unwrap(), vec!["restore_available"]);
    }

    #[tokio::test]
    async fn test_initialize_malformed_local_is_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = stackcanvas_infrastructure::FileLocalSaveStore::new(temp_dir.path());
        std::fs::write(store.path_for("main").unwrap(), "{").unwrap();
        let service = AutoSaveService::new("main", Arc::new(store), AutoSaveConfig::default());

        assert!(service.initialize().await.is_err());
        assert!(service.load_save().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_save_cancels_timer_and_deletes() {
        let local = InMemoryLocalSaveStore::new();
        let remote = InMemoryRemoteSaveStore::new();
        let service = remote_service(&local, &remote);

        service.auto_save(canvas(&["a"]), true).await;
        service.auto_save(canvas(&["a", "b"]), false).await;
        service.clear_save().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(!service.has_local_save());
        assert_eq!(remote.fetch("owner-1").await.unwrap(), None);
        assert_eq!(local.write_count(), 1);
        let status = service.save_status();
        assert_eq!(status.status, SaveStatus::Idle);
        assert!(!status.has_unsaved_changes);
        assert_eq!(service.load_save().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_timeout_is_save_error() {
        let local = InMemoryLocalSaveStore::new();
        let remote = InMemoryRemoteSaveStore::new().with_latency(Duration::from_secs(30));
        let service = remote_service(&local, &remote);

        service.auto_save(canvas(&["a"]), true).await;

        let status = service.save_status();
        assert_eq!(status.status, SaveStatus::Error);
        assert!(status.last_error.unwrap().contains("Timed out after 10000ms"));
        assert!(status.has_unsaved_changes);
        // Local write happened before the remote call
        assert_eq!(local.write_count(), 1);
    }
}
