use chrono::{DateTime, Utc};
use serde_json::Value;
use stackcanvas_core::config::HistoryConfig;
use stackcanvas_core::error::Result;
use stackcanvas_core::events::ListenerHandle;
use stackcanvas_core::history::{ActionType, HistoryEntry, HistoryManager, HistoryMetadata, HistorySummary};
use stackcanvas_core::save::{SaveEvent, SaveStatus};
use stackcanvas_core::snapshot::CanvasState;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::builder::CanvasSessionBuilder;
use crate::auto_save::AutoSaveService;
use crate::shortcuts::{FocusTarget, KeyChord, ShortcutAction, resolve_shortcut};

/// One canvas-editing session: undo/redo history plus auto-save.
///
/// `CanvasSession` is responsible for:
/// - Recording every edit in the history before persisting it
/// - Force-saving after undo, redo, jumps and resets
/// - Tracking the baseline snapshot that `has_changes` compares against
/// - Exposing the read-only surface the editor UI binds to
///
/// History operations are synchronous; only the persistence half awaits.
pub struct CanvasSession {
    history: Mutex<HistoryManager>,
    /// Snapshot the session was loaded from or last reset to
    baseline: Mutex<CanvasState>,
    auto_save: AutoSaveService,
}

impl CanvasSession {
    /// Creates a session starting at `initial`.
    ///
    /// # Arguments
    ///
    /// * `initial` - Snapshot seeding the history and the baseline
    /// * `auto_save` - Persistence service for this session
    /// * `history_config` - History bounds and coalescing
    pub fn new(initial: CanvasState, auto_save: AutoSaveService, history_config: HistoryConfig) -> Self {
        Self {
            history: Mutex::new(HistoryManager::new(initial.clone(), history_config)),
            baseline: Mutex::new(initial),
            auto_save,
        }
    }

    /// Starts building a session for `session_key`.
    pub fn builder(session_key: impl Into<String>) -> CanvasSessionBuilder {
        CanvasSessionBuilder::new(session_key)
    }

    fn history(&self) -> MutexGuard<'_, HistoryManager> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_baseline(&self, state: CanvasState) {
        *self.baseline.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn auto_save(&self) -> &AutoSaveService {
        &self.auto_save
    }

    /// See [`AutoSaveService::initialize`].
    pub async fn initialize(&self) -> Result<()> {
        self.auto_save.initialize().await
    }

    // ============================================================================
    // Edits and navigation
    // ============================================================================

    /// Records an edit, then schedules a debounced save.
    pub async fn update_state(
        &self,
        state: CanvasState,
        action_type: ActionType,
        metadata: Option<HistoryMetadata>,
    ) {
        self.history().add_state(state.clone(), action_type, metadata);
        self.auto_save.auto_save(state, false).await;
    }

    /// Replaces the history with `state` (import, restore) and force-saves it.
    pub async fn reset_state(&self, state: CanvasState) {
        self.history().reset(state.clone(), ActionType::Import);
        self.set_baseline(state.clone());
        tracing::debug!("[CanvasSession] History reset");
        self.auto_save.auto_save(state, true).await;
    }

    pub async fn undo(&self) -> Option<CanvasState> {
        let state = self.history().undo()?;
        self.auto_save.auto_save(state.clone(), true).await;
        Some(state)
    }

    pub async fn redo(&self) -> Option<CanvasState> {
        let state = self.history().redo()?;
        self.auto_save.auto_save(state.clone(), true).await;
        Some(state)
    }

    pub async fn jump_to_history_index(&self, index: usize) -> Option<CanvasState> {
        let state = self.history().jump_to_index(index)?;
        self.auto_save.auto_save(state.clone(), true).await;
        Some(state)
    }

    /// Saves the current snapshot immediately.
    pub async fn force_save(&self) {
        let state = self.current_state();
        self.auto_save.auto_save(state, true).await;
    }

    // ============================================================================
    // Persistence
    // ============================================================================

    /// Loads the persisted snapshot and, when one exists, resets to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored payload cannot be read.
    pub async fn load_save(&self) -> Result<Option<CanvasState>> {
        let Some(state) = self.auto_save.load_save().await? else {
            return Ok(None);
        };
        self.reset_state(state.clone()).await;
        Ok(Some(state))
    }

    pub async fn clear_save(&self) -> Result<()> {
        self.auto_save.clear_save().await
    }

    pub fn has_auto_save(&self) -> bool {
        self.auto_save.has_local_save()
    }

    /// Applies the user's conflict resolution as a new edit and saves it over
    /// both destinations.
    pub async fn resolve_conflict(&self, state: CanvasState) {
        let mut metadata = HistoryMetadata::new();
        metadata.insert("source".to_string(), Value::from("conflict_resolution"));
        self.history()
            .add_state(state.clone(), ActionType::Import, Some(metadata));
        self.auto_save.resolve_conflict(state).await;
    }

    // ============================================================================
    // Keyboard
    // ============================================================================

    /// Resolves `chord` and runs the matching action.
    ///
    /// Returns the action that was triggered, or `None` when the chord is not
    /// a shortcut in this context.
    pub async fn handle_shortcut(
        &self,
        chord: KeyChord,
        focus: FocusTarget,
    ) -> Option<ShortcutAction> {
        let action = resolve_shortcut(chord, focus)?;
        match action {
            ShortcutAction::Undo => {
                self.undo().await;
            }
            ShortcutAction::Redo => {
                self.redo().await;
            }
            ShortcutAction::Save => self.force_save().await,
        }
        Some(action)
    }

    // ============================================================================
    // UI accessors
    // ============================================================================

    pub fn current_state(&self) -> CanvasState {
        self.history().current_state().clone()
    }

    pub fn can_undo(&self) -> bool {
        self.history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history().can_redo()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.auto_save.save_status().status
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.auto_save.save_status().last_saved
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.auto_save.save_status().has_unsaved_changes
    }

    /// Whether the current snapshot differs structurally from the baseline.
    pub fn has_changes(&self) -> bool {
        let current = self.current_state();
        let baseline = self.baseline.lock().unwrap_or_else(PoisonError::into_inner);
        current != *baseline
    }

    pub fn history_summary(&self) -> HistorySummary {
        self.history().summary()
    }

    pub fn detailed_history(&self) -> Vec<HistoryEntry> {
        self.history().detailed_history()
    }

    pub fn add_event_listener<F>(&self, handler: F) -> ListenerHandle
    where
        F: Fn(&SaveEvent) + Send + Sync + 'static,
    {
        self.auto_save.add_event_listener(handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackcanvas_core::config::AutoSaveConfig;
    use stackcanvas_core::save::LocalSaveStore;
    use stackcanvas_core::snapshot::{CanvasNode, Position};
    use stackcanvas_infrastructure::InMemoryLocalSaveStore;
    use std::sync::Arc;

    fn session(store: &InMemoryLocalSaveStore) -> CanvasSession {
        let auto_save = AutoSaveService::new("main", Arc::new(store.clone()), AutoSaveConfig::default());
        CanvasSession::new(CanvasState::empty(), auto_save, HistoryConfig::default())
    }

    fn with_node(state: &CanvasState, id: &str) -> CanvasState {
        state.with_node(CanvasNode::new(id, "service", Position::new(0.0, 0.0)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_state_debounces_undo_forces() {
        let store = InMemoryLocalSaveStore::new();
        let session = session(&store);

        let s1 = with_node(&CanvasState::empty(), "a");
        session.update_state(s1.clone(), ActionType::AddNode, None).await;
        assert_eq!(store.write_count(), 0);
        assert!(session.has_unsaved_changes());
        assert!(session.has_changes());

        let undone = session.undo().await.unwrap();
        assert_eq!(undone, CanvasState::empty());
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.writes()[0].1.state, CanvasState::empty());
        assert!(!session.has_changes());
        assert!(session.can_redo());
    }

    #[tokio::test]
    async fn test_navigation_noops_do_not_save() {
        let store = InMemoryLocalSaveStore::new();
        let session = session(&store);

        assert!(session.undo().await.is_none());
        assert!(session.redo().await.is_none());
        assert!(session.jump_to_history_index(3).await.is_none());
        assert_eq!(store.write_count(), 0);
        assert_eq!(session.save_status(), SaveStatus::Idle);
    }

    #[tokio::test]
    async fn test_reset_state_replaces_history_and_baseline() {
        let store = InMemoryLocalSaveStore::new();
        let session = session(&store);
        let s1 = with_node(&CanvasState::empty(), "a");
        session.update_state(s1.clone(), ActionType::AddNode, None).await;

        let imported = with_node(&CanvasState::empty(), "x");
        session.reset_state(imported.clone()).await;

        let summary = session.history_summary();
        assert_eq!(summary.total_entries, 1);
        assert_eq!(summary.last_action, ActionType::Import);
        assert!(!session.can_undo());
        assert!(!session.has_changes());
        assert_eq!(session.save_status(), SaveStatus::Saved);
        assert_eq!(store.get("main").unwrap().unwrap().state, imported);
    }

    #[tokio::test]
    async fn test_handle_shortcut_routes_actions() {
        let store = InMemoryLocalSaveStore::new();
        let session = session(&store);
        let s1 = with_node(&CanvasState::empty(), "a");
        session.update_state(s1.clone(), ActionType::AddNode, None).await;

        let undo = KeyChord::new('z').ctrl();
        assert_eq!(
            session.handle_shortcut(undo, FocusTarget::TextInput).await,
            None
        );
        assert_eq!(session.current_state(), s1);

        assert_eq!(
            session.handle_shortcut(undo, FocusTarget::Canvas).await,
            Some(ShortcutAction::Undo)
        );
        assert_eq!(session.current_state(), CanvasState::empty());

        assert_eq!(
            session
                .handle_shortcut(KeyChord::new('y').ctrl(), FocusTarget::Canvas)
                .await,
            Some(ShortcutAction::Redo)
        );
        assert_eq!(session.current_state(), s1);

        assert_eq!(
            session
                .handle_shortcut(KeyChord::new('s').meta(), FocusTarget::Canvas)
                .await,
            Some(ShortcutAction::Save)
        );
        assert_eq!(store.get("main").unwrap().unwrap().state, s1);
    }

    #[tokio::test]
    async fn test_load_save_seeds_history() {
        let store = InMemoryLocalSaveStore::new();
        let saved = with_node(&CanvasState::empty(), "persisted");
        session(&store).reset_state(saved.clone()).await;

        let restored = session(&store);
        assert!(restored.has_auto_save());
        assert_eq!(restored.load_save().await.unwrap(), Some(saved.clone()));
        assert_eq!(restored.current_state(), saved);
        assert!(!restored.has_changes());
    }
}
