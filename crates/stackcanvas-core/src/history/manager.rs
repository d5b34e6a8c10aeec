use chrono::{DateTime, Utc};

use super::model::{ActionType, HistoryEntry, HistoryMetadata, HistorySummary};
use crate::config::HistoryConfig;
use crate::snapshot::CanvasState;

/// Bounded, cursor-addressed log of canvas snapshots.
///
/// `HistoryManager` is responsible for:
/// - Recording every edit as an immutable snapshot entry
/// - Linear undo/redo (a new edit discards the redo branch)
/// - Jumping to an arbitrary entry for history scrubbers
/// - Evicting the oldest entries once `max_size` is exceeded
///
/// All operations are in-memory and total. Navigation past either end returns
/// `None` and leaves the cursor where it was.
///
/// # Invariants
///
/// - The log always holds at least one entry
/// - `current_index < entries.len()`
/// - The entry under the cursor is never evicted
#[derive(Debug, Clone)]
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    current_index: usize,
    config: HistoryConfig,
}

impl HistoryManager {
    /// Creates a history seeded with a single `initial` entry for `initial`.
    pub fn new(initial: CanvasState, config: HistoryConfig) -> Self {
        Self {
            entries: vec![HistoryEntry::new(
                initial,
                ActionType::Initial,
                None,
                Utc::now(),
            )],
            current_index: 0,
            config,
        }
    }

    /// Records a new snapshot at the cursor.
    ///
    /// Entries after the cursor are discarded first. When the log grows past
    /// `max_size` the oldest entries are evicted.
    pub fn add_state(
        &mut self,
        state: CanvasState,
        action_type: ActionType,
        metadata: Option<HistoryMetadata>,
    ) {
        self.add_state_at(state, action_type, metadata, Utc::now());
    }

    /// Same as [`add_state`](Self::add_state) with an explicit timestamp.
    pub fn add_state_at(
        &mut self,
        state: CanvasState,
        action_type: ActionType,
        metadata: Option<HistoryMetadata>,
        timestamp: DateTime<Utc>,
    ) {
        let entry = HistoryEntry::new(state, action_type, metadata, timestamp);

        if self.should_coalesce(&entry) {
            let tip = &mut self.entries[self.current_index];
            tracing::trace!(node_id = ?entry.node_id(), "Coalescing move_node into previous entry");
            tip.state = entry.state;
            tip.timestamp = entry.timestamp;
            tip.metadata = entry.metadata;
            return;
        }

        self.entries.truncate(self.current_index + 1);
        self.entries.push(entry);
        self.current_index = self.entries.len() - 1;

        let max_size = self.max_size();
        if self.entries.len() > max_size {
            let overflow = self.entries.len() - max_size;
            self.entries.drain(..overflow);
            self.current_index -= overflow;
            tracing::trace!(evicted = overflow, "History limit reached, evicted oldest entries");
        }
    }

    /// Steps the cursor back and returns the snapshot there.
    pub fn undo(&mut self) -> Option<CanvasState> {
        if !self.can_undo() {
            return None;
        }
        self.current_index -= 1;
        Some(self.current_state().clone())
    }

    /// Steps the cursor forward and returns the snapshot there.
    pub fn redo(&mut self) -> Option<CanvasState> {
        if !self.can_redo() {
            return None;
        }
        self.current_index += 1;
        Some(self.current_state().clone())
    }

    /// Moves the cursor to `index`. Out-of-range indices are ignored.
    pub fn jump_to_index(&mut self, index: usize) -> Option<CanvasState> {
        if index >= self.entries.len() {
            return None;
        }
        self.current_index = index;
        Some(self.current_state().clone())
    }

    /// Collapses the log to the entry under the cursor.
    pub fn clear_history(&mut self) {
        let current = self.entries.swap_remove(self.current_index);
        self.entries.clear();
        self.entries.push(current);
        self.current_index = 0;
    }

    /// Replaces the whole log with a single entry for `state`.
    pub fn reset(&mut self, state: CanvasState, action_type: ActionType) {
        self.entries.clear();
        self.entries
            .push(HistoryEntry::new(state, action_type, None, Utc::now()));
        self.current_index = 0;
    }

    pub fn can_undo(&self) -> bool {
        self.current_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.current_index + 1 < self.entries.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_entry(&self) -> &HistoryEntry {
        &self.entries[self.current_index]
    }

    /// The snapshot the user currently sees.
    pub fn current_state(&self) -> &CanvasState {
        &self.current_entry().state
    }

    /// Full ordered entry list, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Owned copy of the entry list for history scrubber views.
    pub fn detailed_history(&self) -> Vec<HistoryEntry> {
        self.entries.clone()
    }

    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            current_index: self.current_index,
            total_entries: self.entries.len(),
            last_action: self.current_entry().action_type,
            memory_usage: self
                .entries
                .iter()
                .map(|e| e.state.approximate_size())
                .sum(),
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    fn max_size(&self) -> usize {
        self.config.max_size.max(1)
    }

    /// A drag produces a burst of `move_node` edits for one node; with a
    /// coalesce window configured the burst collapses into one entry.
    fn should_coalesce(&self, entry: &HistoryEntry) -> bool {
        let Some(window_ms) = self.config.coalesce_window_ms else {
            return false;
        };
        if entry.action_type != ActionType::MoveNode || self.can_redo() {
            return false;
        }

        let tip = self.current_entry();
        if tip.action_type != ActionType::MoveNode {
            return false;
        }
        match (tip.node_id(), entry.node_id()) {
            (Some(a), Some(b)) if a == b => {}
            _ => return false,
        }

        let elapsed = entry.timestamp.signed_duration_since(tip.timestamp);
        elapsed.num_milliseconds() >= 0 && elapsed.num_milliseconds() as u64 <= window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::model::NODE_ID_KEY;
    use crate::snapshot::{CanvasNode, Position};
    use chrono::Duration;
    use serde_json::json;

    fn canvas_with(count: usize) -> CanvasState {
        (0..count).fold(CanvasState::empty(), |state, i| {
            state.with_node(CanvasNode::new(
                format!("node-{i}"),
                "service",
                Position::new(i as f64 * 100.0, 0.0),
            ))
        })
    }

    fn history_with(count: usize) -> HistoryManager {
        let mut history = HistoryManager::new(canvas_with(0), HistoryConfig::default());
        for i in 1..=count {
            history.add_state(canvas_with(i), ActionType::AddNode, None);
        }
        history
    }

    fn move_meta(node_id: &str) -> Option<HistoryMetadata> {
        Some(HistoryMetadata::from([(NODE_ID_KEY.to_string(), json!(node_id))]))
    }

    #[test]
    fn test_new_history_has_seed_entry() {
        let history = HistoryManager::new(CanvasState::empty(), HistoryConfig::default());

        assert_eq!(history.len(), 1);
        assert_eq!(history.current_index(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.current_entry().action_type, ActionType::Initial);
    }

    #[test]
    fn test_undo_redo_inverse() {
        let mut history = history_with(5);
        let tip = history.current_state().clone();

        for k in 1..=5 {
            for _ in 0..k {
                assert!(history.undo().is_some());
            }
            for _ in 0..k {
                assert!(history.redo().is_some());
            }
            assert_eq!(history.current_state(), &tip);
        }
    }

    #[test]
    fn test_undo_at_start_is_noop() {
        let mut history = history_with(1);
        assert_eq!(history.undo(), Some(canvas_with(0)));
        assert_eq!(history.undo(), None);
        assert_eq!(history.current_index(), 0);
    }

    #[test]
    fn test_redo_at_tip_is_noop() {
        let mut history = history_with(2);
        assert_eq!(history.redo(), None);
        assert_eq!(history.current_index(), 2);
    }

    #[test]
    fn test_truncate_on_diverge() {
        let mut history = history_with(2);
        assert_eq!(history.undo(), Some(canvas_with(1)));

        let diverged = canvas_with(1).with_metadata("branch", json!("b"));
        history.add_state(diverged.clone(), ActionType::UpdateNode, None);

        let states: Vec<_> = history.entries().iter().map(|e| e.state.clone()).collect();
        assert_eq!(states, vec![canvas_with(0), canvas_with(1), diverged]);
        assert_eq!(history.current_index(), 2);
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn test_bounded_size_keeps_cursor_on_newest() {
        let config = HistoryConfig {
            max_size: 10,
            ..HistoryConfig::default()
        };
        let mut history = HistoryManager::new(canvas_with(0), config);
        for i in 1..=15 {
            history.add_state(canvas_with(i), ActionType::AddNode, None);
        }

        assert_eq!(history.len(), 10);
        assert_eq!(history.current_index(), 9);
        assert_eq!(history.current_state(), &canvas_with(15));
        assert!(!history.can_redo());

        // Undo only reaches as far back as what was not evicted
        let mut steps = 0;
        while history.undo().is_some() {
            steps += 1;
        }
        assert_eq!(steps, 9);
        assert_eq!(history.current_state(), &canvas_with(6));
    }

    #[test]
    fn test_max_size_zero_is_treated_as_one() {
        let config = HistoryConfig {
            max_size: 0,
            ..HistoryConfig::default()
        };
        let mut history = HistoryManager::new(canvas_with(0), config);
        history.add_state(canvas_with(1), ActionType::AddNode, None);

        assert_eq!(history.len(), 1);
        assert_eq!(history.current_state(), &canvas_with(1));
    }

    #[test]
    fn test_jump_to_index() {
        let mut history = history_with(3);

        assert_eq!(history.jump_to_index(1), Some(canvas_with(1)));
        assert_eq!(history.current_index(), 1);
        assert!(history.can_undo());
        assert!(history.can_redo());

        assert_eq!(history.jump_to_index(4), None);
        assert_eq!(history.current_index(), 1);
    }

    #[test]
    fn test_clear_history_keeps_current_entry() {
        let mut history = history_with(3);
        history.undo();
        history.clear_history();

        assert_eq!(history.len(), 1);
        assert_eq!(history.current_index(), 0);
        assert_eq!(history.current_state(), &canvas_with(2));
        assert!(!history.can_undo());
    }

    #[test]
    fn test_reset_seeds_single_entry() {
        let mut history = history_with(3);
        history.reset(canvas_with(7), ActionType::Import);

        assert_eq!(history.len(), 1);
        assert_eq!(history.current_state(), &canvas_with(7));
        assert_eq!(history.summary().last_action, ActionType::Import);
    }

    #[test]
    fn test_summary() {
        let mut history = history_with(2);
        history.undo();
        let summary = history.summary();

        assert!(summary.can_undo);
        assert!(summary.can_redo);
        assert_eq!(summary.current_index, 1);
        assert_eq!(summary.total_entries, 3);
        assert_eq!(summary.last_action, ActionType::AddNode);
        let expected: usize = (0..=2).map(|i| canvas_with(i).approximate_size()).sum();
        assert_eq!(summary.memory_usage, expected);
    }

    #[test]
    fn test_move_entries_kept_separately_by_default() {
        let mut history = history_with(1);
        let t0 = Utc::now();
        for step in 1..=3 {
            let moved = canvas_with(1).with_node_moved("node-0", Position::new(step as f64, 0.0));
            history.add_state_at(moved, ActionType::MoveNode, move_meta("node-0"), t0);
        }
        assert_eq!(history.len(), 5);
    }

    #[test]
    fn test_drag_coalescing_within_window() {
        let config = HistoryConfig {
            coalesce_window_ms: Some(500),
            ..HistoryConfig::default()
        };
        let mut history = HistoryManager::new(canvas_with(1), config);
        let t0 = Utc::now();

        for step in 0..4 {
            let moved = canvas_with(1).with_node_moved("node-0", Position::new(step as f64, 0.0));
            let at = t0 + Duration::milliseconds(step * 100);
            history.add_state_at(moved, ActionType::MoveNode, move_meta("node-0"), at);
        }

        assert_eq!(history.len(), 2);
        assert_eq!(
            history.current_state().node("node-0").unwrap().position,
            Position::new(3.0, 0.0)
        );
        assert_eq!(history.undo(), Some(canvas_with(1)));
    }

    #[test]
    fn test_drag_coalescing_respects_window_and_node() {
        let config = HistoryConfig {
            coalesce_window_ms: Some(500),
            ..HistoryConfig::default()
        };
        let mut history = HistoryManager::new(canvas_with(2), config);
        let t0 = Utc::now();
        let moved = |x: f64| canvas_with(2).with_node_moved("node-0", Position::new(x, 0.0));

        history.add_state_at(moved(1.0), ActionType::MoveNode, move_meta("node-0"), t0);
        // Different node: new entry
        history.add_state_at(
            moved(2.0),
            ActionType::MoveNode,
            move_meta("node-1"),
            t0 + Duration::milliseconds(10),
        );
        // Same node but outside the window: new entry
        history.add_state_at(
            moved(3.0),
            ActionType::MoveNode,
            move_meta("node-1"),
            t0 + Duration::milliseconds(2_000),
        );

        assert_eq!(history.len(), 4);
    }
}
