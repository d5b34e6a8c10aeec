//! Local/remote save reconciliation rules.

use super::model::SaveRecord;

/// Outcome of comparing a local save with a remote save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Both records hold the same canvas
    Identical,
    /// Local strictly extends remote; local wins
    PreferLocal,
    /// Remote strictly extends local; remote wins
    PreferRemote,
    /// Divergent edits on both sides; needs an explicit resolution
    Conflict,
}

/// Compares two saves by content.
///
/// Only strict containment is resolved automatically. Timestamps are never
/// used to pick a winner because the two destinations have independent clocks.
pub fn reconcile(local: &SaveRecord, remote: &SaveRecord) -> Reconciliation {
    if local.state == remote.state {
        Reconciliation::Identical
    } else if local.state.contains(&remote.state) {
        Reconciliation::PreferLocal
    } else if remote.state.contains(&local.state) {
        Reconciliation::PreferRemote
    } else {
        Reconciliation::Conflict
    }
}
