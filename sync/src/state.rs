//! Sync phases and the pull/push/merge decision.
//!
//! [`decide`] is the whole comparison step, pure and separately testable:
//! given the last-sync instant and the two sides' modification instants it
//! names the action to take. Timestamps, not content hashes, drive the
//! decision; content equivalence is only consulted afterwards to skip
//! redundant pushes.

use chrono::{DateTime, Utc};

/// Where the orchestrator currently is in the sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    /// Fetching the remote blob.
    Pulling,
    /// Deciding between pull, push, merge, and conflict.
    Comparing,
    /// Reconciling divergent documents.
    Merging,
    /// Writing the result back to the remote.
    Pushing,
    /// Both sides changed since the last sync; waiting for a resolution.
    ConflictPending,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Pulling => "pulling",
            SyncPhase::Comparing => "comparing",
            SyncPhase::Merging => "merging",
            SyncPhase::Pushing => "pushing",
            SyncPhase::ConflictPending => "conflict",
        }
    }
}

/// The action the comparison step settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Neither side changed since the last sync.
    NoOp,
    /// Only the local side changed; overwrite the remote.
    PushOnly,
    /// Only the remote side changed; adopt it locally.
    PullOnly,
    /// No sync baseline exists to attribute changes, so reconcile both
    /// sides without flagging a conflict.
    Merge,
    /// Both sides changed since the last sync; a person decides.
    Conflict,
}

/// Decide what a sync cycle should do.
///
/// `local_modified` is the newest effective timestamp in the local document,
/// `None` for an empty document. `remote_modified` is the server-reported
/// modification instant of the fetched blob.
///
/// With no `last_sync` every remote blob counts as changed, and the local
/// side counts as changed whenever it holds any data; both together yield
/// [`Decision::Merge`] rather than [`Decision::Conflict`], since with no
/// baseline neither side can be blamed for diverging.
pub fn decide(
    last_sync: Option<DateTime<Utc>>,
    local_modified: Option<DateTime<Utc>>,
    remote_modified: DateTime<Utc>,
) -> Decision {
    let local_dirty = match last_sync {
        None => local_modified.is_some(),
        Some(baseline) => local_modified.is_some_and(|m| m > baseline),
    };
    let remote_dirty = match last_sync {
        None => true,
        Some(baseline) => remote_modified > baseline,
    };

    match (local_dirty, remote_dirty) {
        (false, false) => Decision::NoOp,
        (true, false) => Decision::PushOnly,
        (false, true) => Decision::PullOnly,
        (true, true) => {
            if last_sync.is_some() {
                Decision::Conflict
            } else {
                Decision::Merge
            }
        }
    }
}
