//! Conflict capture and resolution.
//!
//! When both sides changed since the last sync, the cycle stops and parks a
//! [`ConflictRecord`] holding both full documents. Nothing is modified until
//! a [`Resolution`] is applied; the record carries everything needed to show
//! a person both versions and commit their choice.

use crate::remote::RevisionToken;
use chrono::{DateTime, Utc};
use lectern_engine::{documents_equivalent, merge_documents, Document};

/// A detected conflict, parked until resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictRecord {
    /// The local document at detection time.
    pub local: Document,
    /// The remote document at detection time.
    pub remote: Document,
    pub local_modified_at: Option<DateTime<Utc>>,
    pub remote_modified_at: DateTime<Utc>,
    /// Revision of the fetched blob; the resolution is pushed against it.
    pub remote_revision: RevisionToken,
    pub detected_at: DateTime<Utc>,
}

/// How to settle a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Keep the local version, overwriting the remote.
    LocalWins,
    /// Adopt the remote version, discarding local changes.
    RemoteWins,
    /// Reconcile both versions with the standard merge.
    Merge,
}

/// What applying a resolution did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOutcome {
    pub resolution: Resolution,
    /// Whether the local document changed as a result.
    pub changed_local: bool,
    /// Whether the result was pushed to the remote. False when the remote
    /// already held the resolved content.
    pub pushed: bool,
}

/// Compute the resolved document. Pure; committing it to the stores is the
/// orchestrator's job.
///
/// Returns the document to adopt and whether it differs from the local side.
pub fn resolve(record: &ConflictRecord, resolution: Resolution) -> (Document, bool) {
    match resolution {
        Resolution::LocalWins => (record.local.clone(), false),
        Resolution::RemoteWins => {
            let changed = !documents_equivalent(&record.remote, &record.local);
            (record.remote.clone(), changed)
        }
        Resolution::Merge => {
            let merged = merge_documents(&record.local, &record.remote);
            let changed = !documents_equivalent(&merged, &record.local);
            (merged, changed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_engine::Course;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn record(local: Document, remote: Document) -> ConflictRecord {
        ConflictRecord {
            local_modified_at: local.latest_modified(),
            remote_modified_at: at(500),
            local,
            remote,
            remote_revision: "r7".into(),
            detected_at: at(600),
        }
    }

    fn doc(ids: &[&str]) -> Document {
        Document {
            courses: ids
                .iter()
                .map(|id| Course::new(*id, format!("Course {id}"), at(100)))
                .collect(),
        }
    }

    #[test]
    fn local_wins_keeps_local_untouched() {
        let record = record(doc(&["a"]), doc(&["b"]));
        let (resolved, changed) = resolve(&record, Resolution::LocalWins);
        assert_eq!(resolved, record.local);
        assert!(!changed);
    }

    #[test]
    fn remote_wins_reports_local_change() {
        let record = record(doc(&["a"]), doc(&["b"]));
        let (resolved, changed) = resolve(&record, Resolution::RemoteWins);
        assert_eq!(resolved, record.remote);
        assert!(changed);
    }

    #[test]
    fn remote_wins_with_identical_content_is_a_local_noop() {
        let record = record(doc(&["a"]), doc(&["a"]));
        let (_, changed) = resolve(&record, Resolution::RemoteWins);
        assert!(!changed);
    }

    #[test]
    fn merge_unions_both_sides() {
        let record = record(doc(&["a"]), doc(&["b"]));
        let (resolved, changed) = resolve(&record, Resolution::Merge);
        assert!(changed);
        assert!(resolved.course("a").is_some());
        assert!(resolved.course("b").is_some());
    }

    #[test]
    fn merge_that_adds_nothing_reports_no_local_change() {
        let record = record(doc(&["a", "b"]), doc(&["b"]));
        let (_, changed) = resolve(&record, Resolution::Merge);
        assert!(!changed);
    }
}
