//! Change tracking against the last-synced snapshot.
//!
//! [`diff_documents`] compares the current document with the baseline
//! captured at the last successful sync and produces a human-readable change
//! list. Course-level fidelity (added / removed / renamed) is sufficient for
//! the pending-changes counter and commit-message suggestions; the merge
//! engine does its own deeper comparison.
//!
//! Pure and deterministic: same inputs, same change list, no side effects.

use crate::document::Document;
use std::collections::HashMap;
use std::fmt;

/// A single course-level change relative to the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added { id: String, title: String },
    Removed { id: String, title: String },
    Renamed { id: String, from: String, to: String },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Added { title, .. } => write!(f, "Added course: {title}"),
            Change::Removed { title, .. } => write!(f, "Removed course: {title}"),
            Change::Renamed { from, to, .. } => write!(f, "Renamed course: {from} -> {to}"),
        }
    }
}

/// The ordered change list plus the "has local changes" signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
    no_baseline: bool,
}

impl ChangeSet {
    /// Whether a sync decision should treat the local side as modified.
    ///
    /// Unconditionally true when no snapshot exists yet.
    pub fn has_changes(&self) -> bool {
        self.no_baseline || !self.changes.is_empty()
    }

    /// Number of detected changes (the pending-changes counter).
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The change descriptors in deterministic order.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// True when this is the first run and no baseline snapshot exists.
    pub fn is_first_run(&self) -> bool {
        self.no_baseline
    }

    /// A short summary suitable as a suggested commit message.
    pub fn summary(&self) -> String {
        if self.changes.is_empty() {
            return "Update course data".to_string();
        }
        let added = self.count(|c| matches!(c, Change::Added { .. }));
        let removed = self.count(|c| matches!(c, Change::Removed { .. }));
        let renamed = self.count(|c| matches!(c, Change::Renamed { .. }));
        if added > 0 {
            format!("Add {added} course(s)")
        } else if removed > 0 {
            format!("Remove {removed} course(s)")
        } else {
            format!("Rename {renamed} course(s)")
        }
    }

    fn count(&self, predicate: impl Fn(&Change) -> bool) -> usize {
        self.changes.iter().filter(|c| predicate(c)).count()
    }
}

/// Diff the current document against the last-synced snapshot.
///
/// `baseline` is `None` on first run, before any sync has committed a
/// snapshot; in that case every sync decision must treat the local side as
/// modified, so [`ChangeSet::has_changes`] reports true even for an empty
/// document.
pub fn diff_documents(current: &Document, baseline: Option<&Document>) -> ChangeSet {
    let Some(baseline) = baseline else {
        return ChangeSet {
            changes: current
                .courses
                .iter()
                .map(|c| Change::Added {
                    id: c.id.clone(),
                    title: c.title.clone(),
                })
                .collect(),
            no_baseline: true,
        };
    };

    let baseline_by_id: HashMap<&str, &str> = baseline
        .courses
        .iter()
        .map(|c| (c.id.as_str(), c.title.as_str()))
        .collect();

    let mut changes = Vec::new();
    for course in &current.courses {
        match baseline_by_id.get(course.id.as_str()) {
            None => changes.push(Change::Added {
                id: course.id.clone(),
                title: course.title.clone(),
            }),
            Some(old_title) if *old_title != course.title => changes.push(Change::Renamed {
                id: course.id.clone(),
                from: (*old_title).to_string(),
                to: course.title.clone(),
            }),
            Some(_) => {}
        }
    }
    for course in &baseline.courses {
        if current.course(&course.id).is_none() {
            changes.push(Change::Removed {
                id: course.id.clone(),
                title: course.title.clone(),
            });
        }
    }

    ChangeSet {
        changes,
        no_baseline: false,
    }
}
