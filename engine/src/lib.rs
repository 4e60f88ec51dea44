//! # Lectern Engine
//!
//! A deterministic merge engine for offline-first course documents.
//!
//! This crate provides the pure core of the Lectern synchronization system:
//! the course document model, the recursive three-level merge, change
//! tracking against the last-synced snapshot, and the wire formats shared
//! with the remote blob and export files. It has no knowledge of files,
//! network, or platform; the `lectern-sync` crate layers IO on top.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches disk or network
//! - **Deterministic**: same inputs always produce same outputs
//! - **Testable**: pure logic, no mocks needed
//! - **Non-destructive merge**: merging takes the union of entities, never
//!   drops one side
//!
//! ## Core Concepts
//!
//! ### Documents
//!
//! A [`Document`] is an ordered collection of [`Course`]s, each holding
//! [`Section`]s, each holding [`Tab`]s. Every entity has a caller-assigned
//! id, unique among its siblings, plus creation and update timestamps. The
//! *effective timestamp* of an entity is its update time when present,
//! otherwise its creation time.
//!
//! ### Merging
//!
//! [`merge_documents`] reconciles two divergent documents level by level.
//! At each level the sibling lists are unioned by id; for an entity present
//! on both sides the newer effective timestamp wins its scalar fields, ties
//! favoring the local side, while the children of both sides are still
//! merged recursively. Edits made under a stale parent therefore survive.
//!
//! ### Change tracking
//!
//! [`diff_documents`] compares the working document against the snapshot
//! captured at the last successful sync and yields a [`ChangeSet`]: the
//! pending-changes counter, a readable change list, and a suggested commit
//! message.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{DateTime, Utc};
//! use lectern_engine::{merge_documents, Course, Document, Section};
//!
//! fn at(secs: i64) -> DateTime<Utc> {
//!     DateTime::from_timestamp(secs, 0).unwrap()
//! }
//!
//! // Two devices edit the same course while offline.
//! let mut local = Document::new();
//! let mut course = Course::new("course-1", "Rust Basics", at(1_000));
//! course.sections.push(Section::new("sec-local", "Ownership", at(2_000)));
//! local.add_course(course).unwrap();
//!
//! let mut remote = Document::new();
//! let mut course = Course::new("course-1", "Rust Basics", at(1_000));
//! course.sections.push(Section::new("sec-remote", "Borrowing", at(3_000)));
//! course.touch(at(3_000));
//! remote.add_course(course).unwrap();
//!
//! // The merge keeps both sections under the one course.
//! let merged = merge_documents(&local, &remote);
//! let course = merged.course("course-1").unwrap();
//! assert_eq!(course.sections.len(), 2);
//! ```
//!
//! ## Wire formats
//!
//! The [`wire`] module defines the remote blob ([`RemoteDocument`]) and the
//! backup file ([`ExportFile`]). All JSON validation happens there, before
//! data crosses into the typed model.

pub mod diff;
pub mod document;
pub mod error;
pub mod merge;
pub mod wire;

// Re-export main types at crate root
pub use diff::{diff_documents, Change, ChangeSet};
pub use document::{Course, Document, Section, Tab, TabKind};
pub use error::Error;
pub use merge::{documents_equivalent, merge_documents};
pub use wire::{
    import_document, ExportFile, ExportMetadata, RemoteDocument, RemoteMetadata,
    EXPORT_FORMAT_VERSION,
};

/// Type aliases for clarity
pub type CourseId = String;
pub type SectionId = String;
pub type TabId = String;
