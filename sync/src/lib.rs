//! # Lectern Sync
//!
//! Offline-first synchronization for Lectern course documents.
//!
//! The pure merge logic lives in `lectern-engine`; this crate adds the IO
//! around it. A [`SyncOrchestrator`] ties together a [`LocalStore`] holding
//! the working document and its sync bookkeeping, and a [`RemoteStore`]
//! holding one shared blob with revision-token optimistic concurrency.
//!
//! ## The cycle
//!
//! Every sync cycle pulls the remote blob, compares both sides against the
//! instant of the last successful sync, and takes exactly one action:
//!
//! - neither side changed: nothing to do
//! - only local changed: push
//! - only remote changed: adopt the remote version
//! - no baseline yet: merge both sides and push the result
//! - both changed since the baseline: park a [`ConflictRecord`] and wait
//!   for [`SyncOrchestrator::resolve_conflict`]
//!
//! Writes to the remote are compare-and-swap against the fetched revision
//! token, so two devices can never silently overwrite each other; the loser
//! gets [`SyncError::RevisionConflict`] and pulls again.
//!
//! ## Quick Start
//!
//! ```rust
//! use lectern_sync::{
//!     MemoryLocal, MemoryRemote, SyncConfig, SyncOrchestrator, SyncOutcome,
//! };
//! use lectern_engine::{Course, Document};
//! use chrono::Utc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), lectern_sync::SyncError> {
//! let orchestrator = SyncOrchestrator::new(
//!     MemoryLocal::new(),
//!     MemoryRemote::new(),
//!     SyncConfig::default(),
//! );
//!
//! let mut document = Document::new();
//! document.add_course(Course::new("course-1", "Rust Basics", Utc::now()))?;
//! orchestrator.save_document(&document)?;
//!
//! // First sync seeds the remote blob.
//! assert_eq!(orchestrator.sync_now().await?, SyncOutcome::Pushed);
//! assert_eq!(orchestrator.sync_now().await?, SyncOutcome::NoOp);
//! # Ok(())
//! # }
//! ```

pub mod conflict;
pub mod error;
pub mod local;
pub mod orchestrator;
pub mod remote;
pub mod state;

// Re-export main types at crate root
pub use conflict::{ConflictRecord, Resolution, ResolutionOutcome};
pub use error::{Result, SyncError};
pub use local::{keys, DocumentStore, LocalStore, MemoryLocal};
pub use orchestrator::{SyncConfig, SyncOrchestrator, SyncOutcome, SyncStatus};
pub use remote::{FetchedBlob, MemoryRemote, RemoteStore, RevisionToken};
pub use state::{decide, Decision, SyncPhase};
