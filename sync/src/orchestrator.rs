//! The sync cycle.
//!
//! [`SyncOrchestrator`] owns the local stores, a remote store, and the state
//! machine that ties them together. One cycle runs pull, compare, then one
//! of merge, push, pull-adopt, or nothing; a conflict parks the cycle until
//! [`SyncOrchestrator::resolve_conflict`] is called. Cycles never overlap:
//! a trigger arriving mid-flight is queued and a single rerun follows the
//! current cycle.

use crate::conflict::{self, ConflictRecord, Resolution, ResolutionOutcome};
use crate::error::{Result, SyncError};
use crate::local::{DocumentStore, LocalStore};
use crate::remote::{FetchedBlob, RemoteStore};
use crate::state::{decide, Decision, SyncPhase};
use chrono::{DateTime, Utc};
use lectern_engine::{
    diff_documents, documents_equivalent, import_document, merge_documents, ChangeSet, Document,
    ExportFile, RemoteDocument,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Key of the shared blob on the remote.
    pub remote_key: String,
    /// Period of the background sync task.
    pub auto_sync_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_key: "lectern-courses".to_string(),
            auto_sync_interval: Duration::from_secs(30),
        }
    }
}

/// What a completed sync cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing changed on either side.
    NoOp,
    /// Local changes were written to the remote.
    Pushed,
    /// The remote version was adopted locally.
    Pulled,
    /// Both sides were reconciled and the result pushed.
    Merged,
    /// Both sides changed; a [`ConflictRecord`] is parked for resolution.
    Conflict,
    /// A cycle was already in flight; a rerun will follow it.
    Queued,
}

/// A point-in-time view of the orchestrator for display.
#[derive(Debug, Clone)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub last_sync: Option<DateTime<Utc>>,
    pub pending_changes: usize,
    pub auto_sync_enabled: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct Shared {
    phase: SyncPhase,
    last_error: Option<String>,
    conflict: Option<ConflictRecord>,
}

/// Drives the offline-first sync cycle over a local and a remote store.
pub struct SyncOrchestrator<L, R> {
    local: DocumentStore<L>,
    remote: R,
    config: SyncConfig,
    shared: Mutex<Shared>,
    in_flight: AtomicBool,
    queued: AtomicBool,
    auto_task: Mutex<Option<JoinHandle<()>>>,
}

impl<L, R> SyncOrchestrator<L, R>
where
    L: LocalStore + 'static,
    R: RemoteStore + 'static,
{
    pub fn new(local: L, remote: R, config: SyncConfig) -> Self {
        Self {
            local: DocumentStore::new(local),
            remote,
            config,
            shared: Mutex::new(Shared::default()),
            in_flight: AtomicBool::new(false),
            queued: AtomicBool::new(false),
            auto_task: Mutex::new(None),
        }
    }

    /// The working document.
    pub fn document(&self) -> Result<Document> {
        self.local.load_document()
    }

    /// Replace the working document. The next sync cycle picks it up.
    pub fn save_document(&self, document: &Document) -> Result<()> {
        document.validate()?;
        self.local.save_document(document)
    }

    /// Changes made locally since the last successful sync.
    pub fn pending_changes(&self) -> Result<ChangeSet> {
        let document = self.local.load_document()?;
        let snapshot = self.local.load_snapshot()?;
        Ok(diff_documents(&document, snapshot.as_ref()))
    }

    /// Current phase, bookkeeping, and pending-change count.
    pub fn status(&self) -> Result<SyncStatus> {
        let (phase, last_error) = {
            let shared = self.lock_shared();
            (shared.phase, shared.last_error.clone())
        };
        Ok(SyncStatus {
            phase,
            last_sync: self.local.last_sync()?,
            pending_changes: self.pending_changes()?.len(),
            auto_sync_enabled: self.local.auto_sync_enabled()?,
            last_error,
        })
    }

    /// The parked conflict, if a cycle detected one.
    pub fn conflict(&self) -> Option<ConflictRecord> {
        self.lock_shared().conflict.clone()
    }

    /// Run one sync cycle.
    ///
    /// If a cycle is already in flight the call returns
    /// [`SyncOutcome::Queued`] immediately and the running cycle reruns once
    /// after it finishes, so the trigger is never lost.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.queued.store(true, Ordering::SeqCst);
            tracing::debug!("sync already in flight, queued a rerun");
            return Ok(SyncOutcome::Queued);
        }

        let result = loop {
            let result = self.sync_once().await;
            match &result {
                Ok(SyncOutcome::Conflict) => break result,
                Ok(_) if self.queued.swap(false, Ordering::SeqCst) => {
                    tracing::debug!("running queued sync");
                    continue;
                }
                _ => break result,
            }
        };
        self.in_flight.store(false, Ordering::SeqCst);

        let mut shared = self.lock_shared();
        match &result {
            Ok(_) => shared.last_error = None,
            Err(err) => {
                shared.last_error = Some(err.to_string());
                shared.phase = SyncPhase::Idle;
                tracing::warn!(error = %err, "sync cycle failed");
            }
        }
        result
    }

    async fn sync_once(&self) -> Result<SyncOutcome> {
        self.set_phase(SyncPhase::Pulling);
        tracing::debug!(key = %self.config.remote_key, "fetching remote blob");

        let document = self.local.load_document()?;
        let local_modified = document.latest_modified();
        let last_sync = self.local.last_sync()?;

        let Some(blob) = self.remote.get(&self.config.remote_key).await? else {
            // Nothing remote yet: the first sync seeds the blob.
            tracing::info!("remote blob absent, seeding with local document");
            if self.local_changed_since(local_modified)? {
                return Ok(self.defer_to_rerun());
            }
            self.set_phase(SyncPhase::Pushing);
            let revision = self.push(&document, None).await?;
            self.commit(&document, &revision)?;
            self.set_phase(SyncPhase::Idle);
            return Ok(SyncOutcome::Pushed);
        };

        self.set_phase(SyncPhase::Comparing);
        let remote_document = RemoteDocument::from_json(&blob.content)?.into_document();
        let decision = decide(last_sync, local_modified, blob.modified_at);
        tracing::debug!(
            decision = ?decision,
            revision = %blob.revision,
            "compared local and remote"
        );

        match decision {
            Decision::NoOp => {
                self.local.set_remote_revision(&blob.revision)?;
                self.set_phase(SyncPhase::Idle);
                Ok(SyncOutcome::NoOp)
            }
            Decision::PullOnly => {
                // Adopting the remote would clobber an edit made while the
                // blob was in flight; the rerun sees both sides dirty and
                // parks a conflict instead.
                if self.local_changed_since(local_modified)? {
                    return Ok(self.defer_to_rerun());
                }
                self.local.save_document(&remote_document)?;
                self.commit(&remote_document, &blob.revision)?;
                self.set_phase(SyncPhase::Idle);
                tracing::info!(courses = remote_document.len(), "adopted remote version");
                Ok(SyncOutcome::Pulled)
            }
            Decision::PushOnly => {
                // An edit made while the blob was in flight carries a stamp
                // older than the commit instant and would never look dirty
                // again; rerun so the push carries it.
                if self.local_changed_since(local_modified)? {
                    return Ok(self.defer_to_rerun());
                }
                if documents_equivalent(&document, &remote_document) {
                    // Timestamps moved but content did not; just refresh
                    // the baseline.
                    self.commit(&document, &blob.revision)?;
                    self.set_phase(SyncPhase::Idle);
                    return Ok(SyncOutcome::NoOp);
                }
                self.set_phase(SyncPhase::Pushing);
                let revision = self.push(&document, Some(&blob)).await?;
                self.commit(&document, &revision)?;
                self.set_phase(SyncPhase::Idle);
                tracing::info!(courses = document.len(), "pushed local version");
                Ok(SyncOutcome::Pushed)
            }
            Decision::Merge => {
                self.set_phase(SyncPhase::Merging);
                let merged = merge_documents(&document, &remote_document);

                if self.local_changed_since(local_modified)? {
                    return Ok(self.defer_to_rerun());
                }

                self.local.save_document(&merged)?;
                if documents_equivalent(&merged, &remote_document) {
                    self.commit(&merged, &blob.revision)?;
                    self.set_phase(SyncPhase::Idle);
                    return Ok(SyncOutcome::Pulled);
                }
                self.set_phase(SyncPhase::Pushing);
                let revision = self.push(&merged, Some(&blob)).await?;
                self.commit(&merged, &revision)?;
                self.set_phase(SyncPhase::Idle);
                tracing::info!(courses = merged.len(), "merged local and remote");
                Ok(SyncOutcome::Merged)
            }
            Decision::Conflict => {
                let record = ConflictRecord {
                    local_modified_at: local_modified,
                    remote_modified_at: blob.modified_at,
                    local: document,
                    remote: remote_document,
                    remote_revision: blob.revision,
                    detected_at: Utc::now(),
                };
                tracing::warn!(
                    local_modified = ?record.local_modified_at,
                    remote_modified = %record.remote_modified_at,
                    "both sides changed since last sync"
                );
                let mut shared = self.lock_shared();
                shared.conflict = Some(record);
                shared.phase = SyncPhase::ConflictPending;
                Ok(SyncOutcome::Conflict)
            }
        }
    }

    /// Settle the parked conflict and finish the interrupted cycle.
    ///
    /// Errors with [`SyncError::InvalidState`] when no conflict is pending.
    /// A pushing resolution fetches a fresh revision token first, so a
    /// remote that moved again after the conflict was detected cannot
    /// reject the resolution with a stale-write error.
    pub async fn resolve_conflict(&self, resolution: Resolution) -> Result<ResolutionOutcome> {
        let record = self
            .lock_shared()
            .conflict
            .clone()
            .ok_or_else(|| SyncError::InvalidState("no conflict pending".to_string()))?;

        let (resolved, changed_local) = conflict::resolve(&record, resolution);
        tracing::info!(resolution = ?resolution, changed_local, "resolving conflict");

        let pushed_revision = if documents_equivalent(&resolved, &record.remote) {
            None
        } else {
            let base_revision = self
                .remote
                .get(&self.config.remote_key)
                .await?
                .map(|b| b.revision);
            let content = RemoteDocument::from_document(&resolved, Utc::now()).to_json()?;
            let revision = self
                .remote
                .put(&self.config.remote_key, &content, base_revision.as_ref())
                .await?;
            Some(revision)
        };
        let pushed = pushed_revision.is_some();

        self.local.save_document(&resolved)?;
        let revision = pushed_revision.unwrap_or_else(|| record.remote_revision.clone());
        self.commit(&resolved, &revision)?;

        let mut shared = self.lock_shared();
        shared.conflict = None;
        shared.phase = SyncPhase::Idle;
        drop(shared);

        Ok(ResolutionOutcome {
            resolution,
            changed_local,
            pushed,
        })
    }

    /// Start the periodic background sync task.
    ///
    /// The task skips ticks while a conflict is pending or a cycle is
    /// already in flight, and logs failures instead of stopping.
    pub fn start_auto_sync(self: &Arc<Self>) -> Result<()> {
        let mut slot = self.auto_task.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return Ok(());
        }
        self.local.set_auto_sync_enabled(true)?;

        let orchestrator = Arc::clone(self);
        let interval = self.config.auto_sync_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // first tick fires immediately, skip it
            loop {
                ticker.tick().await;
                if orchestrator.lock_shared().phase == SyncPhase::ConflictPending {
                    tracing::debug!("auto-sync suppressed while conflict pending");
                    continue;
                }
                if orchestrator.in_flight.load(Ordering::SeqCst) {
                    continue;
                }
                if let Err(err) = orchestrator.sync_now().await {
                    tracing::warn!(error = %err, "auto-sync cycle failed");
                }
            }
        });
        *slot = Some(handle);
        tracing::info!(interval_secs = interval.as_secs(), "auto-sync started");
        Ok(())
    }

    /// Stop the background sync task.
    pub fn stop_auto_sync(&self) -> Result<()> {
        let mut slot = self.auto_task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
            tracing::info!("auto-sync stopped");
        }
        self.local.set_auto_sync_enabled(false)
    }

    /// Serialize the working document as a pretty-printed backup file.
    pub fn export(&self) -> Result<String> {
        let document = self.local.load_document()?;
        Ok(ExportFile::from_document(&document, Utc::now()).to_json_pretty()?)
    }

    /// Replace the working document with an imported backup.
    ///
    /// The snapshot is left untouched, so the import shows up as pending
    /// changes and reaches the remote on the next sync.
    pub fn import(&self, json: &str) -> Result<()> {
        let document = import_document(json)?;
        tracing::info!(courses = document.len(), "imported backup");
        self.local.save_document(&document)
    }

    async fn push(&self, document: &Document, base: Option<&FetchedBlob>) -> Result<String> {
        let content = RemoteDocument::from_document(document, Utc::now()).to_json()?;
        self.remote
            .put(
                &self.config.remote_key,
                &content,
                base.map(|b| &b.revision),
            )
            .await
    }

    /// Whether the working document moved since this cycle first read it.
    ///
    /// Committing a cycle whose inputs went stale would either clobber the
    /// edit or hide it behind a fresher last-sync stamp, so every arm checks
    /// this before its side effects.
    fn local_changed_since(&self, baseline: Option<DateTime<Utc>>) -> Result<bool> {
        Ok(self.local.load_document()?.latest_modified() != baseline)
    }

    /// Abandon the current cycle and queue a rerun against fresh state.
    fn defer_to_rerun(&self) -> SyncOutcome {
        tracing::debug!("local document changed mid-cycle, queueing rerun");
        self.queued.store(true, Ordering::SeqCst);
        self.set_phase(SyncPhase::Idle);
        SyncOutcome::Queued
    }

    /// Record a successful sync: snapshot, instant, and remote revision.
    fn commit(&self, document: &Document, revision: &str) -> Result<()> {
        self.local.save_snapshot(document)?;
        self.local.set_last_sync(Utc::now())?;
        self.local.set_remote_revision(revision)
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.lock_shared().phase = phase;
    }

    fn lock_shared(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<L, R> Drop for SyncOrchestrator<L, R> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.auto_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}
