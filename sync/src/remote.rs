//! The remote store contract.
//!
//! A [`RemoteStore`] holds one opaque text blob per key and enforces
//! optimistic concurrency through revision tokens: every successful write
//! returns a new token, and a compare-and-swap write fails with
//! [`SyncError::RevisionConflict`] when the caller's token is stale. The
//! orchestrator never sees transport details; adapters for a concrete
//! backend (a gist-style HTTP API, a file share) implement this trait.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Opaque revision token issued by the remote on every write.
pub type RevisionToken = String;

/// A blob fetched from the remote, with its concurrency metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedBlob {
    pub content: String,
    pub revision: RevisionToken,
    /// Server-side modification instant, as reported by the remote. This is
    /// the timestamp the sync decision compares against, not anything
    /// embedded in the content.
    pub modified_at: DateTime<Utc>,
}

/// One blob per key with compare-and-swap writes.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the blob under `key`, or `None` if it has never been written.
    ///
    /// An absent blob is not an error; it is the normal state before the
    /// first sync.
    async fn get(&self, key: &str) -> Result<Option<FetchedBlob>>;

    /// Write `content` under `key`.
    ///
    /// With `base_revision` set, the write only succeeds if the stored blob
    /// still carries that revision; otherwise it fails with
    /// [`SyncError::RevisionConflict`] and nothing is applied. With
    /// `base_revision` absent the write requires that no blob exists yet.
    async fn put(
        &self,
        key: &str,
        content: &str,
        base_revision: Option<&RevisionToken>,
    ) -> Result<RevisionToken>;
}

#[async_trait]
impl<R: RemoteStore + ?Sized> RemoteStore for std::sync::Arc<R> {
    async fn get(&self, key: &str) -> Result<Option<FetchedBlob>> {
        (**self).get(key).await
    }

    async fn put(
        &self,
        key: &str,
        content: &str,
        base_revision: Option<&RevisionToken>,
    ) -> Result<RevisionToken> {
        (**self).put(key, content, base_revision).await
    }
}

#[derive(Debug, Clone)]
struct StoredBlob {
    content: String,
    revision: u64,
    modified_at: DateTime<Utc>,
}

/// In-memory [`RemoteStore`] with real compare-and-swap semantics.
///
/// Used by tests and as the reference for adapter authors. Revisions are
/// `r1`, `r2`, ... per key; `modified_at` is stamped at write time unless a
/// blob was seeded with [`MemoryRemote::seed`].
#[derive(Debug, Default)]
pub struct MemoryRemote {
    blobs: Mutex<HashMap<String, StoredBlob>>,
    fail_next: Mutex<Option<SyncError>>,
    fail_next_put: Mutex<Option<SyncError>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob directly, bypassing concurrency checks. Test setup only.
    pub fn seed(&self, key: &str, content: &str, modified_at: DateTime<Utc>) -> RevisionToken {
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        let revision = blobs.get(key).map_or(0, |b| b.revision) + 1;
        blobs.insert(
            key.to_string(),
            StoredBlob {
                content: content.to_string(),
                revision,
                modified_at,
            },
        );
        format!("r{revision}")
    }

    /// Make the next operation fail with the given error.
    pub fn fail_next(&self, error: SyncError) {
        *self.fail_next.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    /// Make only the next write fail with the given error; reads pass.
    pub fn fail_next_put(&self, error: SyncError) {
        *self.fail_next_put.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }

    fn take_failure(&self) -> Option<SyncError> {
        self.fail_next.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    fn take_put_failure(&self) -> Option<SyncError> {
        self.fail_next_put
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn get(&self, key: &str) -> Result<Option<FetchedBlob>> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.get(key).map(|b| FetchedBlob {
            content: b.content.clone(),
            revision: format!("r{}", b.revision),
            modified_at: b.modified_at,
        }))
    }

    async fn put(
        &self,
        key: &str,
        content: &str,
        base_revision: Option<&RevisionToken>,
    ) -> Result<RevisionToken> {
        if let Some(err) = self.take_failure().or_else(|| self.take_put_failure()) {
            return Err(err);
        }
        let mut blobs = self.blobs.lock().unwrap_or_else(|e| e.into_inner());
        let current = blobs.get(key).map(|b| format!("r{}", b.revision));
        if current.as_deref() != base_revision.map(String::as_str) {
            return Err(SyncError::RevisionConflict);
        }
        let revision = blobs.get(key).map_or(0, |b| b.revision) + 1;
        blobs.insert(
            key.to_string(),
            StoredBlob {
                content: content.to_string(),
                revision,
                modified_at: Utc::now(),
            },
        );
        Ok(format!("r{revision}"))
    }
}
