//! Local persistence.
//!
//! [`LocalStore`] is a synchronous string key-value contract modeled on a
//! browser-style storage area: writes either fully succeed or fail with
//! [`SyncError::Quota`] leaving the prior value intact. [`DocumentStore`]
//! wraps it with the typed accessors the orchestrator uses, so key names and
//! serialization live in exactly one place.

use crate::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use lectern_engine::{Document, Error};
use std::collections::HashMap;
use std::sync::Mutex;

/// Well-known storage keys. All Lectern state shares one prefix so it can be
/// cleared without touching unrelated data in a shared storage area.
pub mod keys {
    /// The working document.
    pub const DOCUMENT: &str = "lectern-courses";
    /// Snapshot of the document at the last successful sync.
    pub const SNAPSHOT: &str = "lectern-sync-snapshot";
    /// Instant of the last successful sync, RFC 3339.
    pub const LAST_SYNC: &str = "lectern-last-sync";
    /// Revision token of the last blob we fetched or wrote.
    pub const REMOTE_REVISION: &str = "lectern-remote-revision";
    /// Whether periodic background sync is enabled ("true" / "false").
    pub const AUTO_SYNC: &str = "lectern-auto-sync";
}

/// Synchronous string key-value storage.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl<L: LocalStore + ?Sized> LocalStore for std::sync::Arc<L> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        (**self).put(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Typed accessors over a [`LocalStore`].
#[derive(Debug)]
pub struct DocumentStore<L> {
    store: L,
}

impl<L: LocalStore> DocumentStore<L> {
    pub fn new(store: L) -> Self {
        Self { store }
    }

    /// The working document; an empty one if nothing has been saved yet.
    pub fn load_document(&self) -> Result<Document> {
        self.load_json(keys::DOCUMENT)
            .map(|doc| doc.unwrap_or_default())
    }

    pub fn save_document(&self, document: &Document) -> Result<()> {
        self.save_json(keys::DOCUMENT, document)
    }

    /// The snapshot captured at the last successful sync, if any.
    pub fn load_snapshot(&self) -> Result<Option<Document>> {
        self.load_json(keys::SNAPSHOT)
    }

    pub fn save_snapshot(&self, document: &Document) -> Result<()> {
        self.save_json(keys::SNAPSHOT, document)
    }

    pub fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        match self.store.get(keys::LAST_SYNC)? {
            None => Ok(None),
            Some(raw) => raw
                .parse::<DateTime<Utc>>()
                .map(Some)
                .map_err(|e| Error::MalformedPayload(e.to_string()).into()),
        }
    }

    pub fn set_last_sync(&self, at: DateTime<Utc>) -> Result<()> {
        self.store.put(keys::LAST_SYNC, &at.to_rfc3339())
    }

    pub fn remote_revision(&self) -> Result<Option<String>> {
        self.store.get(keys::REMOTE_REVISION)
    }

    pub fn set_remote_revision(&self, revision: &str) -> Result<()> {
        self.store.put(keys::REMOTE_REVISION, revision)
    }

    pub fn auto_sync_enabled(&self) -> Result<bool> {
        Ok(self.store.get(keys::AUTO_SYNC)?.as_deref() == Some("true"))
    }

    pub fn set_auto_sync_enabled(&self, enabled: bool) -> Result<()> {
        self.store
            .put(keys::AUTO_SYNC, if enabled { "true" } else { "false" })
    }

    fn load_json(&self, key: &str) -> Result<Option<Document>> {
        match self.store.get(key)? {
            None => Ok(None),
            Some(raw) => {
                let document: Document = serde_json::from_str(&raw)
                    .map_err(|e| Error::MalformedPayload(e.to_string()))?;
                document.validate()?;
                Ok(Some(document))
            }
        }
    }

    fn save_json(&self, key: &str, document: &Document) -> Result<()> {
        let raw = serde_json::to_string(document)
            .map_err(|e| Error::MalformedPayload(e.to_string()))?;
        self.store.put(key, &raw)
    }
}

/// In-memory [`LocalStore`] with an optional byte quota.
///
/// A write that would push total stored bytes past the quota fails with
/// [`SyncError::Quota`] and leaves the existing value untouched.
#[derive(Debug, Default)]
pub struct MemoryLocal {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryLocal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }
}

impl LocalStore for MemoryLocal {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(quota) = self.quota_bytes {
            let existing = entries.get(key).map_or(0, String::len);
            let used: usize = entries.values().map(String::len).sum();
            if used - existing + value.len() > quota {
                return Err(SyncError::Quota(format!(
                    "{} bytes over a {} byte quota",
                    used - existing + value.len(),
                    quota
                )));
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}
