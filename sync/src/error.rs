//! Error types for the sync layer.

use thiserror::Error;

/// All possible errors from the sync layer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote could not be reached. Transient; retrying is reasonable.
    #[error("network error: {0}")]
    Network(String),

    /// The remote rejected the credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The remote blob changed under us since the last fetch. The write was
    /// not applied; the caller must pull again before retrying.
    #[error("remote revision conflict: blob changed since last fetch")]
    RevisionConflict,

    /// A payload failed to parse or validate.
    #[error(transparent)]
    Parse(#[from] lectern_engine::Error),

    /// Local storage refused the write for lack of space.
    #[error("storage quota exceeded: {0}")]
    Quota(String),

    /// Local storage failed to read or write.
    #[error("storage error: {0}")]
    Storage(String),

    /// The requested operation does not apply in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl SyncError {
    /// Whether a retry of the same operation can reasonably succeed without
    /// any intervening action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Network(_))
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(SyncError::Network("timeout".into()).is_retryable());
        assert!(!SyncError::Auth("bad token".into()).is_retryable());
        assert!(!SyncError::RevisionConflict.is_retryable());
        assert!(!SyncError::Quota("full".into()).is_retryable());
    }

    #[test]
    fn engine_errors_convert_to_parse() {
        let engine_err = lectern_engine::Error::MalformedPayload("bad json".into());
        let err: SyncError = engine_err.into();
        assert!(matches!(err, SyncError::Parse(_)));
        assert_eq!(err.to_string(), "malformed payload: bad json");
    }
}
