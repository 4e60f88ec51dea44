//! Error types for the Lectern engine.

use thiserror::Error;

/// All possible errors from the Lectern engine.
///
/// The merge engine itself is total over well-formed input and never errors;
/// everything here is raised at the wire boundary or by document mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("duplicate {scope} id: {id}")]
    DuplicateId { scope: &'static str, id: String },

    #[error("empty {0} id")]
    EmptyId(&'static str),

    #[error("invalid tab type: {0}")]
    InvalidTabKind(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
