//! Session store error types.

use thiserror::Error;

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No session with this id.
    #[error("session {0} not found")]
    NotFound(String),

    /// The id cannot name a session file.
    #[error("invalid session id: {0:?}")]
    InvalidId(String),

    /// Filesystem failure.
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session file could not be encoded or decoded.
    #[error("session JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Atomic replace of a session file failed.
    #[error("failed to persist session file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Convenience alias for session store results.
pub type Result<T> = std::result::Result<T, StoreError>;
