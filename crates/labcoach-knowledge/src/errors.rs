//! Knowledge index error types.

use thiserror::Error;

/// Errors from building or persisting the knowledge index.
///
/// Queries never return these; an unusable index reads as empty.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Filesystem error while scanning documents or writing the index.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Index record (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Replacing the index file with the freshly written one failed.
    #[error("failed to replace index file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Result alias for knowledge operations.
pub type Result<T> = std::result::Result<T, KnowledgeError>;
