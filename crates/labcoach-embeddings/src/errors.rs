//! Embedding error types.
//!
//! All embedding errors are non-fatal: callers degrade to the local hashing
//! backend when a remote backend fails.

use thiserror::Error;

/// Errors from embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Service not ready (no token, or disabled).
    #[error("Embedding service not ready")]
    NotReady,

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or error message.
        message: String,
    },

    /// The response did not contain usable vectors.
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    /// The call exceeded its time budget.
    #[error("Embedding call timed out after {0} ms")]
    Timeout(u64),

    /// `SQLite` error (preserves source chain).
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EmbeddingError {
    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status == 429 || *status == 503 || *status >= 500,
            _ => false,
        }
    }

    /// Short category label for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotReady => "not_ready",
            Self::Http(_) => "network",
            Self::Api { .. } => "api",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Timeout(_) => "timeout",
            Self::Sqlite(_) | Self::Io(_) | Self::Json(_) => "storage",
        }
    }
}

/// Result alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn error_display_variants() {
        let cases = vec![
            (EmbeddingError::NotReady, "Embedding service not ready"),
            (
                EmbeddingError::Api {
                    status: 503,
                    message: "loading".into(),
                },
                "API error (503): loading",
            ),
            (
                EmbeddingError::InvalidResponse("not an array".into()),
                "Invalid embedding response: not an array",
            ),
            (
                EmbeddingError::Timeout(2000),
                "Embedding call timed out after 2000 ms",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn retryable_classification() {
        assert!(EmbeddingError::Timeout(1).is_retryable());
        assert!(
            EmbeddingError::Api {
                status: 429,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !EmbeddingError::Api {
                status: 401,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!EmbeddingError::NotReady.is_retryable());
        assert_eq!(EmbeddingError::Timeout(1).category(), "timeout");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EmbeddingError>();
    }

    #[test]
    fn error_source_chain_preserved() {
        let err: EmbeddingError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, EmbeddingError::Sqlite(_)));
        let source = err.source().expect("should have source");
        assert!(source.to_string().contains("Query returned no rows"));
    }
}
