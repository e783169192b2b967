//! Generation error types.
//!
//! [`GenerationError`] covers the backend call itself; [`GenerationFailure`]
//! covers text that came back but does not satisfy the suggestion contract.
//! Both route the engine to its heuristic generator.

use thiserror::Error;

/// Errors from calling a generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No usable backend (not configured, missing key, scripted failure).
    #[error("generation backend unavailable: {0}")]
    Unavailable(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Parsed error message.
        message: String,
    },

    /// The call exceeded its time budget.
    #[error("generation timed out after {0} ms")]
    Timeout(u64),

    /// The backend returned no content.
    #[error("generation returned an empty response")]
    EmptyResponse,
}

impl GenerationError {
    /// Whether retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Unavailable(_) | Self::EmptyResponse => false,
        }
    }

    /// Short category label for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Http(_) => "network",
            Self::Api { .. } => "api",
            Self::Timeout(_) => "timeout",
            Self::EmptyResponse => "empty_response",
        }
    }
}

/// Why generated text was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GenerationFailure {
    /// No JSON object could be read from the text.
    #[error("output is not a JSON object: {0}")]
    NotJson(String),

    /// JSON parsed but does not have the expected shape.
    #[error("output has an invalid shape: {0}")]
    InvalidShape(String),

    /// The output contained no usable action.
    #[error("output contains no actions")]
    NoActions,
}

/// Result alias for backend calls.
pub type Result<T> = std::result::Result<T, GenerationError>;
