//! Error types for the policy guard.

use thiserror::Error;

/// Errors that can occur while building a guard.
///
/// Sanitizing never fails; these only surface from
/// [`PolicyGuard::try_new`](crate::PolicyGuard::try_new).
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// A `re:` blocklist entry is not a valid regular expression.
    #[error("invalid blocklist pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as configured.
        pattern: String,
        /// Regex compilation error.
        #[source]
        source: regex::Error,
    },
}

/// Result alias for guard construction.
pub type Result<T> = std::result::Result<T, GuardrailError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn invalid_pattern_display_and_source() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = GuardrailError::InvalidPattern {
            pattern: "re:(".into(),
            source,
        };
        assert!(err.to_string().starts_with("invalid blocklist pattern 're:('"));
        assert!(err.source().is_some());
    }
}
