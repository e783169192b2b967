//! Parse errors for the foundation types.

use thiserror::Error;

/// Errors raised when parsing core enums from user-supplied strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Unknown phase name.
    #[error("unknown phase: {0}")]
    UnknownPhase(String),

    /// Unknown memory mode.
    #[error("unknown memory mode: {0}")]
    UnknownMemoryMode(String),
}

/// Result alias for core parsing.
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_variants() {
        assert_eq!(
            CoreError::UnknownPhase("exfil".into()).to_string(),
            "unknown phase: exfil"
        );
        assert_eq!(
            CoreError::UnknownMemoryMode("all".into()).to_string(),
            "unknown memory mode: all"
        );
    }
}
