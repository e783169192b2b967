//! Service-level errors.
//!
//! The pipeline itself never fails; these come from session lookup and
//! index rebuilds.

use labcoach_knowledge::KnowledgeError;
use labcoach_store::StoreError;
use thiserror::Error;

/// Errors surfaced by [`CoachService`](crate::CoachService).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Session store failure, including unknown session ids.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Knowledge index rebuild failure.
    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),
}

impl EngineError {
    /// Whether the error is an unknown or malformed session reference.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::NotFound(_) | StoreError::InvalidId(_))
        )
    }
}

/// Convenience alias for service results.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_classified() {
        let err = EngineError::from(StoreError::NotFound("x-1".into()));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "session x-1 not found");
        let err = EngineError::from(StoreError::Io(std::io::Error::other("disk")));
        assert!(!err.is_not_found());
    }
}
