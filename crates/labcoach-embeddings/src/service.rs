//! Embedding service trait.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{EmbeddingError, Result};

/// Which family of backend produced a vector.
///
/// Vectors from different families live in different spaces and must never
/// be compared with each other.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendId {
    /// Local token-hashing vectors of the given dimension.
    Hashing {
        /// Vector dimension.
        dimensions: usize,
    },
    /// Remote model.
    Remote {
        /// Model id.
        model: String,
    },
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hashing { dimensions } => write!(f, "hashing:{dimensions}"),
            Self::Remote { model } => write!(f, "remote:{model}"),
        }
    }
}

/// Trait for embedding text into vectors.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed a batch of texts, one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text (default: calls `embed` with one item).
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty result".into()))
    }

    /// Whether the service can be called at all.
    fn is_ready(&self) -> bool;

    /// Output embedding dimensions (0 when only known after a call).
    fn dimensions(&self) -> usize;

    /// Identity of the vector space this service produces.
    fn backend_id(&self) -> BackendId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_id_display_and_serde() {
        let id = BackendId::Remote {
            model: "minilm".into(),
        };
        assert_eq!(id.to_string(), "remote:minilm");
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json["kind"], "remote");
        let back: BackendId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
        assert_eq!(
            BackendId::Hashing { dimensions: 384 }.to_string(),
            "hashing:384"
        );
    }
}
