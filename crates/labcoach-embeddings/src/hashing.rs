//! Deterministic token-hashing embeddings.
//!
//! Each lowercase alphanumeric token is hashed with SHA-256 into one of
//! `dimensions` buckets; bucket counts are L2-normalized. Not semantic, but
//! identical texts always map to identical vectors and shared vocabulary
//! raises similarity, which is enough to keep retrieval working offline.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::errors::Result;
use crate::normalize::l2_normalize;
use crate::service::{BackendId, EmbeddingService};

/// Default vector dimension.
pub const DEFAULT_DIMENSIONS: usize = 384;

/// Local embedding backend that never fails.
#[derive(Clone, Debug)]
pub struct HashingEmbeddingService {
    dims: usize,
}

impl Default for HashingEmbeddingService {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashingEmbeddingService {
    /// Create a hashing embedder with `dims` buckets (at least one).
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    /// Embed one text synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; self.dims];
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            #[allow(clippy::cast_possible_truncation)]
            let bucket = (u64::from_be_bytes(head) % self.dims as u64) as usize;
            v[bucket] += 1.0;
        }
        l2_normalize(&mut v);
        v
    }

    /// Embed many texts synchronously.
    pub fn embed_all(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

/// Lowercase alphanumeric tokens of `text`.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingService for HashingEmbeddingService {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(self.embed_all(texts))
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn backend_id(&self) -> BackendId {
        BackendId::Hashing {
            dimensions: self.dims,
        }
    }
}
