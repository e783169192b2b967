//! Primary/fallback embedding selection.
//!
//! [`FallbackEmbedder`] owns an optional primary backend (usually the cached
//! remote service) and the local hashing backend. Calls to the primary are
//! bounded by a timeout; any failure or timeout falls through to hashing, so
//! an embed through this type never errors.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use labcoach_settings::EmbeddingSettings;
use tracing::{debug, warn};

use crate::cache::{CachePolicy, CachedEmbeddingService, EmbeddingCache};
use crate::errors::{EmbeddingError, Result};
use crate::hashing::HashingEmbeddingService;
use crate::remote::{RemoteEmbeddingConfig, RemoteEmbeddingService};
use crate::service::{BackendId, EmbeddingService};

/// Vectors together with the backend that produced them.
#[derive(Clone, Debug)]
pub struct Embedded {
    /// One vector per input text.
    pub vectors: Vec<Vec<f32>>,
    /// Vector space of `vectors`.
    pub backend: BackendId,
}

/// Embeds through the primary backend when possible, hashing otherwise.
pub struct FallbackEmbedder {
    primary: Option<Arc<dyn EmbeddingService>>,
    fallback: HashingEmbeddingService,
    timeout: Duration,
}

impl FallbackEmbedder {
    /// Create an embedder with an optional primary backend.
    pub fn new(
        primary: Option<Arc<dyn EmbeddingService>>,
        fallback: HashingEmbeddingService,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }

    /// Hashing-only embedder.
    pub fn local(dimensions: usize) -> Self {
        Self::new(
            None,
            HashingEmbeddingService::new(dimensions),
            Duration::from_secs(1),
        )
    }

    /// Identity of the hashing backend.
    pub fn fallback_backend(&self) -> BackendId {
        self.fallback.backend_id()
    }

    /// Identity of the backend a fresh embed will try first.
    pub fn preferred_backend(&self) -> BackendId {
        self.ready_primary()
            .map_or_else(|| self.fallback_backend(), |p| p.backend_id())
    }

    /// Embed with the hashing backend only.
    pub fn embed_local(&self, texts: &[String]) -> Vec<Vec<f32>> {
        self.fallback.embed_all(texts)
    }

    /// Embed `texts`, degrading to hashing on any primary failure.
    pub async fn embed(&self, texts: &[String]) -> Embedded {
        if let Some(primary) = self.ready_primary() {
            match self.call_primary(primary, texts).await {
                Ok(vectors) => {
                    return Embedded {
                        vectors,
                        backend: primary.backend_id(),
                    };
                }
                Err(e) => warn!(
                    error = %e,
                    category = e.category(),
                    batch = texts.len(),
                    "primary embedding failed, using hashing fallback"
                ),
            }
        }
        Embedded {
            vectors: self.embed_local(texts),
            backend: self.fallback_backend(),
        }
    }

    /// Embed `texts` in the vector space `backend`.
    ///
    /// Returns `None` when that space is unreachable right now (primary
    /// missing, failing, or a different model); the caller decides how to
    /// compare across spaces.
    pub async fn embed_as(&self, texts: &[String], backend: &BackendId) -> Option<Vec<Vec<f32>>> {
        if *backend == self.fallback_backend() {
            return Some(self.embed_local(texts));
        }
        let primary = self.ready_primary().filter(|p| p.backend_id() == *backend)?;
        match self.call_primary(primary, texts).await {
            Ok(vectors) => Some(vectors),
            Err(e) => {
                warn!(error = %e, backend = %backend, "embedding in index space failed");
                None
            }
        }
    }

    fn ready_primary(&self) -> Option<&Arc<dyn EmbeddingService>> {
        self.primary.as_ref().filter(|p| p.is_ready())
    }

    async fn call_primary(
        &self,
        primary: &Arc<dyn EmbeddingService>,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let millis = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let vectors = tokio::time::timeout(self.timeout, primary.embed(texts))
            .await
            .map_err(|_| EmbeddingError::Timeout(millis))??;
        if vectors.len() != texts.len() || vectors.iter().any(Vec::is_empty) {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        debug!(backend = %primary.backend_id(), batch = texts.len(), "primary embedding ok");
        Ok(vectors)
    }
}

/// Build the embedder described by `settings`.
///
/// The remote backend is only wired in when a token is configured. A cache
/// file that cannot be opened leaves the remote backend uncached.
pub fn build_embedder(settings: &EmbeddingSettings) -> FallbackEmbedder {
    let fallback = HashingEmbeddingService::new(settings.dimensions);
    let timeout = Duration::from_millis(settings.timeout_ms.max(1));
    if !settings.remote_enabled() {
        debug!("remote embeddings disabled, hashing only");
        return FallbackEmbedder::new(None, fallback, timeout);
    }

    let remote = match RemoteEmbeddingService::new(RemoteEmbeddingConfig {
        base_url: settings.base_url.clone(),
        model: settings.model.clone(),
        token: settings.token.clone(),
        timeout,
        dimensions: 0,
    }) {
        Ok(remote) => remote,
        Err(e) => {
            warn!(error = %e, "failed to build remote embedding client");
            return FallbackEmbedder::new(None, fallback, timeout);
        }
    };

    let primary: Arc<dyn EmbeddingService> =
        match EmbeddingCache::open(Path::new(&settings.cache_path)) {
            Ok(cache) => {
                let policy = CachePolicy {
                    ttl: (settings.cache_ttl_secs > 0)
                        .then(|| Duration::from_secs(settings.cache_ttl_secs)),
                    max_entries: (settings.cache_max_entries > 0)
                        .then_some(settings.cache_max_entries),
                };
                Arc::new(CachedEmbeddingService::new(remote, Arc::new(cache), policy))
            }
            Err(e) => {
                warn!(error = %e, path = %settings.cache_path, "embedding cache unavailable");
                Arc::new(remote)
            }
        };

    FallbackEmbedder::new(Some(primary), fallback, timeout)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
