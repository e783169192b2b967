//! # labcoach-embeddings
//!
//! Text embedding backends for knowledge retrieval.
//!
//! - [`EmbeddingService`]: async trait every backend implements
//! - [`HashingEmbeddingService`]: deterministic local token-hashing vectors
//! - [`RemoteEmbeddingService`]: hosted feature-extraction endpoint
//! - [`CachedEmbeddingService`]: `SQLite` vector cache around any backend
//! - [`FallbackEmbedder`]: primary with timeout, hashing when it fails
//!
//! Vectors from different backends are tagged with a [`BackendId`] so callers
//! never rank vectors from two different spaces against each other.

#![deny(unsafe_code)]

pub mod cache;
pub mod errors;
pub mod fallback;
pub mod hashing;
pub mod normalize;
pub mod remote;
pub mod service;

pub use cache::{CachePolicy, CachedEmbeddingService, EmbeddingCache, cache_key};
pub use errors::{EmbeddingError, Result};
pub use fallback::{Embedded, FallbackEmbedder, build_embedder};
pub use hashing::{DEFAULT_DIMENSIONS, HashingEmbeddingService};
pub use normalize::{cosine_similarity, l2_normalize};
pub use remote::{RemoteEmbeddingConfig, RemoteEmbeddingService};
pub use service::{BackendId, EmbeddingService};
