//! # labcoach-knowledge
//!
//! The reference corpus the coach retrieves from.
//!
//! Documents (`.md`/`.txt`) are split into paragraph-bounded chunks, embedded
//! through a [`labcoach_embeddings::FallbackEmbedder`], and persisted as a
//! JSONL index. [`KnowledgeIndex`] serves cosine-ranked queries from an
//! immutable snapshot that a rebuild replaces in one swap.

#![deny(unsafe_code)]

pub mod chunker;
pub mod errors;
pub mod index;
pub mod index_file;
pub mod loader;
pub mod query;

pub use chunker::chunk_text;
pub use errors::{KnowledgeError, Result};
pub use index::{BuildReport, IndexConfig, IndexSnapshot, KnowledgeIndex};
pub use index_file::KnowledgeChunk;
pub use loader::{SourceDocument, load_documents};
pub use query::{compose_query, focus_terms};
