//! Embedding and knowledge index settings.

use serde::{Deserialize, Serialize};

/// Which embedding backend to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local token-hashing vectors only.
    Hashing,
    /// Remote feature-extraction endpoint with local fallback.
    #[default]
    Remote,
}

/// Embedding backend settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// Backend kind.
    pub provider: EmbeddingProvider,
    /// Remote model id.
    pub model: String,
    /// Remote inference base URL (the model id is appended).
    pub base_url: String,
    /// Bearer token for the remote endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Dimension of the local hashing vectors.
    pub dimensions: usize,
    /// Upper bound on one remote embedding call.
    pub timeout_ms: u64,
    /// `SQLite` file for cached remote vectors.
    pub cache_path: String,
    /// Cached vectors expire after this many seconds (0 = never).
    pub cache_ttl_secs: u64,
    /// Oldest cache rows beyond this count are pruned.
    pub cache_max_entries: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Remote,
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            base_url: "https://api-inference.huggingface.co/pipeline/feature-extraction"
                .to_string(),
            token: None,
            dimensions: 384,
            timeout_ms: 20_000,
            cache_path: "runtime/cache/embeddings.sqlite3".to_string(),
            cache_ttl_secs: 7 * 24 * 3600,
            cache_max_entries: 20_000,
        }
    }
}

impl EmbeddingSettings {
    /// Whether a remote call can be attempted at all.
    pub fn remote_enabled(&self) -> bool {
        self.provider == EmbeddingProvider::Remote
            && self.token.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// Knowledge corpus and index settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnowledgeSettings {
    /// Directory scanned for `.md` and `.txt` documents.
    pub source_dir: String,
    /// JSONL index file.
    pub index_path: String,
    /// Chunks returned per query.
    pub top_k: usize,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            source_dir: "data/rag/knowledge_base".to_string(),
            index_path: "data/rag/index/index.jsonl".to_string(),
            top_k: 4,
            chunk_size: 1200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_requires_token() {
        let mut settings = EmbeddingSettings::default();
        assert!(!settings.remote_enabled());
        settings.token = Some("hf_x".into());
        assert!(settings.remote_enabled());
        settings.provider = EmbeddingProvider::Hashing;
        assert!(!settings.remote_enabled());
    }
}
