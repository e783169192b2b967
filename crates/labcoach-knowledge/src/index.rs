//! The knowledge index: immutable snapshots swapped atomically on rebuild.
//!
//! Readers clone the current `Arc<IndexSnapshot>` under a read lock held only
//! for the clone, then rank without any lock. A rebuild embeds outside every
//! lock and publishes under a short publish lock that covers the file rename
//! and the pointer swap, so the file on disk and the in-memory snapshot move
//! together and a slower, older build never overwrites a newer one.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use labcoach_core::{FocusHint, RetrievedContext};
use labcoach_embeddings::{BackendId, FallbackEmbedder};
use labcoach_settings::KnowledgeSettings;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chunker::chunk_text;
use crate::errors::Result;
use crate::index_file::{KnowledgeChunk, read_index, write_index};
use crate::loader::{SourceDocument, load_documents};
use crate::query::{compose_query, rank};

/// Where the corpus lives and how it is chunked.
#[derive(Clone, Debug)]
pub struct IndexConfig {
    /// Corpus root.
    pub source_dir: PathBuf,
    /// JSONL index file.
    pub index_path: PathBuf,
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
}

impl IndexConfig {
    /// Config from the knowledge settings section.
    pub fn from_settings(settings: &KnowledgeSettings) -> Self {
        Self {
            source_dir: PathBuf::from(&settings.source_dir),
            index_path: PathBuf::from(&settings.index_path),
            chunk_size: settings.chunk_size,
        }
    }
}

/// One immutable published state of the index.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    chunks: Vec<KnowledgeChunk>,
    backend: Option<BackendId>,
    generation: u64,
    /// Hashing vectors for every chunk, computed on first use when the
    /// query cannot be embedded in `backend`'s space.
    local_vectors: OnceLock<Vec<Vec<f32>>>,
}

impl IndexSnapshot {
    fn new(chunks: Vec<KnowledgeChunk>, backend: Option<BackendId>, generation: u64) -> Self {
        Self {
            chunks,
            backend,
            generation,
            local_vectors: OnceLock::new(),
        }
    }

    /// Chunks in build order.
    pub fn chunks(&self) -> &[KnowledgeChunk] {
        &self.chunks
    }

    /// Vector space of the stored embeddings.
    pub fn backend(&self) -> Option<&BackendId> {
        self.backend.as_ref()
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the snapshot has no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn local_vectors(&self, embedder: &FallbackEmbedder) -> &[Vec<f32>] {
        self.local_vectors.get_or_init(|| {
            let texts: Vec<String> = self.chunks.iter().map(|c| c.text.clone()).collect();
            embedder.embed_local(&texts)
        })
    }
}

/// Result of a rebuild.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Chunks built.
    pub indexed_chunks: usize,
    /// Whether this build became the current index. A build that finishes
    /// after a newer one started is discarded.
    pub published: bool,
    /// Documents that produced at least one chunk.
    pub documents: usize,
    /// Corpus root that was scanned.
    pub source_dir: String,
    /// Index file written.
    pub index_path: String,
    /// Vector space of the new index, if any chunk was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
}

/// Chunked, embedded knowledge corpus answering nearest-neighbour queries.
pub struct KnowledgeIndex {
    config: IndexConfig,
    embedder: Arc<FallbackEmbedder>,
    snapshot: RwLock<Arc<IndexSnapshot>>,
    publish: Mutex<()>,
    next_generation: AtomicU64,
}

impl KnowledgeIndex {
    /// Open the index, loading the existing index file if it is readable.
    ///
    /// An unreadable file yields an empty index and a warning.
    pub fn open(config: IndexConfig, embedder: Arc<FallbackEmbedder>) -> Self {
        let snapshot = match read_index(&config.index_path) {
            Ok(loaded) => IndexSnapshot::new(loaded.chunks, loaded.backend, 0),
            Err(e) => {
                warn!(path = %config.index_path.display(), error = %e, "knowledge index unreadable, starting empty");
                IndexSnapshot::default()
            }
        };
        debug!(chunks = snapshot.len(), "knowledge index opened");
        Self {
            config,
            embedder,
            snapshot: RwLock::new(Arc::new(snapshot)),
            publish: Mutex::new(()),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Index configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&*self.snapshot.read())
    }

    /// Number of chunks in the current snapshot.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the current snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Rescan the configured source directory and rebuild in full.
    pub async fn rebuild(&self) -> Result<BuildReport> {
        let documents = load_documents(&self.config.source_dir)?;
        self.build(&documents).await
    }

    /// Rebuild the index from `documents`, replacing the file and snapshot.
    ///
    /// On error the previous file and snapshot stay in place.
    pub async fn build(&self, documents: &[SourceDocument]) -> Result<BuildReport> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        self.build_generation(documents, generation).await
    }

    async fn build_generation(
        &self,
        documents: &[SourceDocument],
        generation: u64,
    ) -> Result<BuildReport> {
        let mut pending: Vec<(String, usize, String)> = Vec::new();
        let mut ids: Vec<String> = Vec::new();
        let mut contributing = 0;
        for doc in documents {
            let pieces = chunk_text(&doc.text, self.config.chunk_size);
            if !pieces.is_empty() {
                contributing += 1;
            }
            for (ordinal, text) in pieces.into_iter().enumerate() {
                ids.push(format!("{}-{ordinal:03}", doc.stem));
                pending.push((doc.id.clone(), ordinal, text));
            }
        }

        let texts: Vec<String> = pending.iter().map(|(_, _, t)| t.clone()).collect();
        let embedded = self.embedder.embed(&texts).await;
        let chunks: Vec<KnowledgeChunk> = pending
            .into_iter()
            .zip(ids)
            .zip(embedded.vectors)
            .map(|(((source, ordinal, text), id), embedding)| KnowledgeChunk {
                id,
                source,
                ordinal,
                text,
                embedding,
            })
            .collect();
        let backend = (!chunks.is_empty()).then(|| embedded.backend.clone());

        let published = self.publish(chunks, backend, generation)?;

        let report = BuildReport {
            indexed_chunks: texts.len(),
            published,
            documents: contributing,
            source_dir: self.config.source_dir.display().to_string(),
            index_path: self.config.index_path.display().to_string(),
            backend: (!texts.is_empty()).then(|| embedded.backend.to_string()),
        };
        if published {
            info!(
                chunks = report.indexed_chunks,
                documents = report.documents,
                backend = %embedded.backend,
                "knowledge index rebuilt"
            );
        }
        Ok(report)
    }

    fn publish(
        &self,
        chunks: Vec<KnowledgeChunk>,
        backend: Option<BackendId>,
        generation: u64,
    ) -> Result<bool> {
        let _guard = self.publish.lock();
        if self.snapshot().generation > generation {
            debug!(generation, "newer index already published, discarding build");
            return Ok(false);
        }
        let file_backend = backend
            .clone()
            .unwrap_or_else(|| self.embedder.fallback_backend());
        write_index(&self.config.index_path, &chunks, &file_backend)?;
        *self.snapshot.write() = Arc::new(IndexSnapshot::new(chunks, backend, generation));
        Ok(true)
    }

    /// Re-read the index file, e.g. after another process rebuilt it.
    pub fn reload(&self) -> Result<usize> {
        let loaded = read_index(&self.config.index_path)?;
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let count = loaded.chunks.len();
        let _guard = self.publish.lock();
        *self.snapshot.write() =
            Arc::new(IndexSnapshot::new(loaded.chunks, loaded.backend, generation));
        Ok(count)
    }

    /// Up to `k` chunks ranked by cosine similarity to `text`.
    ///
    /// `focus` only adds keywords to the query string. Ties keep build
    /// order. An empty index or a blank query returns an empty list.
    pub async fn query(&self, text: &str, k: usize, focus: FocusHint) -> Vec<RetrievedContext> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() || k == 0 || text.trim().is_empty() {
            return Vec::new();
        }
        let query = vec![compose_query(text, focus)];

        let stored = match snapshot.backend() {
            Some(backend) => self.embedder.embed_as(&query, backend).await,
            None => None,
        };
        let ranked = match stored.and_then(|v| v.into_iter().next()) {
            Some(q) => rank(&q, snapshot.chunks().iter().map(|c| c.embedding.as_slice()), k),
            None => {
                debug!("query embedded with local fallback, ranking local chunk vectors");
                let q = self.embedder.embed_local(&query).into_iter().next().unwrap_or_default();
                let local = snapshot.local_vectors(&self.embedder);
                rank(&q, local.iter().map(Vec::as_slice), k)
            }
        };

        ranked
            .into_iter()
            .map(|(idx, score)| {
                let chunk = &snapshot.chunks()[idx];
                RetrievedContext {
                    source: chunk.source.clone(),
                    chunk_id: chunk.id.clone(),
                    score,
                    text: chunk.text.clone(),
                }
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use labcoach_core::Phase;
    use std::path::Path;

    fn embedder() -> Arc<FallbackEmbedder> {
        Arc::new(FallbackEmbedder::local(384))
    }

    fn config(dir: &Path) -> IndexConfig {
        IndexConfig {
            source_dir: dir.join("kb"),
            index_path: dir.join("index/index.jsonl"),
            chunk_size: 1200,
        }
    }

    fn corpus() -> Vec<SourceDocument> {
        vec![
            SourceDocument::new(
                "01_phase_checklist.md",
                "Recon checklist: inventory services and exposed ports.",
            ),
            SourceDocument::new(
                "02_reporting_template.md",
                "Reporting template: timeline, findings, and evidence references.",
            ),
            SourceDocument::new(
                "03_web_enum.md",
                "Web enumeration: directory brute force with gobuster and ffuf.\n\nCheck robots.txt and sitemap.",
            ),
        ]
    }

    #[tokio::test]
    async fn empty_index_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let index = KnowledgeIndex::open(config(dir.path()), embedder());
        assert!(index.is_empty());
        assert!(index.query("anything", 4, FocusHint::Auto).await.is_empty());
    }

    #[tokio::test]
    async fn build_persists_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let index = KnowledgeIndex::open(config(dir.path()), embedder());
        let report = index.build(&corpus()).await.unwrap();
        assert_eq!(report.indexed_chunks, 3);
        assert_eq!(report.documents, 3);
        assert_eq!(report.backend.as_deref(), Some("hashing:384"));
        assert!(report.published);

        let reopened = KnowledgeIndex::open(config(dir.path()), embedder());
        assert_eq!(reopened.len(), 3);
        let ids: Vec<String> = reopened.snapshot().chunks().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec!["01_phase_checklist-000", "02_reporting_template-000", "03_web_enum-000"]);
    }

    #[tokio::test]
    async fn exact_chunk_text_ranks_first() {
        let dir = tempfile::tempdir().unwrap();
        let index = KnowledgeIndex::open(config(dir.path()), embedder());
        let _ = index.build(&corpus()).await.unwrap();
        for chunk in index.snapshot().chunks() {
            let hits = index.query(&chunk.text, 3, FocusHint::Auto).await;
            assert_eq!(hits[0].chunk_id, chunk.id);
            assert!(hits.iter().all(|h| h.score <= hits[0].score));
        }
    }

    #[tokio::test]
    async fn report_focus_prefers_template() {
        let dir = tempfile::tempdir().unwrap();
        let index = KnowledgeIndex::open(config(dir.path()), embedder());
        let _ = index.build(&corpus()).await.unwrap();
        let hits = index
            .query("need report template", 2, FocusHint::Phase(Phase::Report))
            .await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "02_reporting_template.md");
    }

    #[tokio::test]
    async fn k_bounds_results() {
        let dir = tempfile::tempdir().unwrap();
        let index = KnowledgeIndex::open(config(dir.path()), embedder());
        let _ = index.build(&corpus()).await.unwrap();
        assert_eq!(index.query("services", 1, FocusHint::Auto).await.len(), 1);
        assert!(index.query("services", 0, FocusHint::Auto).await.is_empty());
        assert!(index.query("   ", 3, FocusHint::Auto).await.is_empty());
    }

    #[tokio::test]
    async fn rebuild_from_source_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        std::fs::create_dir_all(&cfg.source_dir).unwrap();
        std::fs::write(cfg.source_dir.join("notes.md"), "one\n\ntwo").unwrap();
        let index = KnowledgeIndex::open(cfg, embedder());
        let report = index.rebuild().await.unwrap();
        assert_eq!(report.indexed_chunks, 1);

        let report = index.build(&[]).await.unwrap();
        assert_eq!(report.indexed_chunks, 0);
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn stale_build_is_reported_unpublished() {
        let dir = tempfile::tempdir().unwrap();
        let index = KnowledgeIndex::open(config(dir.path()), embedder());
        let stale = index.next_generation.fetch_add(1, Ordering::SeqCst);
        let newer = index.build(&corpus()).await.unwrap();
        assert!(newer.published);

        let report = index
            .build_generation(&corpus()[..1], stale)
            .await
            .unwrap();
        assert!(!report.published);
        assert_eq!(report.indexed_chunks, 1);
        assert_eq!(index.len(), 3);
        assert_eq!(KnowledgeIndex::open(config(dir.path()), embedder()).len(), 3);
    }

    #[tokio::test]
    async fn failed_build_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a dir").unwrap();
        let cfg = IndexConfig {
            source_dir: dir.path().join("kb"),
            index_path: blocker.join("index.jsonl"),
            chunk_size: 1200,
        };
        let index = KnowledgeIndex::open(cfg, embedder());
        assert!(index.build(&corpus()).await.is_err());
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn foreign_backend_falls_back_to_local_vectors() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let remote = BackendId::Remote { model: "gone".into() };
        let chunks = vec![
            KnowledgeChunk {
                id: "a-000".into(),
                source: "a.md".into(),
                ordinal: 0,
                text: "smb share enumeration".into(),
                embedding: vec![1.0, 0.0],
            },
            KnowledgeChunk {
                id: "b-000".into(),
                source: "b.md".into(),
                ordinal: 0,
                text: "report timeline".into(),
                embedding: vec![0.0, 1.0],
            },
        ];
        write_index(&cfg.index_path, &chunks, &remote).unwrap();

        let index = KnowledgeIndex::open(cfg, embedder());
        let hits = index.query("report timeline", 2, FocusHint::Auto).await;
        assert_eq!(hits[0].chunk_id, "b-000");
    }

    #[tokio::test]
    async fn reload_picks_up_external_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let a = KnowledgeIndex::open(config(dir.path()), embedder());
        let b = KnowledgeIndex::open(config(dir.path()), embedder());
        let _ = a.build(&corpus()).await.unwrap();
        assert!(b.is_empty());
        assert_eq!(b.reload().unwrap(), 3);
    }

    #[tokio::test]
    async fn unreadable_index_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        std::fs::create_dir_all(&cfg.index_path).unwrap();
        let index = KnowledgeIndex::open(cfg, embedder());
        assert!(index.is_empty());
    }
}
