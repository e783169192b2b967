//! `SQLite` key/value cache for remote embedding vectors.
//!
//! Keys are `emb:` + SHA-256 of `namespace:normalized text`, so identical
//! texts embedded by the same model share one row. Every cache failure is
//! logged and treated as a miss; caching never fails an embed.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::service::{BackendId, EmbeddingService};

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

/// Small `SQLite`-backed JSON value cache with optional TTL.
pub struct EmbeddingCache {
    conn: Mutex<Connection>,
}

impl EmbeddingCache {
    /// Open (or create) the cache file, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::with_connection(conn)
    }

    /// In-memory cache (tests, or when no cache path is configured).
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                created_at REAL NOT NULL,
                expires_at REAL
            );
            CREATE INDEX IF NOT EXISTS idx_cache_expires ON cache(expires_at);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Cached vector for `key`, dropping it when expired.
    pub fn get(&self, key: &str) -> Result<Option<Vec<f32>>> {
        let conn = self.conn.lock();
        let row: Option<(String, Option<f64>)> = conn
            .query_row(
                "SELECT value, expires_at FROM cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((value, expires_at)) = row else {
            return Ok(None);
        };
        if expires_at.is_some_and(|exp| exp < now_secs()) {
            let _ = conn.execute("DELETE FROM cache WHERE key = ?1", params![key])?;
            return Ok(None);
        }
        let vector: Vec<f32> = serde_json::from_str(&value)?;
        Ok((!vector.is_empty()).then_some(vector))
    }

    /// Store a vector, replacing any previous value.
    pub fn set(&self, key: &str, vector: &[f32], ttl: Option<Duration>) -> Result<()> {
        let now = now_secs();
        let expires_at = ttl.map(|t| now + t.as_secs_f64());
        let payload = serde_json::to_string(vector)?;
        let _ = self.conn.lock().execute(
            "INSERT OR REPLACE INTO cache (key, value, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![key, payload, now, expires_at],
        )?;
        Ok(())
    }

    /// Drop expired rows, then the oldest rows beyond `max_entries`.
    pub fn prune(&self, max_entries: Option<usize>) -> Result<usize> {
        let conn = self.conn.lock();
        let mut removed = conn.execute(
            "DELETE FROM cache WHERE expires_at IS NOT NULL AND expires_at < ?1",
            params![now_secs()],
        )?;
        if let Some(max) = max_entries {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache", [], |r| r.get(0))?;
            let max = i64::try_from(max).unwrap_or(i64::MAX);
            if count > max {
                removed += conn.execute(
                    "DELETE FROM cache WHERE key IN (SELECT key FROM cache ORDER BY created_at ASC LIMIT ?1)",
                    params![count - max],
                )?;
            }
        }
        Ok(removed)
    }

    /// Number of rows.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM cache", [], |r| r.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Whether the cache has no rows.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Cache key for `text` under `namespace`.
pub fn cache_key(namespace: &str, text: &str) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let digest = Sha256::digest(format!("{namespace}:{normalized}").as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("emb:{hex}")
}

/// Cache policy for [`CachedEmbeddingService`].
#[derive(Clone, Debug, Default)]
pub struct CachePolicy {
    /// Row lifetime (`None` = never expires).
    pub ttl: Option<Duration>,
    /// Row cap enforced after each batch of misses.
    pub max_entries: Option<usize>,
}

/// Wraps an embedding service with a per-text vector cache.
pub struct CachedEmbeddingService<S> {
    inner: S,
    cache: Arc<EmbeddingCache>,
    namespace: String,
    policy: CachePolicy,
}

impl<S: EmbeddingService> CachedEmbeddingService<S> {
    /// Wrap `inner`; the namespace is derived from its backend id.
    pub fn new(inner: S, cache: Arc<EmbeddingCache>, policy: CachePolicy) -> Self {
        let namespace = inner.backend_id().to_string();
        Self {
            inner,
            cache,
            namespace,
            policy,
        }
    }

    fn lookup(&self, key: &str) -> Option<Vec<f32>> {
        match self.cache.get(key) {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "embedding cache read failed");
                None
            }
        }
    }
}

#[async_trait]
impl<S: EmbeddingService> EmbeddingService for CachedEmbeddingService<S> {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let keys: Vec<String> = texts.iter().map(|t| cache_key(&self.namespace, t)).collect();
        let mut results: Vec<Option<Vec<f32>>> = keys.iter().map(|k| self.lookup(k)).collect();

        let missing: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_none())
            .map(|(i, _)| i)
            .collect();

        debug!(
            total = texts.len(),
            misses = missing.len(),
            "embedding cache lookup"
        );

        if !missing.is_empty() {
            let batch: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.inner.embed(&batch).await?;
            for (&idx, vector) in missing.iter().zip(vectors) {
                if let Err(e) = self.cache.set(&keys[idx], &vector, self.policy.ttl) {
                    warn!(error = %e, "embedding cache write failed");
                }
                results[idx] = Some(vector);
            }
            if let Err(e) = self.cache.prune(self.policy.max_entries) {
                warn!(error = %e, "embedding cache prune failed");
            }
        }

        Ok(results.into_iter().map(Option::unwrap_or_default).collect())
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn backend_id(&self) -> BackendId {
        self.inner.backend_id()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
