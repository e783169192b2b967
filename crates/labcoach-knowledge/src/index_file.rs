//! JSONL index file: one chunk record per line.
//!
//! Writes go to a temporary file in the same directory which is then renamed
//! over the index, so a failed build leaves the previous index untouched.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use labcoach_embeddings::BackendId;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::errors::Result;

/// One embedded chunk of a knowledge document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// `{stem}-{ordinal:03}`.
    pub id: String,
    /// Document the chunk came from.
    pub source: String,
    /// Position of the chunk within its document.
    pub ordinal: usize,
    /// Chunk text.
    pub text: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct IndexRecord {
    #[serde(flatten)]
    chunk: KnowledgeChunk,
    backend: BackendId,
}

/// Chunks read back from an index file.
#[derive(Debug, Default)]
pub struct LoadedIndex {
    /// Chunks in build order.
    pub chunks: Vec<KnowledgeChunk>,
    /// Vector space of the chunks (`None` for an empty index).
    pub backend: Option<BackendId>,
}

/// Atomically replace the index at `path`.
pub fn write_index(path: &Path, chunks: &[KnowledgeChunk], backend: &BackendId) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        for chunk in chunks {
            let record = IndexRecord {
                chunk: chunk.clone(),
                backend: backend.clone(),
            };
            serde_json::to_writer(&mut writer, &record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    let _ = tmp.persist(path)?;
    Ok(())
}

/// Read the index at `path`. A missing file is an empty index.
///
/// Malformed lines and records from a vector space other than the first
/// record's are skipped with a warning.
pub fn read_index(path: &Path) -> Result<LoadedIndex> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LoadedIndex::default()),
        Err(e) => return Err(e.into()),
    };

    let mut loaded = LoadedIndex::default();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: IndexRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), line = lineno + 1, error = %e, "skipping malformed index record");
                continue;
            }
        };
        match &loaded.backend {
            None => loaded.backend = Some(record.backend),
            Some(backend) if *backend != record.backend => {
                warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    expected = %backend,
                    found = %record.backend,
                    "skipping index record from another embedding backend"
                );
                continue;
            }
            Some(_) => {}
        }
        loaded.chunks.push(record.chunk);
    }
    Ok(loaded)
}
