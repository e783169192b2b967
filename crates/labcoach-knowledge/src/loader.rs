//! Knowledge corpus loading.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::Result;

/// File extensions treated as knowledge documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["md", "txt"];

/// One readable document of the corpus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceDocument {
    /// Path relative to the corpus root, `/`-separated.
    pub id: String,
    /// File stem, used as the chunk id prefix.
    pub stem: String,
    /// Full document text.
    pub text: String,
}

impl SourceDocument {
    /// Build a document from an id and its text.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        let stem = Path::new(&id)
            .file_stem()
            .map_or_else(|| id.clone(), |s| s.to_string_lossy().into_owned());
        Self {
            id,
            stem,
            text: text.into(),
        }
    }
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.iter().any(|d| ext.eq_ignore_ascii_case(d)))
}

fn relative_id(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Read every `.md`/`.txt` file under `root`, sorted by path.
///
/// A missing root is an empty corpus. Blank files and files that are not
/// valid UTF-8 are skipped.
pub fn load_documents(root: &Path) -> Result<Vec<SourceDocument>> {
    if !root.is_dir() {
        warn!(path = %root.display(), "knowledge source directory missing");
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && is_document(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();

    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = std::fs::read(&path)?;
        let Ok(text) = String::from_utf8(bytes) else {
            warn!(path = %path.display(), "skipping non-UTF-8 document");
            continue;
        };
        if text.trim().is_empty() {
            continue;
        }
        docs.push(SourceDocument::new(relative_id(root, &path), text));
    }
    debug!(root = %root.display(), documents = docs.len(), "loaded knowledge documents");
    Ok(docs)
}
