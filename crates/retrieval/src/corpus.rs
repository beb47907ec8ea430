//! Corpus loading from a folder of text files.

use std::path::{Path, PathBuf};

use emberbot_core::error::RetrievalError;
use tracing::{debug, info};

/// Where the corpus text comes from.
#[derive(Debug, Clone)]
pub enum CorpusSource {
    /// Every `.txt` file in a directory, in file-name order.
    Directory(PathBuf),
    /// Inline text, mainly for embedding the engine in other programs.
    Text(String),
}

impl CorpusSource {
    pub async fn load(&self) -> Result<String, RetrievalError> {
        match self {
            CorpusSource::Directory(dir) => load_dir(dir).await,
            CorpusSource::Text(text) => Ok(text.clone()),
        }
    }
}

/// Read every `.txt` file in `dir`, sorted by file name, joined with newlines.
///
/// A missing directory yields empty text.
pub async fn load_dir(dir: &Path) -> Result<String, RetrievalError> {
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        info!(dir = %dir.display(), "Corpus directory not found, starting with an empty corpus");
        return Ok(String::new());
    }

    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| RetrievalError::Corpus(format!("{}: {e}", dir.display())))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| RetrievalError::Corpus(e.to_string()))?
    {
        let path = entry.path();
        let is_txt = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if is_txt && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut parts = Vec::with_capacity(files.len());
    for path in &files {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RetrievalError::Corpus(format!("{}: {e}", path.display())))?;
        parts.push(String::from_utf8_lossy(&bytes).into_owned());
        debug!(file = %path.display(), "Loaded corpus file");
    }

    info!(files = files.len(), dir = %dir.display(), "Corpus loaded");
    Ok(parts.join("\n"))
}
