//! Document loading
//!
//! Walks an input directory and turns supported files into [`Document`]s:
//! `.txt` as UTF-8 plain text, `.pdf` extracted per page (feature `pdf`).
//! Unreadable or unsupported files never abort the batch; they are skipped
//! and collected as warnings surfaced at the end of ingestion.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A raw loaded unit, one per input file (or one per PDF page).
/// Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Full text content
    pub content: String,

    /// Provenance identifier: file name, with `#page=N` appended for PDF pages
    pub source_id: String,
}

impl Document {
    pub fn new(content: String, source_id: String) -> Self {
        Self { content, source_id }
    }
}

/// Result of loading a directory: documents plus per-file warnings.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    pub warnings: Vec<String>,
}

/// Load all supported documents from a directory.
///
/// The listing is a plain, non-recursive directory read: every regular file
/// is considered, no ignore rules apply, and subdirectories are not
/// descended into. Files are visited in sorted order so document order (and
/// therefore chunk order downstream) is reproducible across runs.
pub fn load_documents(dir: &Path) -> Result<LoadOutcome> {
    if !dir.is_dir() {
        return Err(Error::InvalidPath(format!(
            "not a directory: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() {
            files.push(path);
        } else {
            debug!("Skipping non-file entry: {}", path.display());
        }
    }
    files.sort();

    let mut outcome = LoadOutcome::default();

    for path in files {
        match load_file(&path) {
            Ok(docs) => outcome.documents.extend(docs),
            Err(e) => {
                let msg = format!("{}: {}", path.display(), e);
                warn!("{}", msg);
                outcome.warnings.push(msg);
            }
        }
    }

    Ok(outcome)
}

/// Load a single file into one or more documents.
fn load_file(path: &Path) -> Result<Vec<Document>> {
    let source_id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidPath(path.display().to_string()))?;

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" => {
            debug!("Loading text document: {}", source_id);
            let bytes = std::fs::read(path)?;
            let content = String::from_utf8(bytes)
                .map_err(|_| Error::Load(format!("'{}' is not valid UTF-8", source_id)))?;
            Ok(vec![Document::new(content, source_id)])
        }
        #[cfg(feature = "pdf")]
        "pdf" => {
            debug!("Loading PDF document: {}", source_id);
            load_pdf(path, &source_id)
        }
        #[cfg(not(feature = "pdf"))]
        "pdf" => Err(Error::Load(format!(
            "'{}' requires the 'pdf' feature",
            source_id
        ))),
        other => Err(Error::Load(format!(
            "unsupported extension '{}' for '{}'",
            other, source_id
        ))),
    }
}

/// Extract a PDF into page-tagged sub-documents.
#[cfg(feature = "pdf")]
fn load_pdf(path: &Path, source_id: &str) -> Result<Vec<Document>> {
    let pages = pdf_extract::extract_text_by_pages(path)
        .map_err(|e| Error::Load(format!("failed to extract '{}': {}", source_id, e)))?;

    let docs = pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| Document::new(text, format!("{}#page={}", source_id, i + 1)))
        .collect();

    Ok(docs)
}
