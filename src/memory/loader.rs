//! Document loading from disk.
//!
//! Plain text and Markdown are read as UTF-8. HTML is converted to Markdown
//! with `htmd`. PDF has no parser in this build, so PDF inputs are reported
//! as skipped.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::AppError;
use crate::memory::{SourceDocument, sha256_hex};

/// How a file is read, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Markdown,
    Html,
    Pdf,
    Unsupported,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "txt" | "text" | "" => DocumentKind::Text,
            "md" | "markdown" => DocumentKind::Markdown,
            "html" | "htm" => DocumentKind::Html,
            "pdf" => DocumentKind::Pdf,
            _ => DocumentKind::Unsupported,
        }
    }
}

/// Read one file into a [`SourceDocument`] whose `source` is the path.
pub fn load_text(path: &Path) -> Result<SourceDocument, AppError> {
    let kind = DocumentKind::from_path(path);
    match kind {
        DocumentKind::Pdf => {
            return Err(AppError::Memory(format!(
                "loader: {}: PDF input is not supported",
                path.display()
            )));
        }
        DocumentKind::Unsupported => {
            return Err(AppError::Memory(format!(
                "loader: {}: unsupported file type",
                path.display()
            )));
        }
        _ => {}
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Memory(format!("loader: read {}: {e}", path.display())))?;

    let content = if kind == DocumentKind::Html {
        htmd::convert(&raw)
            .map_err(|e| AppError::Memory(format!("loader: convert {}: {e}", path.display())))?
    } else {
        raw
    };

    debug!(path = %path.display(), chars = content.chars().count(), "loaded document");
    Ok(SourceDocument::new(content, path.display().to_string()))
}

/// Outcome of loading several files.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<SourceDocument>,
    /// Files that were not loaded, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Load every path, skipping (and logging) missing, unsupported and
/// duplicate-content files.
pub fn load_many(paths: &[PathBuf]) -> LoadReport {
    let mut report = LoadReport::default();
    let mut seen = HashSet::new();

    for path in paths {
        match load_text(path) {
            Ok(doc) => {
                if doc.content.trim().is_empty() {
                    warn!(path = %path.display(), "skipping empty document");
                    report.skipped.push((path.clone(), "empty document".into()));
                } else if !seen.insert(sha256_hex(&doc.content)) {
                    warn!(path = %path.display(), "skipping duplicate document");
                    report.skipped.push((path.clone(), "duplicate content".into()));
                } else {
                    report.documents.push(doc);
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping document");
                report.skipped.push((path.clone(), e.to_string()));
            }
        }
    }
    report
}
