//! PDF loading and text cleanup

use crate::errors::{AssistantError, Result};
use crate::services::DocumentLoader;
use crate::types::Document;
use async_trait::async_trait;
use lopdf::Document as PdfDocument;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bpage\s*\d+\b").expect("valid regex"));
static PAGE_COUNTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+\s*/\s*\d+\b").expect("valid regex"));
static ELLIPSIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{3,}").expect("valid regex"));

/// Normalize extracted page text.
///
/// Collapses whitespace, drops `Page N` markers and `N/M` page counters,
/// and shortens dot leaders to `...`.
pub fn clean_text(text: &str) -> String {
    let text = text.replace('\u{000C}', " ");
    let text = WHITESPACE.replace_all(&text, " ");
    let text = PAGE_MARKER.replace_all(text.trim(), "");
    let text = PAGE_COUNTER.replace_all(&text, "");
    let text = ELLIPSIS.replace_all(&text, "...");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Loads the configured reference PDFs page by page
#[derive(Debug, Clone)]
pub struct PdfLoader {
    data_dir: PathBuf,
    files: Vec<String>,
}

impl PdfLoader {
    pub fn new(data_dir: impl Into<PathBuf>, files: Vec<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            files,
        }
    }

    /// Paths of the configured files that exist on disk
    pub fn available_files(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .map(|f| self.data_dir.join(f))
            .filter(|p| p.exists())
            .collect()
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Extract cleaned, non-empty pages from one PDF
    pub fn load_file(path: &Path, source: &str) -> Result<Vec<Document>> {
        let pdf = PdfDocument::load(path)
            .map_err(|e| AssistantError::DocumentError(format!("{}: {}", path.display(), e)))?;

        let mut documents = Vec::new();
        for page_number in pdf.get_pages().keys() {
            let raw = match pdf.extract_text(&[*page_number]) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(source, page = page_number, error = %e, "failed to extract page text");
                    continue;
                }
            };

            if raw.trim().is_empty() {
                continue;
            }
            let cleaned = clean_text(&raw);
            if cleaned.is_empty() {
                continue;
            }

            documents.push(
                Document::new(cleaned, source, *page_number)
                    .with_metadata("file_path", JsonValue::from(path.display().to_string())),
            );
        }

        Ok(documents)
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();

        for file in &self.files {
            let path = self.data_dir.join(file);
            if !path.exists() {
                warn!(path = %path.display(), "file not found");
                continue;
            }

            info!(file = %file, "processing");
            let source = file.clone();
            let task_path = path.clone();
            let loaded =
                tokio::task::spawn_blocking(move || PdfLoader::load_file(&task_path, &source))
                    .await
                    .map_err(|e| AssistantError::DocumentError(e.to_string()))?;

            match loaded {
                Ok(pages) => {
                    info!(file = %file, pages = pages.len(), "loaded");
                    documents.extend(pages);
                }
                Err(e) => warn!(file = %file, error = %e, "error processing file"),
            }
        }

        Ok(documents)
    }
}
