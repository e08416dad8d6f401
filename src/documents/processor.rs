//! PDF text extraction
//!
//! Text is pulled page by page with `lopdf`, blank-line runs are collapsed,
//! and the pages are joined in order with one trailing newline each. Pages
//! with no text contribute nothing, so the output never contains a blank line.
//!
//! A document with no extractable text at all is reported as unreadable
//! rather than returned as an empty string.

use std::path::{Path, PathBuf};

use lopdf::Document;
use tracing::{debug, info, warn};

use crate::types::{AppError, AppResult};

pub struct DocumentProcessor;

impl DocumentProcessor {
    /// Read and normalize the text of the PDF at `path`.
    ///
    /// Parsing is CPU-bound and runs on the blocking pool. Dropping the
    /// returned future does not stop a parse that has already started.
    pub async fn read(path: impl AsRef<Path>) -> AppResult<String> {
        let path: PathBuf = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || Self::read_blocking(&path))
            .await
            .map_err(|e| AppError::DocumentUnreadable(format!("reader task failed: {}", e)))?
    }

    pub fn read_blocking(path: &Path) -> AppResult<String> {
        if !path.is_file() {
            return Err(AppError::DocumentUnreadable(format!(
                "{} does not exist",
                path.display()
            )));
        }

        let document = Document::load(path).map_err(|e| {
            AppError::DocumentUnreadable(format!("{} is not a valid PDF: {}", path.display(), e))
        })?;

        let text = Self::extract(&document)?;
        info!(path = %path.display(), chars = text.len(), "Document text extracted");
        Ok(text)
    }

    /// Extract normalized text from an already-parsed document.
    pub fn extract(document: &Document) -> AppResult<String> {
        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(AppError::DocumentUnreadable("document has no pages".to_string()));
        }

        let mut page_texts = Vec::with_capacity(pages.len());
        for page_number in pages.keys() {
            match document.extract_text(&[*page_number]) {
                Ok(text) => page_texts.push(text),
                Err(e) => {
                    // One bad page should not sink the rest of the report.
                    warn!(page = page_number, error = %e, "Failed to extract page text");
                    page_texts.push(String::new());
                }
            }
        }

        let text = join_pages(&page_texts);
        if text.is_empty() {
            return Err(AppError::DocumentUnreadable(
                "document contains no extractable text".to_string(),
            ));
        }

        debug!(pages = page_texts.len(), "Pages joined");
        Ok(text)
    }
}

/// Collapse every run of consecutive newlines into a single newline.
pub fn collapse_blank_lines(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let mut out = String::with_capacity(normalized.len());
    let mut previous_newline = false;

    for c in normalized.chars() {
        if c == '\n' {
            if previous_newline {
                continue;
            }
            previous_newline = true;
        } else {
            previous_newline = false;
        }
        out.push(c);
    }
    out
}

/// Normalize one page's raw text; `None` when nothing is left.
pub fn normalize_page(raw: &str) -> Option<String> {
    let collapsed = collapse_blank_lines(raw);
    let trimmed = collapsed.trim_matches('\n');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Join pages in order, each normalized page followed by one newline.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    let mut report = String::new();
    for page in pages {
        if let Some(text) = normalize_page(page.as_ref()) {
            report.push_str(&text);
            report.push('\n');
        }
    }
    report
}
