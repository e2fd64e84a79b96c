//! PDF loading.
//!
//! Inputs arrive either as files on disk (PDF inputs, page extraction) or as
//! in-memory bytes produced by a conversion backend. Both paths end in a
//! `lopdf::Document` or a typed [`PdfMixError`].

use lopdf::Document;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use crate::error::{PdfMixError, Result};

/// Loads PDF documents with consistent error reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReader {
    require_pages: bool,
}

impl PdfReader {
    /// Create a reader that accepts documents without pages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reader that rejects documents with zero pages.
    pub fn requiring_pages() -> Self {
        Self {
            require_pages: true,
        }
    }

    /// Load a PDF from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the path does not exist or is not a regular file
    /// - the file is not a parseable PDF
    /// - the reader requires pages and the document has none
    pub fn load(&self, path: &Path) -> Result<Document> {
        if !path.exists() {
            return Err(PdfMixError::file_not_found(path));
        }
        if !path.is_file() {
            return Err(PdfMixError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let label = label_for(path);
        let start = Instant::now();
        let doc = Document::load(path)
            .map_err(|e| PdfMixError::failed_to_load_pdf(&label, e.to_string()))?;
        debug!(file = %label, elapsed = ?start.elapsed(), "loaded pdf");

        self.check(doc, &label)
    }

    /// Load a PDF from bytes.
    ///
    /// `label` names the source in error messages, usually the original
    /// file name of a converted input.
    pub fn load_bytes(&self, bytes: &[u8], label: &str) -> Result<Document> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| PdfMixError::failed_to_load_pdf(label, e.to_string()))?;
        self.check(doc, label)
    }

    /// Number of pages of the PDF at `path`.
    pub fn page_count(&self, path: &Path) -> Result<usize> {
        Ok(self.load(path)?.get_pages().len())
    }

    fn check(&self, doc: Document, label: &str) -> Result<Document> {
        if self.require_pages && doc.get_pages().is_empty() {
            return Err(PdfMixError::failed_to_load_pdf(label, "document has no pages"));
        }
        Ok(doc)
    }
}

/// Short name of `path` for messages.
pub(crate) fn label_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
