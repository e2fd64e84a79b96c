//! Core data model: file references, format categories and conversion results.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// A caller-supplied input file.
///
/// `id` is a stable ordinal chosen by the caller. It restores submission
/// order after conversion and correlates successes and failures without
/// relying on path uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRef {
    id: u64,
    path: PathBuf,
}

impl FileRef {
    /// Create a new file reference.
    pub fn new(id: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }

    /// Build references for `paths`, numbering them from 1 in order.
    pub fn numbered<I, P>(paths: I) -> Vec<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        paths
            .into_iter()
            .zip(1u64..)
            .map(|(path, id)| Self::new(id, path))
            .collect()
    }

    /// Caller-assigned id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Source path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for display, falling back to the full path.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Lower-cased extension without the dot, if any.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }
}

/// Capability category an input file falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatCategory {
    /// Already a PDF, merged as-is.
    Pdf,
    /// Spreadsheets.
    Table,
    /// Word-processing documents.
    Document,
    /// Slide decks.
    Presentation,
    /// Raster images.
    Image,
}

impl FormatCategory {
    /// All categories, in display order.
    pub const ALL: [FormatCategory; 5] = [
        Self::Pdf,
        Self::Table,
        Self::Document,
        Self::Presentation,
        Self::Image,
    ];

    /// Lower-case category name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Table => "table",
            Self::Document => "document",
            Self::Presentation => "presentation",
            Self::Image => "image",
        }
    }

    /// Whether files of this category must be converted before merging.
    pub fn needs_conversion(&self) -> bool {
        !matches!(self, Self::Pdf)
    }
}

impl fmt::Display for FormatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of converting a batch of files.
///
/// Every file dispatched to a backend ends up in exactly one of the two
/// lists once the backend returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionResult {
    /// `(id, pdf bytes)` for every converted file.
    pub successful: Vec<(u64, Vec<u8>)>,
    /// `(id, source path)` for every file that could not be converted.
    pub failed: Vec<(u64, PathBuf)>,
}

impl ConversionResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record converted PDF bytes for a file.
    pub fn push_success(&mut self, id: u64, bytes: Vec<u8>) {
        self.successful.push((id, bytes));
    }

    /// Record a failed file.
    pub fn push_failure(&mut self, file: &FileRef) {
        self.failed.push((file.id(), file.path().to_path_buf()));
    }

    /// Mark every file not yet accounted for as failed.
    pub fn fail_unprocessed<'a>(&mut self, files: impl IntoIterator<Item = &'a FileRef>) {
        let processed = self.processed_ids();
        for file in files {
            if !processed.contains(&file.id()) {
                self.push_failure(file);
            }
        }
    }

    /// Append another result to this one.
    pub fn extend(&mut self, other: ConversionResult) {
        self.successful.extend(other.successful);
        self.failed.extend(other.failed);
    }

    /// Ids that already have an outcome, successful or not.
    pub fn processed_ids(&self) -> BTreeSet<u64> {
        self.successful
            .iter()
            .map(|(id, _)| *id)
            .chain(self.failed.iter().map(|(id, _)| *id))
            .collect()
    }

    /// Display names of failed files, in failure order.
    pub fn failed_names(&self) -> Vec<String> {
        self.failed
            .iter()
            .map(|(_, path)| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            })
            .collect()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.successful.is_empty() && self.failed.is_empty()
    }
}
