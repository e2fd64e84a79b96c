//! PDF writing.
//!
//! Output is written atomically: the document goes to a temporary file in
//! the destination directory, which is then persisted over the target.
//! A crash mid-write never leaves a truncated PDF behind.

use lopdf::Document;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{PdfMixError, Result};

/// Options for writing PDF files.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Compress streams before writing.
    pub compress: bool,

    /// Renumber objects to close gaps left by merging.
    pub renumber: bool,

    /// Buffer size for writing (in bytes).
    pub buffer_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compress: true,
            renumber: true,
            buffer_size: 64 * 1024,
        }
    }
}

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// PDF writer with configurable behavior.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    options: WriteOptions,
}

impl PdfWriter {
    /// Create a new PDF writer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with custom options.
    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Create a writer without compression.
    pub fn without_compression() -> Self {
        Self {
            options: WriteOptions {
                compress: false,
                ..Default::default()
            },
        }
    }

    /// Save `doc` to `path`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`PdfMixError::FailedToWrite`] if the directory cannot be
    /// created, serialization fails, or the temporary file cannot be
    /// moved into place.
    pub fn save(&self, doc: &mut Document, path: &Path) -> Result<WriteStatistics> {
        let start = Instant::now();
        let fail = |source: std::io::Error| PdfMixError::FailedToWrite {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(fail)?;

        if self.options.compress {
            doc.compress();
        }
        if self.options.renumber {
            doc.renumber_objects();
        }

        let mut temp = NamedTempFile::new_in(&dir).map_err(fail)?;
        {
            let mut writer = BufWriter::with_capacity(self.options.buffer_size, temp.as_file_mut());
            doc.save_to(&mut writer)
                .map_err(|e| fail(std::io::Error::other(e)))?;
            writer.flush().map_err(fail)?;
        }
        temp.persist(path).map_err(|e| fail(e.error))?;

        let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let write_time = start.elapsed();
        debug!(path = %path.display(), bytes = file_size, elapsed = ?write_time, "wrote pdf");

        Ok(WriteStatistics {
            write_time,
            file_size,
            output_path: path.to_path_buf(),
        })
    }

    /// Serialize `doc` into memory.
    pub fn to_bytes(&self, doc: &mut Document) -> Result<Vec<u8>> {
        if self.options.compress {
            doc.compress();
        }
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}
