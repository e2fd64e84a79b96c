//! Convert-then-merge orchestration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::assembler::PdfAssembler;
use crate::convert::Backend;
use crate::error::{PdfMixError, Result};
use crate::io::{PdfReader, PdfWriter, WriteStatistics};
use crate::model::{ConversionResult, FileRef, FormatCategory};
use crate::progress::{ProgressEvent, ProgressSink};

/// Stage name of the conversion start and conversion summary events.
pub const CONVERSION_STAGE: &str = "Conversion";

/// Stage name of the per-file merge events.
pub const MERGING_STAGE: &str = "Merging";

/// Stage name of the final summary event.
pub const COMPLETE_STAGE: &str = "Complete";

/// Outcome of a successful merge.
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// Where the merged PDF was written.
    pub output: PathBuf,

    /// Pages in the merged PDF.
    pub pages: usize,

    /// Files that contributed pages or were empty but valid.
    pub merged: usize,

    /// Files that failed to convert or parse.
    pub failed: Vec<PathBuf>,

    /// Inputs that did not exist and were never dispatched.
    pub skipped: Vec<PathBuf>,

    /// Total wall time, conversion included.
    pub duration: Duration,

    /// Output file statistics.
    pub write: WriteStatistics,
}

impl MergeReport {
    /// Display names of failed files.
    pub fn failed_names(&self) -> Vec<String> {
        self.failed.iter().map(|path| display_name(path)).collect()
    }
}

/// Converts inputs with a [`Backend`] and merges the results in input order.
pub struct Merger {
    backend: Box<dyn Backend>,
    reader: PdfReader,
    writer: PdfWriter,
}

impl Merger {
    /// Create a merger converting through `backend`.
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            reader: PdfReader::new(),
            writer: PdfWriter::new(),
        }
    }

    /// Use `writer` for the output document.
    pub fn with_writer(mut self, writer: PdfWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Backend in use.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Merge `files` into a single PDF at `output`.
    ///
    /// Files are merged in ascending id order, whatever order conversion
    /// finished in. Missing files are skipped, and files that fail to
    /// convert or parse are reported in [`MergeReport::failed`].
    ///
    /// # Errors
    ///
    /// Returns [`PdfMixError::NoPagesMerged`] if the result would have no
    /// pages; no output file is written then. Write failures are returned
    /// as-is.
    pub fn merge(
        &self,
        files: &[FileRef],
        output: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<MergeReport> {
        let start = Instant::now();
        let registry = self.backend.registry();

        let mut skipped = Vec::new();
        let mut pdfs = Vec::new();
        let mut to_convert = Vec::new();
        for file in files {
            if !file.path().exists() {
                warn!(id = file.id(), path = %file.path().display(), "input file not found, skipping");
                skipped.push(file.path().to_path_buf());
            } else if registry.category_of(file.path()) == Some(FormatCategory::Pdf) {
                pdfs.push(file.clone());
            } else {
                to_convert.push(file.clone());
            }
        }

        let mut outcome = ConversionResult::new();
        for file in &pdfs {
            match std::fs::read(file.path()) {
                Ok(bytes) => outcome.push_success(file.id(), bytes),
                Err(e) => {
                    warn!(file = %file.file_name(), error = %e, "failed to read pdf");
                    outcome.push_failure(file);
                }
            }
        }

        if !to_convert.is_empty() {
            outcome.extend(self.convert(&to_convert, sink));
        }

        let names: HashMap<u64, &FileRef> = files.iter().rev().map(|f| (f.id(), f)).collect();
        let mut failed: Vec<PathBuf> = outcome.failed.iter().map(|(_, path)| path.clone()).collect();
        let mut entries = outcome.successful;
        entries.sort_by_key(|(id, _)| *id);

        let total = entries.len();
        let mut assembler = PdfAssembler::new();
        let mut merged = 0;
        for (index, (id, bytes)) in entries.into_iter().enumerate() {
            let (label, path) = match names.get(&id) {
                Some(file) => (file.file_name(), file.path().to_path_buf()),
                None => (format!("#{id}"), PathBuf::from(format!("#{id}"))),
            };
            sink.emit(
                ProgressEvent::determinate(MERGING_STAGE, index + 1, total).with_filename(&label),
            );

            match self
                .reader
                .load_bytes(&bytes, &label)
                .and_then(|doc| assembler.append_document(doc))
            {
                Ok(pages) => {
                    debug!(file = %label, pages, "appended");
                    merged += 1;
                }
                Err(e) => {
                    warn!(file = %label, error = %e, "skipping unreadable pdf");
                    failed.push(path);
                }
            }
        }

        let pages = assembler.page_count();
        if pages == 0 {
            return Err(PdfMixError::NoPagesMerged);
        }

        sink.emit(
            ProgressEvent::determinate(COMPLETE_STAGE, merged, merged + failed.len()).with_message(
                format!("Merged {merged} files, {} failed.", failed.len()),
            ),
        );

        let mut doc = assembler.finish();
        let write = self.writer.save(&mut doc, output)?;
        info!(
            output = %output.display(),
            pages,
            merged,
            failed = failed.len(),
            skipped = skipped.len(),
            "merge complete"
        );

        Ok(MergeReport {
            output: output.to_path_buf(),
            pages,
            merged,
            failed,
            skipped,
            duration: start.elapsed(),
            write,
        })
    }

    fn convert(&self, files: &[FileRef], sink: &dyn ProgressSink) -> ConversionResult {
        sink.emit(ProgressEvent::indeterminate(
            CONVERSION_STAGE,
            format!("Starting conversion of {} files to PDF...", files.len()),
        ));
        info!(backend = self.backend.name(), files = files.len(), "converting");

        let mut result = self.backend.convert_to_pdf(files, sink);
        result.fail_unprocessed(files);

        let converted = result.successful.len();
        let mut message = format!("Converted {converted} of {} files.", files.len());
        let failed_names = result.failed_names();
        if !failed_names.is_empty() {
            message.push_str(&format!(" Failed: {}", failed_names.join(", ")));
        }
        sink.emit(
            ProgressEvent::determinate(CONVERSION_STAGE, converted, files.len())
                .with_message(message),
        );

        result
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
