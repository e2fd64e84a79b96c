//! Page selection and extraction.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use super::assembler::PdfAssembler;
use crate::error::{PdfMixError, Result};
use crate::io::{PdfReader, PdfWriter, WriteStatistics};
use crate::progress::{ProgressEvent, ProgressSink};

/// Stage name of the per-page extraction events.
pub const EXTRACTING_STAGE: &str = "Extracting pages";

/// Ordered, zero-based page indices.
///
/// Order and duplicates are kept exactly as given.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageSelection {
    indices: Vec<usize>,
}

impl PageSelection {
    /// Wrap zero-based indices.
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    /// Parse 1-based pages and ranges like `"10,1-3,1"`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfMixError::BadPageSelection`] for empty input, page
    /// zero, reversed ranges or anything that is not a number.
    pub fn parse(input: &str) -> Result<Self> {
        let bad = |reason: String| PdfMixError::BadPageSelection {
            input: input.to_string(),
            reason,
        };

        if input.trim().is_empty() {
            return Err(bad("no pages given".to_string()));
        }

        let mut indices = Vec::new();
        for part in input.split(',').map(str::trim) {
            if part.is_empty() {
                return Err(bad("empty entry".to_string()));
            }

            match part.split_once('-') {
                Some((start, end)) => {
                    let start = parse_page(start.trim()).map_err(&bad)?;
                    let end = parse_page(end.trim()).map_err(&bad)?;
                    if end < start {
                        return Err(bad(format!("range {part} runs backwards")));
                    }
                    indices.extend(start - 1..end);
                }
                None => indices.push(parse_page(part).map_err(&bad)? - 1),
            }
        }

        Ok(Self { indices })
    }

    /// Zero-based indices in selection order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of selected pages, duplicates included.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Selected pages out of range for a `total_pages` document, 1-based.
    ///
    /// Each page is reported once, in selection order.
    pub fn out_of_range(&self, total_pages: usize) -> Vec<usize> {
        let mut invalid: Vec<usize> = Vec::new();
        for &index in &self.indices {
            let page = index + 1;
            if index >= total_pages && !invalid.contains(&page) {
                invalid.push(page);
            }
        }
        invalid
    }
}

impl FromStr for PageSelection {
    type Err = PdfMixError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_page(text: &str) -> std::result::Result<usize, String> {
    match text.parse::<usize>() {
        Ok(0) => Err("pages are numbered from 1".to_string()),
        Ok(page) => Ok(page),
        Err(_) => Err(format!("'{text}' is not a page number")),
    }
}

/// Outcome of a page extraction.
#[derive(Debug, Clone)]
pub struct ExtractReport {
    /// Source PDF.
    pub input: PathBuf,
    /// Page count of the source PDF.
    pub source_pages: usize,
    /// Pages written to the output.
    pub pages: usize,
    /// Output file statistics.
    pub write: WriteStatistics,
}

/// Copies selected pages of one PDF into a new PDF.
#[derive(Debug, Clone, Default)]
pub struct PageExtractor {
    reader: PdfReader,
    writer: PdfWriter,
}

impl PageExtractor {
    /// Create an extractor with default I/O settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the pages of `input` named by `selection` to `output`.
    ///
    /// Pages are written in selection order, duplicates included. The whole
    /// selection is validated before anything is written.
    ///
    /// # Errors
    ///
    /// - [`PdfMixError::BadPageSelection`] if `selection` is empty
    /// - [`PdfMixError::InvalidPageSelection`] listing every page past the
    ///   end of the document
    /// - load and write errors of the underlying reader and writer
    pub fn extract(
        &self,
        input: &Path,
        selection: &PageSelection,
        output: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<ExtractReport> {
        if selection.is_empty() {
            return Err(PdfMixError::BadPageSelection {
                input: String::new(),
                reason: "no pages selected".to_string(),
            });
        }

        let source = self.reader.load(input)?;
        let total_pages = source.get_pages().len();

        let invalid = selection.out_of_range(total_pages);
        if !invalid.is_empty() {
            return Err(PdfMixError::InvalidPageSelection {
                path: input.to_path_buf(),
                invalid,
                total_pages,
            });
        }

        let count = selection.len();
        for (position, index) in selection.indices().iter().enumerate() {
            sink.emit(
                ProgressEvent::determinate(EXTRACTING_STAGE, position + 1, count).with_message(
                    format!("Processing page {} ({}/{count})...", index + 1, position + 1),
                ),
            );
        }

        let mut assembler = PdfAssembler::new();
        assembler.append_pages(source, selection.indices())?;
        let mut doc = assembler.finish();
        let write = self.writer.save(&mut doc, output)?;

        info!(
            input = %input.display(),
            output = %output.display(),
            pages = count,
            "extracted pages"
        );

        Ok(ExtractReport {
            input: input.to_path_buf(),
            source_pages: total_pages,
            pages: count,
            write,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::fixtures;
    use crate::progress::{NoProgress, ProgressLog};
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("1", vec![0])]
    #[case("10,1-3,1", vec![9, 0, 1, 2, 0])]
    #[case(" 2 - 4 , 7", vec![1, 2, 3, 6])]
    #[case("5-5", vec![4])]
    fn test_parse_selection(#[case] input: &str, #[case] expected: Vec<usize>) {
        assert_eq!(PageSelection::parse(input).unwrap().indices(), expected.as_slice());
    }

    #[rstest]
    #[case("")]
    #[case("  ")]
    #[case("0")]
    #[case("1,,2")]
    #[case("4-2")]
    #[case("a")]
    #[case("1-")]
    fn test_parse_selection_rejects(#[case] input: &str) {
        assert!(matches!(
            PageSelection::parse(input),
            Err(PdfMixError::BadPageSelection { .. })
        ));
    }

    #[test]
    fn test_out_of_range_reports_each_page_once() {
        let selection = PageSelection::from_indices(vec![14, 0, 14, 11]);
        assert_eq!(selection.out_of_range(10), vec![15, 12]);
    }

    #[test]
    fn test_extract_reorders_and_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let input = fixtures::write_pdf(
            temp_dir.path(),
            "ten.pdf",
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
        );
        let output = temp_dir.path().join("picked.pdf");
        let log = ProgressLog::new();

        let report = PageExtractor::new()
            .extract(
                &input,
                &PageSelection::from_indices(vec![9, 0, 0]),
                &output,
                &log,
            )
            .unwrap();

        assert_eq!(report.pages, 3);
        assert_eq!(report.source_pages, 10);
        let doc = PdfReader::new().load(&output).unwrap();
        assert_eq!(fixtures::page_widths(&doc), vec![10, 1, 1]);

        let events = log.stage(EXTRACTING_STAGE);
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0].message.as_deref(),
            Some("Processing page 10 (1/3)...")
        );
    }

    #[test]
    fn test_extract_out_of_range_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let input = fixtures::write_pdf(
            temp_dir.path(),
            "ten.pdf",
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
        );
        let output = temp_dir.path().join("picked.pdf");

        let err = PageExtractor::new()
            .extract(
                &input,
                &PageSelection::from_indices(vec![15]),
                &output,
                &NoProgress,
            )
            .unwrap_err();

        assert!(err.to_string().contains("The document only has 10 pages"));
        assert!(!output.exists());
    }

    #[test]
    fn test_extract_empty_selection() {
        let temp_dir = TempDir::new().unwrap();
        let input = fixtures::write_pdf(temp_dir.path(), "one.pdf", &[1]);

        let err = PageExtractor::new()
            .extract(
                &input,
                &PageSelection::default(),
                &temp_dir.path().join("out.pdf"),
                &NoProgress,
            )
            .unwrap_err();
        assert!(matches!(err, PdfMixError::BadPageSelection { .. }));
    }
}
