//! Integration tests for page extraction.

use pdfmix::error::PdfMixError;
use pdfmix::merge::{PageExtractor, PageSelection};
use pdfmix::progress::NoProgress;
use rstest::rstest;
use tempfile::TempDir;

use crate::common::{page_widths, write_pdf};

const TEN_PAGES: &[i64] = &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

#[test]
fn test_extract_last_then_first_twice() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_pdf(temp_dir.path(), "ten.pdf", TEN_PAGES);
    let output = temp_dir.path().join("out.pdf");

    let report = PageExtractor::new()
        .extract(
            &input,
            &PageSelection::from_indices(vec![9, 0, 0]),
            &output,
            &NoProgress,
        )
        .unwrap();

    assert_eq!(report.pages, 3);
    assert_eq!(page_widths(&output), vec![10, 1, 1]);
}

#[test]
fn test_extract_past_the_end_names_page_count() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_pdf(temp_dir.path(), "ten.pdf", TEN_PAGES);
    let output = temp_dir.path().join("out.pdf");

    let err = PageExtractor::new()
        .extract(
            &input,
            &PageSelection::from_indices(vec![15]),
            &output,
            &NoProgress,
        )
        .unwrap_err();

    match &err {
        PdfMixError::InvalidPageSelection {
            invalid,
            total_pages,
            ..
        } => {
            assert_eq!(invalid, &vec![16]);
            assert_eq!(*total_pages, 10);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.to_string().contains("only has 10 pages"));
    assert!(!output.exists());
}

#[rstest]
#[case("1-3", vec![1, 2, 3])]
#[case("10,1-2,1", vec![10, 1, 2, 1])]
#[case("5", vec![5])]
fn test_extract_parsed_selection(#[case] pages: &str, #[case] expected: Vec<i64>) {
    let temp_dir = TempDir::new().unwrap();
    let input = write_pdf(temp_dir.path(), "ten.pdf", TEN_PAGES);
    let output = temp_dir.path().join("out.pdf");

    let selection = PageSelection::parse(pages).unwrap();
    PageExtractor::new()
        .extract(&input, &selection, &output, &NoProgress)
        .unwrap();

    assert_eq!(page_widths(&output), expected);
}

#[test]
fn test_extract_missing_input() {
    let temp_dir = TempDir::new().unwrap();
    let err = PageExtractor::new()
        .extract(
            &temp_dir.path().join("nope.pdf"),
            &PageSelection::from_indices(vec![0]),
            &temp_dir.path().join("out.pdf"),
            &NoProgress,
        )
        .unwrap_err();

    assert!(matches!(err, PdfMixError::FileNotFound { .. }));
    assert_eq!(err.exit_code(), 2);
}
