//! Integration tests for error handling.

use pdfmix::config::Config;
use pdfmix::convert::ImageOnlyBackend;
use pdfmix::error::PdfMixError;
use pdfmix::merge::Merger;
use pdfmix::model::FileRef;
use pdfmix::progress::NoProgress;
use tempfile::TempDir;

use crate::common::{page_widths, write_bytes, write_pdf};

#[test]
fn test_corrupt_pdf_is_reported_not_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let files = FileRef::numbered([
        write_bytes(temp_dir.path(), "corrupt.pdf", b"definitely not a pdf"),
        write_pdf(temp_dir.path(), "fine.pdf", &[123]),
    ]);
    let output = temp_dir.path().join("out.pdf");

    let report = Merger::new(Box::new(ImageOnlyBackend::new()))
        .merge(&files, &output, &NoProgress)
        .unwrap();

    assert_eq!(report.failed_names(), vec!["corrupt.pdf".to_string()]);
    assert_eq!(page_widths(&output), vec![123]);
}

#[test]
fn test_only_missing_inputs_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let files = FileRef::numbered([temp_dir.path().join("gone.pdf")]);

    let err = Merger::new(Box::new(ImageOnlyBackend::new()))
        .merge(&files, &temp_dir.path().join("out.pdf"), &NoProgress)
        .unwrap_err();
    assert!(matches!(err, PdfMixError::NoPagesMerged));
}

#[test]
fn test_unwritable_output() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = write_bytes(temp_dir.path(), "blocker", b"a file, not a directory");
    let files = FileRef::numbered([write_pdf(temp_dir.path(), "a.pdf", &[100])]);

    let err = Merger::new(Box::new(ImageOnlyBackend::new()))
        .merge(&files, &blocker.join("out.pdf"), &NoProgress)
        .unwrap_err();
    assert!(matches!(err, PdfMixError::FailedToWrite { .. }));
}

#[test]
fn test_config_file_errors() {
    let temp_dir = TempDir::new().unwrap();
    let bad = write_bytes(
        temp_dir.path(),
        "pdfmix.toml",
        b"[conversion]\nchunk_size = 0\n",
    );
    let err = Config::load(&bad).unwrap_err();
    assert!(err.to_string().contains("chunk_size"));

    let unknown = write_bytes(temp_dir.path(), "typo.toml", b"[conversion]\nchunk = 3\n");
    assert!(matches!(
        Config::load(&unknown),
        Err(PdfMixError::InvalidConfig { .. })
    ));

    let good = write_bytes(
        temp_dir.path(),
        "good.toml",
        b"[conversion]\nchunk_size = 5\n\n[logging]\nlevel = \"debug\"\n",
    );
    let config = Config::load(&good).unwrap();
    assert_eq!(config.conversion.chunk_size, 5);
    assert_eq!(config.conversion.base_timeout_secs, 120);
}
