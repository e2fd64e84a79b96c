//! End-to-end tests of the headless backend against a fake suite.
//!
//! The fake is a shell script answering `--version` and `--convert-to`.
//! Every document it "converts" becomes a copy of a prepared one-page PDF
//! of width 777; files with "broken" in their name produce nothing. An
//! input named `*exit*` makes the whole invocation fail, one named
//! `*hang*` makes it sleep past any timeout. Each invocation appends its
//! output directory to `runs.log`.

use pdfmix::config::ConversionSettings;
use pdfmix::convert::{
    Backend, BackendFactory, BatchProcessor, HeadlessBackend, Platform, SofficeLocator,
};
use pdfmix::merge::Merger;
use pdfmix::model::FileRef;
use pdfmix::progress::ProgressLog;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

use crate::common::{page_widths, write_bytes, write_pdf, write_png};

const CONVERTED_WIDTH: i64 = 777;

fn install_fake_suite(dir: &Path) -> PathBuf {
    let bin = dir.join("bin");
    std::fs::create_dir(&bin).unwrap();
    let template = write_pdf(dir, "converted.pdf", &[CONVERTED_WIDTH]);
    let runs = dir.join("runs.log");

    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "--version" ]; then
    echo "FakeOffice 7.6"
    exit 0
fi
format="$3"
outdir="$5"
shift 5
echo "$outdir" >> "{runs}"
for input in "$@"; do
    case $(basename "$input") in
        *hang*) sleep 300 ;;
        *exit*) echo "fatal: cannot convert" >&2; exit 3 ;;
    esac
done
for input in "$@"; do
    name=$(basename "$input")
    stem="${{name%.*}}"
    case "$name" in
        *broken*) continue ;;
    esac
    if [ "$format" = "xlsx" ]; then
        cp "$input" "$outdir/$stem.xlsx"
    else
        cp "{template}" "$outdir/$stem.pdf"
    fi
done
"#,
        template = template.display(),
        runs = runs.display()
    );

    let path = bin.join("soffice");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// All scenarios share one script so no other thread can be forking while
/// it is still open for writing.
#[test]
fn test_headless_suite_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let soffice = install_fake_suite(temp_dir.path());
    let search_path = soffice.parent().map(|dir| dir.as_os_str().to_owned());

    // Discovery through the search path, then a successful probe.
    let settings = ConversionSettings {
        chunk_size: 2,
        ..ConversionSettings::default()
    };
    let backend = BackendFactory::new(settings.clone())
        .with_search_path(search_path.clone())
        .select_backend(Platform::Other)
        .unwrap();
    assert_eq!(backend.name(), "headless-suite");

    let locator = SofficeLocator::new(None)
        .with_search_path(search_path)
        .with_platform(Platform::Other);
    assert_eq!(locator.locate().unwrap(), soffice);
    let probed = HeadlessBackend::probe(&locator, settings).unwrap();
    assert_eq!(probed.executable(), soffice.as_path());

    // Mixed inputs across three chunks of two.
    let inputs = temp_dir.path().join("inputs");
    std::fs::create_dir(&inputs).unwrap();
    let files = vec![
        FileRef::new(1, write_pdf(&inputs, "cover.pdf", &[100])),
        FileRef::new(2, write_bytes(&inputs, "memo.docx", b"memo")),
        FileRef::new(3, write_bytes(&inputs, "old.xls", b"legacy workbook")),
        FileRef::new(4, write_bytes(&inputs, "broken.docx", b"nothing")),
        FileRef::new(5, write_png(&inputs, "pic.png", 8, 6)),
        FileRef::new(6, write_bytes(&inputs, "slides.odp", b"deck")),
        FileRef::new(7, write_bytes(&inputs, "archive.zip", b"zip")),
    ];
    let output = temp_dir.path().join("merged.pdf");
    let log = ProgressLog::new();

    let report = Merger::new(backend).merge(&files, &output, &log).unwrap();

    assert_eq!(
        page_widths(&output),
        vec![100, CONVERTED_WIDTH, CONVERTED_WIDTH, 8, CONVERTED_WIDTH]
    );
    let mut failed = report.failed_names();
    failed.sort();
    assert_eq!(failed, vec!["archive.zip".to_string(), "broken.docx".to_string()]);

    let converting = log.stage("Converting");
    assert_eq!(converting.len(), 4);
    assert_eq!(converting.last().map(|e| e.current), Some(4));

    // Two inputs with the same file name stay apart.
    let twins = vec![
        FileRef::new(1, write_bytes(&inputs, "report.docx", b"first")),
        FileRef::new(2, {
            let other = inputs.join("other");
            std::fs::create_dir(&other).unwrap();
            write_bytes(&other, "report.docx", b"second")
        }),
    ];
    let direct = HeadlessBackend::new(soffice.clone(), ConversionSettings::default());
    let result = direct.convert_to_pdf(&twins, &pdfmix::progress::NoProgress);
    let mut ids: Vec<u64> = result.successful.iter().map(|(id, _)| *id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
    assert!(result.failed.is_empty());

    // A failed or timed-out invocation fails its own chunk only.
    let settings = ConversionSettings {
        chunk_size: 2,
        base_timeout_secs: 2,
        per_file_timeout_secs: 0,
        ..ConversionSettings::default()
    };
    let chunks = vec![
        FileRef::new(1, write_bytes(&inputs, "a.docx", b"a")),
        FileRef::new(2, write_bytes(&inputs, "exit.docx", b"exit")),
        FileRef::new(3, write_bytes(&inputs, "b.docx", b"b")),
        FileRef::new(4, write_bytes(&inputs, "c.docx", b"c")),
        FileRef::new(5, write_bytes(&inputs, "hang.docx", b"hang")),
        FileRef::new(6, write_bytes(&inputs, "d.docx", b"d")),
    ];
    let started = Instant::now();
    let result = HeadlessBackend::new(soffice.clone(), settings)
        .convert_to_pdf(&chunks, &pdfmix::progress::NoProgress);
    assert!(started.elapsed() < Duration::from_secs(60));

    let mut converted: Vec<u64> = result.successful.iter().map(|(id, _)| *id).collect();
    converted.sort();
    assert_eq!(converted, vec![3, 4]);
    let mut failed: Vec<u64> = result.failed.iter().map(|(id, _)| *id).collect();
    failed.sort();
    assert_eq!(failed, vec![1, 2, 5, 6]);

    // Every staging directory is gone, whatever happened to its chunk.
    let runs = std::fs::read_to_string(temp_dir.path().join("runs.log")).unwrap();
    let staged: Vec<&str> = runs.lines().collect();
    assert!(staged.len() >= 3);
    for dir in staged {
        assert!(!Path::new(dir).exists(), "{dir} was left behind");
    }

    assert_eq!(BatchProcessor::new(0).chunk_size(), 1);
}
