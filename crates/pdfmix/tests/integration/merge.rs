//! Integration tests for converting and merging.

use image::codecs::gif::GifEncoder;
use image::{Delay, Frame, Rgba, RgbaImage};
use pdfmix::convert::{Backend, ImageCodec, ImageOnlyBackend};
use pdfmix::error::PdfMixError;
use pdfmix::merge::{MERGING_STAGE, Merger};
use pdfmix::model::FileRef;
use pdfmix::progress::{NoProgress, ProgressLog};
use pdfmix::utils::expand_inputs;
use std::path::Path;
use tempfile::TempDir;

use crate::common::{page_widths, write_bytes, write_pdf, write_png};

fn image_merger() -> Merger {
    Merger::new(Box::new(ImageOnlyBackend::new()))
}

fn write_gif(dir: &Path, name: &str, frames: usize) -> std::path::PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut encoder = GifEncoder::new(file);
    for i in 0..frames {
        let shade = (i * 60) as u8;
        let image = RgbaImage::from_pixel(6, 4, Rgba([shade, shade, shade, 255]));
        encoder
            .encode_frame(Frame::from_parts(image, 0, 0, Delay::from_numer_denom_ms(100, 1)))
            .unwrap();
    }
    path
}

#[test]
fn test_page_counts_add_up_in_submission_order() {
    let temp_dir = TempDir::new().unwrap();
    let files = FileRef::numbered([
        write_pdf(temp_dir.path(), "a.pdf", &[101, 102, 103]),
        write_pdf(temp_dir.path(), "b.pdf", &[201]),
        write_pdf(temp_dir.path(), "c.pdf", &[301, 302]),
    ]);
    let output = temp_dir.path().join("out.pdf");

    let report = image_merger().merge(&files, &output, &NoProgress).unwrap();

    assert_eq!(report.pages, 6);
    assert_eq!(report.merged, 3);
    assert_eq!(page_widths(&output), vec![101, 102, 103, 201, 301, 302]);
}

#[test]
fn test_pdf_image_and_missing_inputs() {
    let temp_dir = TempDir::new().unwrap();
    let files = vec![
        FileRef::new(1, write_pdf(temp_dir.path(), "a.pdf", &[100, 110])),
        FileRef::new(2, write_png(temp_dir.path(), "b.png", 40, 30)),
        FileRef::new(3, temp_dir.path().join("missing.pdf")),
    ];
    let output = temp_dir.path().join("out.pdf");

    let report = image_merger().merge(&files, &output, &NoProgress).unwrap();

    assert_eq!(report.pages, 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(page_widths(&output), vec![100, 110, 40]);
}

#[test]
fn test_every_input_failing_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let files = FileRef::numbered([
        write_bytes(temp_dir.path(), "sheet.xlsx", b"not a workbook"),
        write_bytes(temp_dir.path(), "photo.png", b"not a png"),
    ]);
    let output = temp_dir.path().join("out.pdf");

    let err = image_merger().merge(&files, &output, &NoProgress).unwrap_err();

    assert!(matches!(err, PdfMixError::NoPagesMerged));
    assert_eq!(err.exit_code(), 6);
    assert!(!output.exists());
}

#[test]
fn test_multi_frame_image_is_deterministic() {
    let temp_dir = TempDir::new().unwrap();
    let gif = write_gif(temp_dir.path(), "anim.gif", 4);
    let codec = ImageCodec::new();

    let first = lopdf::Document::load_mem(&codec.convert_file(&gif).unwrap()).unwrap();
    let second = lopdf::Document::load_mem(&codec.convert_file(&gif).unwrap()).unwrap();

    assert_eq!(first.get_pages().len(), 4);
    assert_eq!(second.get_pages().len(), 4);
}

#[test]
fn test_merge_emits_one_event_per_file() {
    let temp_dir = TempDir::new().unwrap();
    let files = FileRef::numbered([
        write_png(temp_dir.path(), "z.png", 10, 10),
        write_pdf(temp_dir.path(), "a.pdf", &[100]),
    ]);
    let log = ProgressLog::new();

    image_merger()
        .merge(&files, &temp_dir.path().join("out.pdf"), &log)
        .unwrap();

    let names: Vec<Option<String>> = log
        .stage(MERGING_STAGE)
        .into_iter()
        .map(|event| event.filename)
        .collect();
    assert_eq!(
        names,
        vec![Some("z.png".to_string()), Some("a.pdf".to_string())]
    );
}

#[test]
fn test_glob_inputs_feed_the_merge() {
    let temp_dir = TempDir::new().unwrap();
    write_pdf(temp_dir.path(), "part2.pdf", &[200]);
    write_pdf(temp_dir.path(), "part1.pdf", &[100]);
    let cover = write_png(temp_dir.path(), "cover.png", 50, 50);

    let pattern = format!("{}/part*.pdf", temp_dir.path().display());
    let inputs = expand_inputs([cover.display().to_string(), pattern]).unwrap();
    let files = FileRef::numbered(inputs);
    let output = temp_dir.path().join("book.pdf");

    image_merger().merge(&files, &output, &NoProgress).unwrap();
    assert_eq!(page_widths(&output), vec![50, 100, 200]);
}

#[test]
fn test_image_only_backend_reports_its_formats() {
    let backend = ImageOnlyBackend::new();
    assert_eq!(backend.name(), "image-only");
    assert!(backend.registry().supports(Path::new("scan.TIFF")));
    assert!(!backend.registry().supports(Path::new("deck.pptx")));
}
