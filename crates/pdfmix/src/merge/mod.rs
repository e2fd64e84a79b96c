//! Merging converted inputs into one PDF.
//!
//! [`Merger`] drives the whole pipeline: PDFs are read as-is, everything
//! else goes through the configured [`Backend`](crate::convert::Backend),
//! and the results are appended page by page in the caller's order.
//! [`PageExtractor`] reuses the same page assembly to copy a selection of
//! pages out of a single PDF.
//!
//! # Examples
//!
//! ```no_run
//! use pdfmix::convert::ImageOnlyBackend;
//! use pdfmix::merge::Merger;
//! use pdfmix::model::FileRef;
//! use pdfmix::progress::NoProgress;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let files = FileRef::numbered(["cover.pdf", "scan.tiff"]);
//! let merger = Merger::new(Box::new(ImageOnlyBackend::new()));
//! let report = merger.merge(&files, Path::new("merged.pdf"), &NoProgress)?;
//! println!("Merged {} pages", report.pages);
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod merger;
pub mod pages;

pub use assembler::PdfAssembler;
pub use merger::{COMPLETE_STAGE, CONVERSION_STAGE, MERGING_STAGE, MergeReport, Merger};
pub use pages::{EXTRACTING_STAGE, ExtractReport, PageExtractor, PageSelection};
