//! pdfmix - Convert mixed documents to PDF and merge them into one file.
//!
//! Inputs may be PDFs, spreadsheets, word-processor documents,
//! presentations or images. Everything that is not already a PDF is
//! converted by a [`Backend`](convert::Backend) picked for the host:
//!
//! - office automation, when a suite is scriptable on the host
//! - a headless office suite run as a subprocess
//! - an image-only fallback needing no external software
//!
//! Converted files are merged back in the caller's order, regardless of
//! which backend finished them first.
//!
//! # Examples
//!
//! ## Merge
//!
//! ```no_run
//! use pdfmix::config::Config;
//! use pdfmix::convert::{BackendFactory, Platform};
//! use pdfmix::merge::Merger;
//! use pdfmix::model::FileRef;
//! use pdfmix::progress::NoProgress;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let backend = BackendFactory::new(config.conversion).select_backend(Platform::current())?;
//!
//! let files = FileRef::numbered(["budget.xlsx", "notes.docx", "appendix.pdf"]);
//! let report = Merger::new(backend).merge(&files, Path::new("merged.pdf"), &NoProgress)?;
//! println!("{} pages, {} files failed", report.pages, report.failed.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Extract pages
//!
//! ```no_run
//! use pdfmix::merge::{PageExtractor, PageSelection};
//! use pdfmix::progress::NoProgress;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let selection = PageSelection::parse("10,1-3")?;
//! PageExtractor::new().extract(
//!     Path::new("report.pdf"),
//!     &selection,
//!     Path::new("summary.pdf"),
//!     &NoProgress,
//! )?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod convert;
pub mod error;
pub mod formats;
pub mod io;
pub mod merge;
pub mod model;
pub mod progress;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{PdfMixError, Result};
pub use model::{ConversionResult, FileRef, FormatCategory};
pub use progress::{ProgressEvent, ProgressSink};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
