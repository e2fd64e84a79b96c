//! PDF input and output.
//!
//! # Examples
//!
//! ```no_run
//! use pdfmix::io::{PdfReader, PdfWriter};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = PdfReader::new().load(Path::new("input.pdf"))?;
//! PdfWriter::new().save(&mut doc, Path::new("output.pdf"))?;
//! # Ok(())
//! # }
//! ```

pub mod reader;
pub mod writer;

pub use reader::PdfReader;
pub use writer::{PdfWriter, WriteOptions, WriteStatistics};
