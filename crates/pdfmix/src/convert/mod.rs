//! Conversion of non-PDF inputs into PDF bytes.
//!
//! A [`Backend`] turns a list of [`FileRef`]s into a [`ConversionResult`].
//! Three backends exist, chosen at runtime by [`BackendFactory`]:
//!
//! - [`OfficeBackend`] drives an office suite through its automation host
//! - [`HeadlessBackend`] shells out to a headless document converter
//! - [`ImageOnlyBackend`] handles images only, needing no external engine
//!
//! Every backend sends images straight to the [`ImageCodec`] and runs the
//! rest through a [`BatchProcessor`] with its own [`ChunkEngine`].

pub mod batch;
pub mod factory;
pub mod headless;
pub mod image;
pub mod image_only;
pub mod office;
pub mod process;
pub mod spreadsheet;

pub use batch::{BatchProcessor, ChunkEngine, EngineSession};
pub use factory::{BackendFactory, Platform};
pub use headless::{HeadlessBackend, SofficeLocator};
pub use image::ImageCodec;
pub use image_only::ImageOnlyBackend;
pub use office::{AutomationHost, AutomationSession, OfficeApp, OfficeBackend, SheetInfo};
pub use spreadsheet::{PrintLayout, SheetKind, SpreadsheetFormatter};

use std::collections::BTreeMap;
use tracing::warn;

use crate::formats::FormatRegistry;
use crate::model::{ConversionResult, FileRef, FormatCategory};
use crate::progress::ProgressSink;

/// A strategy for converting files to PDF.
pub trait Backend: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &'static str;

    /// Extensions this backend accepts.
    fn registry(&self) -> &FormatRegistry;

    /// Convert `files` to PDF.
    ///
    /// Never fails as a whole: every file ends up in either
    /// `successful` or `failed` of the returned result.
    fn convert_to_pdf(&self, files: &[FileRef], sink: &dyn ProgressSink) -> ConversionResult;
}

/// Files grouped by how a backend handles them.
#[derive(Debug, Default)]
pub(crate) struct Routed {
    pub pdfs: Vec<FileRef>,
    pub images: Vec<FileRef>,
    pub documents: BTreeMap<FormatCategory, Vec<FileRef>>,
    pub unsupported: Vec<FileRef>,
}

impl Routed {
    /// Split `files` by their category in `registry`.
    pub fn new(registry: &FormatRegistry, files: &[FileRef]) -> Self {
        let mut routed = Self::default();
        for file in files {
            match registry.category_of(file.path()) {
                Some(FormatCategory::Pdf) => routed.pdfs.push(file.clone()),
                Some(FormatCategory::Image) => routed.images.push(file.clone()),
                Some(category) => routed
                    .documents
                    .entry(category)
                    .or_default()
                    .push(file.clone()),
                None => routed.unsupported.push(file.clone()),
            }
        }
        routed
    }

    /// Handle everything that needs no external engine.
    ///
    /// PDFs are read as-is, images go through `codec`, and unsupported
    /// files are recorded as failed.
    pub fn convert_without_engine(
        &self,
        codec: &ImageCodec,
        sink: &dyn ProgressSink,
        result: &mut ConversionResult,
    ) {
        for file in &self.pdfs {
            match std::fs::read(file.path()) {
                Ok(bytes) => result.push_success(file.id(), bytes),
                Err(e) => {
                    warn!(id = file.id(), file = %file.file_name(), error = %e, "failed to read pdf");
                    result.push_failure(file);
                }
            }
        }

        if !self.images.is_empty() {
            result.extend(codec.convert(&self.images, sink));
        }

        for file in &self.unsupported {
            warn!(id = file.id(), file = %file.file_name(), "unsupported file type");
            result.push_failure(file);
        }
    }
}
