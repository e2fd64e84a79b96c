//! Conversion through an installed office suite's automation interface.
//!
//! The automation transport itself (COM on Windows) lives outside this
//! crate. An embedding application implements [`AutomationHost`] and hands
//! it to the [`BackendFactory`](super::BackendFactory); everything here is
//! written against that capability.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::batch::{BatchProcessor, ChunkEngine};
use super::image::ImageCodec;
use super::spreadsheet::{PrintLayout, SheetKind, SpreadsheetFormatter};
use super::{Backend, Routed};
use crate::error::{PdfMixError, Result};
use crate::formats::FormatRegistry;
use crate::model::{ConversionResult, FileRef, FormatCategory};
use crate::progress::ProgressSink;

/// Office application responsible for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfficeApp {
    /// Spreadsheets.
    Spreadsheet,
    /// Word-processing documents.
    WordProcessor,
    /// Slide decks.
    Presentation,
}

impl OfficeApp {
    /// Application that opens files of `category`.
    pub fn for_category(category: FormatCategory) -> Option<Self> {
        match category {
            FormatCategory::Table => Some(Self::Spreadsheet),
            FormatCategory::Document => Some(Self::WordProcessor),
            FormatCategory::Presentation => Some(Self::Presentation),
            FormatCategory::Pdf | FormatCategory::Image => None,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Spreadsheet => "spreadsheet",
            Self::WordProcessor => "word-processor",
            Self::Presentation => "presentation",
        }
    }
}

/// One sheet of an open workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetInfo {
    /// Position of the sheet in the workbook, as the host numbers it.
    pub index: usize,
    /// Worksheet or chart sheet.
    pub kind: SheetKind,
    /// Columns in the sheet's used range.
    pub used_columns: usize,
}

/// A live automation session for one application.
///
/// A session has at most one document open at a time.
pub trait AutomationSession {
    /// Suppress dialogs and alerts.
    fn disable_alerts(&mut self) -> Result<()>;

    /// Open `path` read-only.
    fn open_read_only(&mut self, path: &Path) -> Result<()>;

    /// Sheets of the open workbook. Non-spreadsheet sessions return none.
    fn sheets(&mut self) -> Result<Vec<SheetInfo>>;

    /// Apply print settings to one sheet of the open workbook.
    fn apply_page_layout(&mut self, sheet: usize, layout: &PrintLayout) -> Result<()>;

    /// Export the open document as PDF to `target`.
    fn export_pdf(&mut self, target: &Path) -> Result<()>;

    /// Close the open document without saving.
    fn close(&mut self) -> Result<()>;

    /// Shut the application down.
    fn quit(&mut self) -> Result<()>;
}

/// Starts automation sessions.
pub trait AutomationHost: Send + Sync {
    /// Launch `app` and return a session bound to it.
    fn launch(&self, app: OfficeApp) -> Result<Box<dyn AutomationSession>>;
}

/// [`ChunkEngine`] running one application session per chunk.
struct OfficeEngine<'a> {
    host: &'a dyn AutomationHost,
    app: OfficeApp,
    formatter: &'a SpreadsheetFormatter,
}

impl OfficeEngine<'_> {
    fn export(&self, session: &mut dyn AutomationSession, file: &FileRef) -> Result<Vec<u8>> {
        if self.app == OfficeApp::Spreadsheet {
            for sheet in session.sheets()? {
                let layout = self.formatter.layout_for(sheet.kind, sheet.used_columns);
                if let Err(e) = session.apply_page_layout(sheet.index, &layout) {
                    warn!(file = %file.file_name(), sheet = sheet.index, error = %e, "failed to set page layout");
                }
            }
        }

        let dir = tempfile::Builder::new().prefix("pdfmix-office-").tempdir()?;
        let target = dir.path().join(format!("{}.pdf", file.id()));
        session.export_pdf(&target)?;
        let bytes = std::fs::read(&target)
            .map_err(|e| PdfMixError::conversion(file.path(), format!("exported PDF unreadable: {e}")))?;
        dir.close()?;
        Ok(bytes)
    }
}

impl ChunkEngine for OfficeEngine<'_> {
    type Handle = Box<dyn AutomationSession>;

    fn name(&self) -> &str {
        self.app.name()
    }

    fn acquire(&self, _chunk: &[FileRef]) -> Result<Self::Handle> {
        self.host.launch(self.app)
    }

    fn disable_alerts(&self, session: &mut Self::Handle) -> Result<()> {
        session.disable_alerts()
    }

    fn convert_one(&self, session: &mut Self::Handle, file: &FileRef) -> Result<Vec<u8>> {
        debug!(app = self.app.name(), file = %file.file_name(), "exporting");
        session.open_read_only(file.path())?;
        let exported = self.export(session.as_mut(), file);
        if let Err(e) = session.close() {
            warn!(file = %file.file_name(), error = %e, "failed to close document");
        }
        exported
    }

    fn release(&self, session: &mut Self::Handle) -> Result<()> {
        session.quit()
    }
}

/// Backend driving an office suite through an [`AutomationHost`].
pub struct OfficeBackend {
    host: Arc<dyn AutomationHost>,
    batch: BatchProcessor,
    formatter: SpreadsheetFormatter,
    codec: ImageCodec,
    registry: FormatRegistry,
}

impl OfficeBackend {
    /// Create a backend on top of `host`.
    pub fn new(host: Arc<dyn AutomationHost>, chunk_size: usize) -> Self {
        Self {
            host,
            batch: BatchProcessor::new(chunk_size),
            formatter: SpreadsheetFormatter::new(),
            codec: ImageCodec::new(),
            registry: FormatRegistry::office_automation(),
        }
    }

    /// Check that the host can start a session, then build the backend.
    pub fn probe(host: Arc<dyn AutomationHost>, chunk_size: usize) -> Result<Self> {
        let mut trial = host
            .launch(OfficeApp::WordProcessor)
            .map_err(|e| PdfMixError::automation_unavailable(e.to_string()))?;
        if let Err(e) = trial.quit() {
            warn!(error = %e, "trial automation session did not quit cleanly");
        }
        Ok(Self::new(host, chunk_size))
    }
}

impl Backend for OfficeBackend {
    fn name(&self) -> &'static str {
        "office-automation"
    }

    fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    fn convert_to_pdf(&self, files: &[FileRef], sink: &dyn ProgressSink) -> ConversionResult {
        let routed = Routed::new(&self.registry, files);
        let mut result = ConversionResult::new();
        routed.convert_without_engine(&self.codec, sink, &mut result);

        for (category, group) in &routed.documents {
            let Some(app) = OfficeApp::for_category(*category) else {
                for file in group {
                    result.push_failure(file);
                }
                continue;
            };
            let engine = OfficeEngine {
                host: self.host.as_ref(),
                app,
                formatter: &self.formatter,
            };
            result.extend(self.batch.process(&engine, group, sink));
        }

        result
    }
}
