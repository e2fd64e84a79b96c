//! Conversion through a headless office suite on the command line.
//!
//! One chunk is one working directory and one export invocation:
//!
//! 1. copy every source into a private temp dir as `{id}_{name}`
//! 2. upgrade legacy `.xls` workbooks to `.xlsx` in a single invocation,
//!    then fix up print settings of every OOXML workbook directly
//! 3. export the whole chunk to PDF in a single invocation
//! 4. pick up `{id}_{stem}.pdf` for each file
//!
//! The `id` prefix keeps two inputs with the same file name apart.

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::batch::{BatchProcessor, ChunkEngine};
use super::factory::Platform;
use super::image::ImageCodec;
use super::process::run_with_timeout;
use super::spreadsheet::SpreadsheetFormatter;
use super::{Backend, Routed};
use crate::config::ConversionSettings;
use crate::error::{PdfMixError, Result};
use crate::formats::FormatRegistry;
use crate::model::{ConversionResult, FileRef};
use crate::progress::ProgressSink;

/// Time allowed for the `--version` probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Extensions the export step cannot read and that get upgraded first.
const LEGACY_TABLE_EXTENSIONS: &[&str] = &["xls"];

/// Workbook extensions whose print settings can be edited in place.
const OOXML_TABLE_EXTENSIONS: &[&str] = &["xlsx", "xlsm"];

/// Finds the headless suite executable.
#[derive(Debug, Clone)]
pub struct SofficeLocator {
    override_path: Option<PathBuf>,
    search_path: Option<OsString>,
    platform: Platform,
}

impl SofficeLocator {
    /// Locator for the current process environment.
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self {
            override_path,
            search_path: env::var_os("PATH"),
            platform: Platform::current(),
        }
    }

    /// Use `search_path` instead of `PATH`.
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    /// Pretend to run on `platform`.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Executable names to look for on the search path.
    fn executable_names(&self) -> &'static [&'static str] {
        match self.platform {
            Platform::Windows => &["soffice.exe", "soffice.com", "libreoffice.exe"],
            _ => &["soffice", "libreoffice"],
        }
    }

    /// Standard install locations for `platform`.
    fn install_locations(&self) -> Vec<PathBuf> {
        match self.platform {
            Platform::Windows => vec![
                PathBuf::from(r"C:\Program Files\LibreOffice\program\soffice.exe"),
                PathBuf::from(r"C:\Program Files (x86)\LibreOffice\program\soffice.exe"),
            ],
            Platform::MacOs => vec![PathBuf::from(
                "/Applications/LibreOffice.app/Contents/MacOS/soffice",
            )],
            Platform::Linux => {
                let mut paths = vec![
                    PathBuf::from("/usr/bin/soffice"),
                    PathBuf::from("/usr/bin/libreoffice"),
                    PathBuf::from("/usr/local/bin/soffice"),
                    PathBuf::from("/snap/bin/libreoffice"),
                ];
                if let Ok(entries) = glob::glob("/opt/libreoffice*/program/soffice") {
                    paths.extend(entries.flatten());
                }
                paths
            }
            Platform::Other => Vec::new(),
        }
    }

    /// Every candidate path, in lookup order.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(path) = &self.override_path {
            candidates.push(path.clone());
        }
        if let Some(search_path) = &self.search_path {
            for dir in env::split_paths(search_path) {
                for name in self.executable_names() {
                    candidates.push(dir.join(name));
                }
            }
        }
        candidates.extend(self.install_locations());
        candidates
    }

    /// First candidate that exists as a file.
    pub fn locate(&self) -> Result<PathBuf> {
        if let Some(path) = &self.override_path
            && !path.is_file()
        {
            warn!(path = %path.display(), "configured soffice path does not exist, searching instead");
        }

        self.candidates()
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(|| PdfMixError::ExecutableNotFound {
                name: "soffice".to_string(),
            })
    }
}

/// Per-chunk state: the working directory and staged copies.
struct HeadlessChunk {
    dir: Option<TempDir>,
    root: PathBuf,
    staged: HashMap<u64, PathBuf>,
}

/// [`ChunkEngine`] that converts a whole chunk during `acquire`.
struct HeadlessEngine<'a> {
    soffice: &'a Path,
    settings: &'a ConversionSettings,
    formatter: &'a SpreadsheetFormatter,
}

impl HeadlessEngine<'_> {
    fn convert_to(&self, format: &str, dir: &Path, inputs: &[PathBuf]) -> Result<()> {
        let mut command = Command::new(self.soffice);
        command
            .arg("--headless")
            .arg("--convert-to")
            .arg(format)
            .arg("--outdir")
            .arg(dir)
            .args(inputs);
        run_with_timeout(&mut command, self.settings.timeout_for(inputs.len()))?;
        Ok(())
    }

    fn upgrade_legacy_tables(&self, chunk: &mut HeadlessChunk) -> Result<()> {
        let legacy: Vec<(u64, PathBuf)> = chunk
            .staged
            .iter()
            .filter(|(_, path)| has_extension(path, LEGACY_TABLE_EXTENSIONS))
            .map(|(id, path)| (*id, path.clone()))
            .collect();
        if legacy.is_empty() {
            return Ok(());
        }

        let inputs: Vec<PathBuf> = legacy.iter().map(|(_, path)| path.clone()).collect();
        info!(files = inputs.len(), "upgrading legacy workbooks");
        self.convert_to("xlsx", &chunk.root, &inputs)?;

        for (id, path) in legacy {
            let upgraded = path.with_extension("xlsx");
            if upgraded.is_file() {
                chunk.staged.insert(id, upgraded);
            } else {
                warn!(file = %path.display(), "legacy workbook was not upgraded");
            }
        }
        Ok(())
    }
}

impl ChunkEngine for HeadlessEngine<'_> {
    type Handle = HeadlessChunk;

    fn name(&self) -> &str {
        "headless-suite"
    }

    fn acquire(&self, files: &[FileRef]) -> Result<HeadlessChunk> {
        let dir = tempfile::Builder::new().prefix("pdfmix-chunk-").tempdir()?;
        let root = dir.path().to_path_buf();
        let mut chunk = HeadlessChunk {
            dir: Some(dir),
            root,
            staged: HashMap::new(),
        };

        for file in files {
            let staged = chunk.root.join(staged_name(file));
            match std::fs::copy(file.path(), &staged) {
                Ok(_) => {
                    chunk.staged.insert(file.id(), staged);
                }
                Err(e) => warn!(file = %file.file_name(), error = %e, "failed to stage file"),
            }
        }

        self.upgrade_legacy_tables(&mut chunk)?;

        for path in chunk.staged.values() {
            if has_extension(path, OOXML_TABLE_EXTENSIONS) {
                self.formatter.try_normalize_xlsx(path);
            }
        }

        let mut inputs: Vec<PathBuf> = chunk.staged.values().cloned().collect();
        inputs.sort();
        if !inputs.is_empty() {
            self.convert_to("pdf", &chunk.root, &inputs)?;
        }
        Ok(chunk)
    }

    fn convert_one(&self, chunk: &mut HeadlessChunk, file: &FileRef) -> Result<Vec<u8>> {
        if !chunk.staged.contains_key(&file.id()) {
            return Err(PdfMixError::conversion(file.path(), "file could not be staged"));
        }
        let pdf = chunk.root.join(format!("{}_{}.pdf", file.id(), file_stem(file.path())));
        debug!(file = %file.file_name(), output = %pdf.display(), "collecting");
        std::fs::read(&pdf).map_err(|_| PdfMixError::conversion(file.path(), "no PDF was produced"))
    }

    fn release(&self, chunk: &mut HeadlessChunk) -> Result<()> {
        if let Some(dir) = chunk.dir.take() {
            dir.close()?;
        }
        Ok(())
    }
}

fn staged_name(file: &FileRef) -> String {
    format!("{}_{}", file.id(), file.file_name())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

/// Backend invoking a headless office suite executable.
pub struct HeadlessBackend {
    soffice: PathBuf,
    settings: ConversionSettings,
    batch: BatchProcessor,
    formatter: SpreadsheetFormatter,
    codec: ImageCodec,
    registry: FormatRegistry,
}

impl HeadlessBackend {
    /// Create a backend for the executable at `soffice`.
    pub fn new(soffice: PathBuf, settings: ConversionSettings) -> Self {
        Self {
            soffice,
            batch: BatchProcessor::new(settings.chunk_size),
            settings,
            formatter: SpreadsheetFormatter::new(),
            codec: ImageCodec::new(),
            registry: FormatRegistry::headless_suite(),
        }
    }

    /// Locate the executable, check that it runs, then build the backend.
    pub fn probe(locator: &SofficeLocator, settings: ConversionSettings) -> Result<Self> {
        let soffice = locator.locate()?;
        let output = run_with_timeout(Command::new(&soffice).arg("--version"), PROBE_TIMEOUT)?;
        info!(
            path = %soffice.display(),
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "found headless suite"
        );
        Ok(Self::new(soffice, settings))
    }

    /// Path of the executable in use.
    pub fn executable(&self) -> &Path {
        &self.soffice
    }
}

impl Backend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless-suite"
    }

    fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    fn convert_to_pdf(&self, files: &[FileRef], sink: &dyn ProgressSink) -> ConversionResult {
        let routed = Routed::new(&self.registry, files);
        let mut result = ConversionResult::new();
        routed.convert_without_engine(&self.codec, sink, &mut result);

        let documents: Vec<FileRef> = routed.documents.into_values().flatten().collect();
        if !documents.is_empty() {
            let engine = HeadlessEngine {
                soffice: &self.soffice,
                settings: &self.settings,
                formatter: &self.formatter,
            };
            result.extend(self.batch.process(&engine, &documents, sink));
        }

        result
    }
}
