//! Platform-aware backend selection.
//!
//! Candidates are probed in priority order and the first one that can
//! start a trial engine wins:
//!
//! - Windows: office automation (when a host is registered), headless
//!   suite, image-only
//! - everything else: headless suite, image-only
//!
//! A probe failure is logged and the next candidate is tried.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::Backend;
use super::headless::{HeadlessBackend, SofficeLocator};
use super::image_only::ImageOnlyBackend;
use super::office::{AutomationHost, OfficeBackend};
use crate::config::ConversionSettings;
use crate::error::{PdfMixError, Result};

/// Host operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Windows.
    Windows,
    /// macOS.
    MacOs,
    /// Linux and other freedesktop systems.
    Linux,
    /// Anything else.
    Other,
}

impl Platform {
    /// Platform this binary runs on.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }
}

type Probe<'a> = (&'static str, Box<dyn Fn() -> Result<Box<dyn Backend>> + 'a>);

/// Builds the best backend available on a platform.
#[derive(Clone)]
pub struct BackendFactory {
    settings: ConversionSettings,
    automation: Option<Arc<dyn AutomationHost>>,
    search_path: Option<Option<OsString>>,
}

impl BackendFactory {
    /// Create a factory using `settings`.
    pub fn new(settings: ConversionSettings) -> Self {
        Self {
            settings,
            automation: None,
            search_path: None,
        }
    }

    /// Register an office automation host.
    pub fn with_automation_host(mut self, host: Arc<dyn AutomationHost>) -> Self {
        self.automation = Some(host);
        self
    }

    /// Search `search_path` for the headless suite instead of `PATH`.
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = Some(search_path);
        self
    }

    /// Override the headless suite executable.
    pub fn with_soffice_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.settings.soffice_path = path;
        }
        self
    }

    fn locator(&self, platform: Platform) -> SofficeLocator {
        let locator =
            SofficeLocator::new(self.settings.soffice_path.clone()).with_platform(platform);
        match &self.search_path {
            Some(search_path) => locator.with_search_path(search_path.clone()),
            None => locator,
        }
    }

    fn probes(&self, platform: Platform) -> Vec<Probe<'_>> {
        let mut probes: Vec<Probe<'_>> = Vec::new();

        if platform == Platform::Windows
            && let Some(host) = &self.automation
        {
            probes.push((
                "office-automation",
                Box::new(move || {
                    let backend = OfficeBackend::probe(Arc::clone(host), self.settings.chunk_size)?;
                    Ok(Box::new(backend) as Box<dyn Backend>)
                }),
            ));
        }

        probes.push((
            "headless-suite",
            Box::new(move || {
                let backend = HeadlessBackend::probe(&self.locator(platform), self.settings.clone())?;
                Ok(Box::new(backend) as Box<dyn Backend>)
            }),
        ));

        probes.push((
            "image-only",
            Box::new(|| Ok(Box::new(ImageOnlyBackend::new()) as Box<dyn Backend>)),
        ));

        probes
    }

    /// Pick the first backend whose probe succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`PdfMixError::BackendUnavailable`] only if every probe,
    /// including the image-only fallback, fails.
    pub fn select_backend(&self, platform: Platform) -> Result<Box<dyn Backend>> {
        for (name, probe) in self.probes(platform) {
            match probe() {
                Ok(backend) => {
                    info!(backend = name, ?platform, "selected conversion backend");
                    return Ok(backend);
                }
                Err(e) => warn!(backend = name, error = %e, "backend unavailable"),
            }
        }
        Err(PdfMixError::BackendUnavailable)
    }

    /// Names of the candidates probed on `platform`, in order.
    pub fn candidate_names(&self, platform: Platform) -> Vec<&'static str> {
        self.probes(platform).into_iter().map(|(name, _)| name).collect()
    }
}
