//! Configuration for conversion and logging.
//!
//! Values come from three places, later ones winning:
//! - built-in defaults
//! - an optional TOML file (`Config::load`)
//! - command line overrides applied by the caller
//!
//! ```toml
//! [conversion]
//! chunk_size = 30
//! base_timeout_secs = 120
//! per_file_timeout_secs = 60
//! soffice_path = "/opt/libreoffice/program/soffice"
//!
//! [logging]
//! level = "info"
//! ```

use crate::{PdfMixError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of files handed to one engine session.
pub const DEFAULT_CHUNK_SIZE: usize = 30;

/// Default fixed part of the per-chunk subprocess timeout.
pub const DEFAULT_BASE_TIMEOUT_SECS: u64 = 120;

/// Default per-file part of the per-chunk subprocess timeout.
pub const DEFAULT_PER_FILE_TIMEOUT_SECS: u64 = 60;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Conversion engine settings.
    pub conversion: ConversionSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Settings shared by the conversion backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionSettings {
    /// Files per engine session.
    pub chunk_size: usize,
    /// Fixed seconds allowed for one headless invocation.
    pub base_timeout_secs: u64,
    /// Extra seconds allowed per file in the invocation.
    pub per_file_timeout_secs: u64,
    /// Explicit path to the headless suite executable.
    pub soffice_path: Option<PathBuf>,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            base_timeout_secs: DEFAULT_BASE_TIMEOUT_SECS,
            per_file_timeout_secs: DEFAULT_PER_FILE_TIMEOUT_SECS,
            soffice_path: None,
        }
    }
}

impl ConversionSettings {
    /// Time allowance for one subprocess handling `files` inputs.
    pub fn timeout_for(&self, files: usize) -> Duration {
        let per_file = self.per_file_timeout_secs.saturating_mul(files as u64);
        Duration::from_secs(self.base_timeout_secs.saturating_add(per_file))
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Default filter level when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load and validate a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`PdfMixError::InvalidConfig`] when the file cannot be read,
    /// does not parse, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PdfMixError::invalid_config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
            .map_err(|e| PdfMixError::invalid_config(format!("{}: {e}", path.display())))
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| PdfMixError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns an error if the chunk size is zero, the base timeout is zero,
    /// or the log level is unknown.
    pub fn validate(&self) -> Result<()> {
        if self.conversion.chunk_size == 0 {
            return Err(PdfMixError::invalid_config(
                "conversion.chunk_size must be at least 1",
            ));
        }

        if self.conversion.base_timeout_secs == 0 {
            return Err(PdfMixError::invalid_config(
                "conversion.base_timeout_secs must be at least 1",
            ));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(PdfMixError::invalid_config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}
