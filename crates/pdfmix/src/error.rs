//! Error types for pdfmix.
//!
//! Errors fall into a few families:
//!
//! - **Input errors**: missing files, unsupported formats, bad page selections
//! - **Conversion errors**: one file failed, or a whole chunk failed because
//!   the external engine could not start or timed out
//! - **Environment errors**: no usable conversion backend or executable
//! - **Merge errors**: nothing could be merged, or the output could not be written
//!
//! Only a handful of these ever reach the caller of a merge. Per-file and
//! per-chunk failures are folded into a [`ConversionResult`] instead.
//!
//! [`ConversionResult`]: crate::model::ConversionResult

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for pdfmix operations.
pub type Result<T> = std::result::Result<T, PdfMixError>;

/// Main error type for pdfmix operations.
#[derive(Debug, thiserror::Error)]
pub enum PdfMixError {
    /// Input file was not found.
    #[error("File not found: {}", .path.display())]
    FileNotFound {
        /// Path to the file that was not found.
        path: PathBuf,
    },

    /// Path exists but is not a regular file.
    #[error("Not a file: {}", .path.display())]
    NotAFile {
        /// Offending path.
        path: PathBuf,
    },

    /// Failed to parse PDF data.
    #[error("Failed to load PDF: {label}\n  Reason: {reason}")]
    FailedToLoadPdf {
        /// File name or other label for the PDF source.
        label: String,
        /// Reason for the failure.
        reason: String,
    },

    /// The file extension is not handled by the active backend.
    #[error("Unsupported file type: {}", .path.display())]
    UnsupportedFormat {
        /// Path of the unsupported file.
        path: PathBuf,
    },

    /// A single file could not be converted.
    #[error("Failed to convert {}: {reason}", .path.display())]
    Conversion {
        /// Source file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A whole chunk failed before any file in it could be converted.
    #[error("Conversion chunk {chunk} failed: {reason}")]
    ChunkFailed {
        /// Zero-based chunk index.
        chunk: usize,
        /// What went wrong.
        reason: String,
    },

    /// An external process exceeded its time allowance and was killed.
    #[error("{program} timed out after {}s", .timeout.as_secs())]
    ProcessTimeout {
        /// Program that was running.
        program: String,
        /// Time allowance that was exceeded.
        timeout: Duration,
    },

    /// An external process exited unsuccessfully.
    #[error("{program} exited with {status}\n  {stderr}")]
    ProcessFailed {
        /// Program that was running.
        program: String,
        /// Exit status description.
        status: String,
        /// Captured standard error (trimmed).
        stderr: String,
    },

    /// The headless suite executable could not be located.
    #[error("Conversion executable not found: {name}")]
    ExecutableNotFound {
        /// Executable that was searched for.
        name: String,
    },

    /// Office automation could not be started.
    #[error("Office automation unavailable: {reason}")]
    AutomationUnavailable {
        /// Why the automation session failed.
        reason: String,
    },

    /// Not even the image-only backend could be constructed.
    #[error("No conversion backend is available")]
    BackendUnavailable,

    /// Nothing was merged into the output document.
    #[error("Failed to add any pages. Input files are corrupted or empty")]
    NoPagesMerged,

    /// Page selection referenced pages outside the document.
    #[error(
        "Invalid page numbers: {invalid:?}. The document only has {total_pages} pages ({})",
        .path.display()
    )]
    InvalidPageSelection {
        /// Source PDF.
        path: PathBuf,
        /// Offending pages, 1-based.
        invalid: Vec<usize>,
        /// Page count of the source PDF.
        total_pages: usize,
    },

    /// Page selection was empty or could not be parsed.
    #[error("Invalid page selection '{input}': {reason}")]
    BadPageSelection {
        /// Raw selection text.
        input: String,
        /// Why parsing failed.
        reason: String,
    },

    /// Output file already exists and overwrite is not allowed.
    #[error(
        "Output file already exists: {}\n  Use --force to overwrite or choose a different output path",
        .path.display()
    )]
    OutputExists {
        /// Existing output file.
        path: PathBuf,
    },

    /// Failed to write the output file.
    #[error("Failed to write output file: {}\n  Reason: {source}", .path.display())]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// Image decoding or encoding failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// TIFF decoding failed.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Reading or writing a zip container failed.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML rewriting failed.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Generic I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<lopdf::Error> for PdfMixError {
    fn from(err: lopdf::Error) -> Self {
        Self::other(err.to_string())
    }
}

impl From<anyhow::Error> for PdfMixError {
    fn from(err: anyhow::Error) -> Self {
        Self::other(format!("{err:#}"))
    }
}

impl PdfMixError {
    /// Create a FileNotFound error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a FailedToLoadPdf error.
    pub fn failed_to_load_pdf(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FailedToLoadPdf {
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Create a Conversion error.
    pub fn conversion(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Conversion {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an AutomationUnavailable error.
    pub fn automation_unavailable(reason: impl Into<String>) -> Self {
        Self::AutomationUnavailable {
            reason: reason.into(),
        }
    }

    /// Create an OutputExists error.
    pub fn output_exists(path: impl Into<PathBuf>) -> Self {
        Self::OutputExists { path: path.into() }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error only affects the file (or chunk) it came from.
    ///
    /// Recoverable errors are recorded as failures and processing continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. }
                | Self::FailedToLoadPdf { .. }
                | Self::UnsupportedFormat { .. }
                | Self::Conversion { .. }
                | Self::ChunkFailed { .. }
                | Self::ProcessTimeout { .. }
                | Self::ProcessFailed { .. }
                | Self::Image(_)
                | Self::Tiff(_)
        )
    }

    /// Check if this error should stop all processing immediately.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable
                | Self::NoPagesMerged
                | Self::FailedToWrite { .. }
                | Self::OutputExists { .. }
        )
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } | Self::NotAFile { .. } => 2,
            Self::FailedToLoadPdf { .. } => 3,
            Self::UnsupportedFormat { .. } => 3,
            Self::OutputExists { .. } => 4,
            Self::FailedToWrite { .. } | Self::Io { .. } => 5,
            Self::NoPagesMerged => 6,
            Self::Conversion { .. }
            | Self::ChunkFailed { .. }
            | Self::ProcessTimeout { .. }
            | Self::ProcessFailed { .. }
            | Self::Image(_)
            | Self::Tiff(_)
            | Self::Zip(_)
            | Self::Xml(_) => 7,
            Self::ExecutableNotFound { .. }
            | Self::AutomationUnavailable { .. }
            | Self::BackendUnavailable => 8,
            Self::InvalidPageSelection { .. }
            | Self::BadPageSelection { .. }
            | Self::InvalidConfig { .. }
            | Self::Other { .. } => 1,
        }
    }
}
