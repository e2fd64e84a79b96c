//! CLI argument parsing for pdfmix.
//!
//! This file is also compiled by the build script to render the man page,
//! so it must only depend on `clap` and `std`.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Convert documents, spreadsheets, presentations and images to PDF and
/// merge them into a single file.
///
/// Non-PDF inputs are converted with the best engine available on this
/// machine: office automation, a headless office suite, or, failing both,
/// an image-only converter.
#[derive(Parser, Debug)]
#[command(name = "pdfmix")]
#[command(version)]
#[command(about = "Convert mixed documents to PDF and merge them", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE", env = "PDFMIX_CONFIG")]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert and merge files into one PDF, in the order given
    ///
    /// Examples:
    ///   pdfmix merge cover.pdf budget.xlsx notes.docx -o report.pdf
    ///   pdfmix merge "scans/*.png" -o scans.pdf
    Merge(MergeArgs),

    /// Copy selected pages of a PDF into a new PDF
    ///
    /// Examples:
    ///   pdfmix extract report.pdf --pages 1-3,10 -o summary.pdf
    ///   pdfmix extract report.pdf --pages 3,1,1 -o reordered.pdf
    Extract(ExtractArgs),

    /// Show the conversion backend in use and the file types it accepts
    Formats(FormatsArgs),
}

/// Output overwrite behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteMode {
    /// Ask before replacing an existing file.
    Prompt,
    /// Replace without asking.
    Force,
    /// Never replace.
    NoClobber,
}

/// Overwrite flags shared by the subcommands that write a PDF.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output PDF file path
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Overwrite an existing output file without asking
    #[arg(short, long)]
    pub force: bool,

    /// Never overwrite an existing output file
    #[arg(long, conflicts_with = "force")]
    pub no_clobber: bool,
}

impl OutputArgs {
    /// Overwrite mode selected by the flags.
    pub fn overwrite_mode(&self) -> OverwriteMode {
        if self.force {
            OverwriteMode::Force
        } else if self.no_clobber {
            OverwriteMode::NoClobber
        } else {
            OverwriteMode::Prompt
        }
    }
}

/// Arguments of `pdfmix merge`.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Input files or glob patterns, merged in this order
    #[arg(required = true, value_name = "FILE")]
    pub inputs: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Files per conversion engine session
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,

    /// Path to the headless office suite executable
    #[arg(long, value_name = "PATH", env = "PDFMIX_SOFFICE")]
    pub soffice: Option<PathBuf>,

    /// Do not draw progress on the terminal
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments of `pdfmix extract`.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Source PDF
    #[arg(value_name = "PDF")]
    pub input: PathBuf,

    /// Pages to copy, 1-based, in output order (e.g. "10,1-3,1")
    #[arg(short, long, value_name = "LIST")]
    pub pages: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments of `pdfmix formats`.
#[derive(Args, Debug)]
pub struct FormatsArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Path to the headless office suite executable
    #[arg(long, value_name = "PATH", env = "PDFMIX_SOFFICE")]
    pub soffice: Option<PathBuf>,
}

impl Cli {
    /// Log level forced by `-v`/`-q`, if any.
    pub fn log_level(&self) -> Option<&'static str> {
        if self.quiet {
            return Some("error");
        }
        match self.verbose {
            0 => None,
            1 => Some("debug"),
            _ => Some("trace"),
        }
    }
}
