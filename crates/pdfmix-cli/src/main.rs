//! pdfmix - Convert mixed documents to PDF and merge them.

mod cli;
mod progress;

use clap::Parser;
use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ExtractArgs, FormatsArgs, MergeArgs, OutputArgs, OverwriteMode};
use crate::progress::TerminalProgress;
use pdfmix::config::Config;
use pdfmix::convert::{BackendFactory, Platform};
use pdfmix::error::PdfMixError;
use pdfmix::merge::{Merger, PageExtractor, PageSelection};
use pdfmix::model::FileRef;
use pdfmix::utils::expand_inputs;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(err.exit_code());
        }
    };
    init_tracing(cli.log_level().unwrap_or(config.logging.level.as_str()));
    debug!(?config, "configuration loaded");

    if let Err(err) = run(cli, config).await {
        eprintln!("Error: {err}");
        process::exit(err.exit_code());
    }
}

/// Load the config file, if any, and check it.
fn load_config(cli: &Cli) -> Result<Config, PdfMixError> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Log to stderr; `RUST_LOG` overrides the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pdfmix={level},pdfmix_cli={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// Main application logic.
async fn run(cli: Cli, config: Config) -> Result<(), PdfMixError> {
    let quiet = cli.quiet;
    match cli.command {
        Command::Merge(args) => merge(args, config, quiet).await,
        Command::Extract(args) => extract(args, quiet).await,
        Command::Formats(args) => formats(args, config).await,
    }
}

async fn merge(args: MergeArgs, mut config: Config, quiet: bool) -> Result<(), PdfMixError> {
    if let Some(chunk_size) = args.chunk_size {
        config.conversion.chunk_size = chunk_size;
        config.validate()?;
    }

    let inputs = expand_inputs(&args.inputs)?;
    if inputs.is_empty() {
        return Err(PdfMixError::other("No input files matched"));
    }
    check_output(&args.output, quiet)?;

    let files = FileRef::numbered(inputs);
    let output = args.output.output.clone();
    let factory = BackendFactory::new(config.conversion).with_soffice_path(args.soffice);
    let show_progress = !quiet && !args.no_progress;

    let report = tokio::task::spawn_blocking(move || {
        let backend = factory.select_backend(Platform::current())?;
        let merger = Merger::new(backend);
        let progress = TerminalProgress::new(show_progress);
        let result = merger.merge(&files, &output, &progress);
        progress.finish();
        result
    })
    .await
    .map_err(|e| PdfMixError::other(format!("Merge worker failed: {e}")))??;

    for path in &report.skipped {
        eprintln!("Warning: skipped missing file {}", path.display());
    }
    if !report.failed.is_empty() {
        eprintln!(
            "Warning: {} file(s) could not be added: {}",
            report.failed.len(),
            report.failed_names().join(", ")
        );
    }
    if !quiet {
        println!(
            "Created {} ({}): {} pages from {} file(s) in {:.2}s",
            report.output.display(),
            report.write.format_file_size(),
            report.pages,
            report.merged,
            report.duration.as_secs_f64()
        );
    }
    Ok(())
}

async fn extract(args: ExtractArgs, quiet: bool) -> Result<(), PdfMixError> {
    let selection = PageSelection::parse(&args.pages)?;
    check_output(&args.output, quiet)?;

    let input = args.input.clone();
    let output = args.output.output.clone();
    let report = tokio::task::spawn_blocking(move || {
        let progress = TerminalProgress::new(!quiet);
        let result = PageExtractor::new().extract(&input, &selection, &output, &progress);
        progress.finish();
        result
    })
    .await
    .map_err(|e| PdfMixError::other(format!("Extract worker failed: {e}")))??;

    if !quiet {
        println!(
            "Created {} ({}): {} of {} pages from {}",
            args.output.output.display(),
            report.write.format_file_size(),
            report.pages,
            report.source_pages,
            report.input.display()
        );
    }
    Ok(())
}

async fn formats(args: FormatsArgs, config: Config) -> Result<(), PdfMixError> {
    let factory = BackendFactory::new(config.conversion).with_soffice_path(args.soffice);
    let backend = tokio::task::spawn_blocking(move || factory.select_backend(Platform::current()))
        .await
        .map_err(|e| PdfMixError::other(format!("Backend probe failed: {e}")))??;

    let registry = backend.registry();
    let categories: BTreeMap<&str, Vec<String>> = registry
        .categories()
        .map(|category| (category.as_str(), registry.extensions(category)))
        .collect();

    if args.json {
        let value = serde_json::json!({
            "backend": backend.name(),
            "categories": categories,
        });
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| PdfMixError::other(e.to_string()))?;
        println!("{text}");
    } else {
        println!("Backend: {}", backend.name());
        for (category, extensions) in &categories {
            println!("  {category:<13} {}", extensions.join(", "));
        }
    }
    Ok(())
}

/// Apply the overwrite policy to an existing output file.
fn check_output(args: &OutputArgs, quiet: bool) -> Result<(), PdfMixError> {
    if !args.output.exists() {
        return Ok(());
    }

    match args.overwrite_mode() {
        OverwriteMode::Force => Ok(()),
        OverwriteMode::NoClobber => Err(PdfMixError::output_exists(&args.output)),
        OverwriteMode::Prompt => {
            // Without someone to ask, treat as no-clobber.
            if quiet || !io::stdin().is_terminal() {
                return Err(PdfMixError::output_exists(&args.output));
            }
            if confirm_overwrite(&args.output)? {
                Ok(())
            } else {
                Err(PdfMixError::output_exists(&args.output))
            }
        }
    }
}

fn confirm_overwrite(path: &Path) -> Result<bool, PdfMixError> {
    eprint!("Output file already exists: {}\nOverwrite? [y/N]: ", path.display());
    io::stderr().flush().ok();

    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .map_err(|err| PdfMixError::other(format!("Failed to read input: {err}")))?;

    let response = response.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}
