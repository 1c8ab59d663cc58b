//! The Stepwise Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions. Handlers return whether the run succeeded;
//! fatal errors propagate as [`StepError`] and are rendered with miette.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Command, OutputFormat, StepwiseArgs};
use crate::config::Settings;
use crate::convert::{self, Dialect};
use crate::engine::Pipeline;
use crate::{err_msg, StepError};

pub mod args;
pub mod output;

/// Log filter variable, e.g. `STEPWISE_LOG=stepwise=debug`.
pub const LOG_ENV: &str = "STEPWISE_LOG";

/// The main entry point for the CLI.
pub fn run() {
    let args = StepwiseArgs::parse();
    init_tracing();

    let result = Settings::load(args.config.as_deref()).and_then(|settings| {
        match args.command {
            Command::Validate { paths, strict } => handle_validate(settings, &paths, strict),
            Command::Compile {
                file,
                no_clear,
                base_url,
                format,
            } => handle_compile(settings, &file, no_clear, base_url, format),
            Command::Convert { file, to, output } => handle_convert(&file, to, output.as_deref()),
            Command::Detect { file } => handle_detect(&file),
        }
    });

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            output::print_error(e);
            process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn display_name(path: &Path) -> String {
    path.display().to_string()
}

// ============================================================================
// HANDLERS
// ============================================================================

fn handle_validate(mut settings: Settings, paths: &[PathBuf], strict: bool) -> Result<bool, StepError> {
    settings.validation.strict |= strict;
    let pipeline = Pipeline::new(settings);
    let files = Pipeline::discover(paths)?;
    if files.is_empty() {
        return Err(err_msg!(Io, "No .yaml, .yml or .json files found")
            .with_help("Pass definition files or directories that contain them"));
    }

    let mut failed = 0;
    for file in &files {
        let outcome = Pipeline::read_file(file)
            .and_then(|text| pipeline.validate_source(&display_name(file), &text));
        match outcome {
            Ok((loaded, report)) => {
                output::print_notices(&loaded.notices);
                output::print_report(file, &report);
                if !report.passed {
                    failed += 1;
                }
            }
            Err(e) => {
                output::print_error(e);
                failed += 1;
            }
        }
    }
    output::print_summary(files.len(), failed);
    Ok(failed == 0)
}

fn handle_compile(
    mut settings: Settings,
    file: &Path,
    no_clear: bool,
    base_url: Option<String>,
    format: OutputFormat,
) -> Result<bool, StepError> {
    if no_clear {
        settings.compiler.clear_before_write = false;
    }
    if base_url.is_some() {
        settings.compiler.base_url = base_url;
    }
    let pipeline = Pipeline::new(settings);
    let text = Pipeline::read_file(file)?;
    let run = pipeline.run(&display_name(file), &text)?;
    output::print_notices(&run.loaded.notices);
    if !run.report.passed {
        output::print_report(file, &run.report);
    }
    let result = run.into_result()?;
    match format {
        OutputFormat::Json => println!("{}", result.to_json()?),
        OutputFormat::Text => output::print_steps(&result),
    }
    Ok(true)
}

fn handle_convert(file: &Path, to: Dialect, out: Option<&Path>) -> Result<bool, StepError> {
    let text = Pipeline::read_file(file)?;
    let conversion = convert::convert(&text, to)?;
    output::print_notices(&conversion.warnings);
    match out {
        Some(path) => std::fs::write(path, &conversion.output).map_err(|e| {
            err_msg!(Io, "Cannot write '{}': {}", path.display(), e).caused_by(e)
        })?,
        None => print!("{}", conversion.output),
    }
    Ok(true)
}

fn handle_detect(file: &Path) -> Result<bool, StepError> {
    let text = Pipeline::read_file(file)?;
    let detection = convert::detect(&text)?;
    output::print_detection(&detection);
    Ok(true)
}
