//! Defines the command-line arguments and subcommands for the Stepwise CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::convert::Dialect;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "stepwise",
    version,
    about = "Validate, compile and convert browser test definitions."
)]
pub struct StepwiseArgs {
    /// Settings file. Defaults to ./stepwise.toml when it exists.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate definition files or directories and report findings.
    Validate {
        /// Files or directories (walked for .yaml, .yml and .json).
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Treat warnings as errors.
        #[arg(long)]
        strict: bool,
    },
    /// Validate and compile one definition into executor steps.
    Compile {
        #[arg(required = true)]
        file: PathBuf,
        /// Do not emit a clearing step before located writes.
        #[arg(long)]
        no_clear: bool,
        /// Base URL for relative navigation targets.
        #[arg(long, value_name = "URL")]
        base_url: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Convert a definition to another dialect.
    Convert {
        #[arg(required = true)]
        file: PathBuf,
        /// Target dialect: terse, descriptive or extended.
        #[arg(long)]
        to: Dialect,
        /// Write here instead of stdout.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Report which dialect a definition is written in.
    Detect {
        #[arg(required = true)]
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
