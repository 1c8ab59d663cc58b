//! The Stepwise pipeline: parse, detect, normalize, validate, compile.
//!
//! Pure services the CLI orchestrates. Nothing here prints; every run owns its
//! own state, so independent runs may be issued from separate threads.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::ast::TestDefinition;
use crate::compiler::{CompileResult, Compiler};
use crate::config::Settings;
use crate::convert::{self, Dialect};
use crate::normalize::Normalizer;
use crate::syntax::{parse_document, SourceMap};
use crate::validation::{ValidationReport, Validator};
use crate::{err_msg, StepError};

/// Extensions picked up when walking directories.
pub const SOURCE_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

// ============================================================================
// RUN RESULTS
// ============================================================================

/// A definition brought to terse form and normalized.
#[derive(Debug, Clone)]
pub struct Loaded {
    pub definition: TestDefinition,
    pub dialect: Dialect,
    /// Detection and conversion warnings.
    pub notices: Vec<String>,
}

/// Outcome of one full run. `compiled` is present only when validation passed.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub loaded: Loaded,
    pub report: ValidationReport,
    pub compiled: Option<CompileResult>,
}

impl PipelineRun {
    /// The compiled script, or a `Validation` error carrying the error count.
    /// The findings stay in `self.report`.
    pub fn into_result(self) -> Result<CompileResult, StepError> {
        match self.compiled {
            Some(result) => Ok(result),
            None => Err(validation_failure(&self.report)),
        }
    }
}

fn validation_failure(report: &ValidationReport) -> StepError {
    let help = report
        .errors
        .first()
        .or_else(|| report.warnings.first())
        .map(|f| f.fix.clone())
        .unwrap_or_default();
    err_msg!(
        Validation,
        "Validation failed with {} error(s) and {} warning(s)",
        report.errors.len(),
        report.warnings.len()
    )
    .with_help(help)
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline {
    settings: Settings,
    normalizer: Normalizer,
    validator: Validator,
    compiler: Compiler,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        Self {
            normalizer: Normalizer::new(),
            validator: Validator::with_settings(&settings.validation),
            compiler: Compiler::new(settings.compiler.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Parses any dialect and normalizes it into a [`TestDefinition`].
    pub fn load(&self, name: &str, text: &str) -> Result<Loaded, StepError> {
        let raw = parse_document(name, text)?;
        let root = Normalizer::preserving_null().normalize(&raw);
        let convert::TerseTree {
            source: dialect,
            root: terse,
            warnings: notices,
        } = convert::to_terse(&root)?;

        let definition = self
            .normalizer
            .normalize_definition(&serde_yaml::Value::from(&terse))?;
        // Line numbers only line up with the text when no conversion happened.
        let definition = if dialect == Dialect::Terse {
            definition.with_lines(&SourceMap::scan(text))
        } else {
            definition
        };
        for notice in &notices {
            warn!(source = name, "{}", notice);
        }
        debug!(source = name, %dialect, "loaded definition");
        Ok(Loaded {
            definition,
            dialect,
            notices,
        })
    }

    pub fn validate_source(&self, name: &str, text: &str) -> Result<(Loaded, ValidationReport), StepError> {
        let loaded = self.load(name, text)?;
        let report = self.validator.validate(&loaded.definition);
        Ok((loaded, report))
    }

    /// Full run. Errors are parse, detection or compiler failures; a failed
    /// validation is reported through [`PipelineRun::compiled`] being `None`.
    pub fn run(&self, name: &str, text: &str) -> Result<PipelineRun, StepError> {
        let (loaded, report) = self.validate_source(name, text)?;
        let compiled = if report.passed {
            Some(self.compiler.compile(&loaded.definition)?)
        } else {
            None
        };
        Ok(PipelineRun {
            loaded,
            report,
            compiled,
        })
    }

    pub fn compile_source(&self, name: &str, text: &str) -> Result<CompileResult, StepError> {
        self.run(name, text)?.into_result()
    }

    /// Compiles without validating first; the compiler still rejects
    /// malformed actions on its own.
    pub fn compile_unchecked(&self, name: &str, text: &str) -> Result<CompileResult, StepError> {
        let loaded = self.load(name, text)?;
        self.compiler.compile(&loaded.definition)
    }

    // ============================================================================
    // FILE SERVICES
    // ============================================================================

    /// Reads a file with standardized error handling.
    pub fn read_file(path: &Path) -> Result<String, StepError> {
        std::fs::read_to_string(path)
            .map_err(|e| err_msg!(Io, "Cannot read '{}': {}", path.display(), e).caused_by(e))
    }

    /// Expands files and directories into a sorted list of source files.
    pub fn discover<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PathBuf>, StepError> {
        let mut files = Vec::new();
        for root in paths {
            let root = root.as_ref();
            if root.is_file() {
                files.push(root.to_path_buf());
                continue;
            }
            if !root.exists() {
                return Err(err_msg!(Io, "No such file or directory: '{}'", root.display()));
            }
            for entry in WalkDir::new(root) {
                let entry = entry
                    .map_err(|e| err_msg!(Io, "Failed to walk '{}': {}", root.display(), e))?;
                if entry.file_type().is_file() && is_source_file(entry.path()) {
                    files.push(entry.path().to_path_buf());
                }
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorType;

    #[test]
    fn test_terse_run_compiles() {
        let run = Pipeline::default()
            .run("t.yaml", "test: Search\ndo:\n  - c: Search\n  - ch: Results\n")
            .unwrap();
        assert!(run.report.passed);
        assert_eq!(run.loaded.dialect, Dialect::Terse);
        assert_eq!(run.loaded.definition.main[1].line, Some(4));
        assert_eq!(run.compiled.unwrap().steps.len(), 2);
    }

    #[test]
    fn test_descriptive_input_is_accepted() {
        let result = Pipeline::default()
            .compile_source("d.yaml", "name: Search\nsteps:\n  - click: Search\n  - assert: Results\n")
            .unwrap();
        assert_eq!(result.name, "Search");
        assert_eq!(result.steps[1].args, vec!["exists", "Results"]);
    }

    #[test]
    fn test_validation_failure_keeps_findings() {
        let run = Pipeline::default()
            .run("t.yaml", "test: T\ndo: [{ch: '{{missing}}'}]")
            .unwrap();
        assert!(run.compiled.is_none());
        assert_eq!(run.report.errors.len(), 1);
        let err = run.into_result().unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
    }

    #[test]
    fn test_source_extensions() {
        assert!(is_source_file(Path::new("a/b.yaml")));
        assert!(is_source_file(Path::new("c.JSON")));
        assert!(!is_source_file(Path::new("notes.md")));
    }
}
