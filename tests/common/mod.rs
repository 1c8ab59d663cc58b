//! Shared helpers for the integration tests.
//!
//! Fixtures live in `tests/fixtures/` and are read relative to the manifest so
//! the tests work from any working directory.

#![allow(dead_code)]

use std::path::PathBuf;

use stepwise::ast::TestDefinition;
use stepwise::compiler::CompileResult;
use stepwise::config::{CompilerSettings, Settings};
use stepwise::engine::Pipeline;
use stepwise::normalize::Normalizer;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("cannot read fixture {}: {}", name, e))
}

/// Pipeline with default settings.
pub fn pipeline() -> Pipeline {
    Pipeline::default()
}

/// Pipeline that emits no clearing step before located writes.
pub fn pipeline_without_clear() -> Pipeline {
    Pipeline::new(Settings {
        compiler: CompilerSettings {
            clear_before_write: false,
            ..CompilerSettings::default()
        },
        ..Settings::default()
    })
}

pub fn raw(yaml: &str) -> serde_yaml::Value {
    serde_yaml::from_str(yaml).expect("test YAML parses")
}

pub fn definition(yaml: &str) -> TestDefinition {
    Normalizer::new()
        .normalize_definition(&raw(yaml))
        .expect("root is a mapping")
}

/// `(command, args)` per step; the part of a result every dialect agrees on.
pub fn step_shape(result: &CompileResult) -> Vec<(String, Vec<String>)> {
    result
        .steps
        .iter()
        .map(|s| (s.command.clone(), s.args.clone()))
        .collect()
}
