//! # Compiler
//!
//! Lowers a validated [`TestDefinition`] into the flat, positioned command
//! list an executor consumes.
//!
//! ## Invariants
//! - Positions start at the configured start position and increase by one
//!   with no gaps, across setup, main and teardown in that order.
//! - Every action contributes at least one step; nothing is dropped.
//! - The starting URL is metadata, never a step.
//! - Compilation is deterministic: same definition and settings, same output.

use indexmap::IndexMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::ast::{Section, TestDefinition};
use crate::config::CompilerSettings;
use crate::{err_msg, StepError};

pub mod env;
mod lower;

pub use env::{Binding, VariableEnv};

use lower::Lowering;

// ============================================================================
// OUTPUT TYPES
// ============================================================================

/// Executor hints attached to a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_before_write: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_position: Option<String>,
    /// `css`, `xpath` or `text`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
}

impl StepOptions {
    pub fn for_locator(locator: &str) -> Self {
        Self {
            element_type: Some(lower::element_type(locator).to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledStep {
    pub position: usize,
    pub command: String,
    pub args: Vec<String>,
    pub description: String,
    #[serde(serialize_with = "section_label")]
    pub section: Section,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "StepOptions::is_empty")]
    pub options: StepOptions,
}

fn section_label<S: serde::Serializer>(section: &Section, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(section.label())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_url: Option<String>,
    pub steps: Vec<CompiledStep>,
    /// Final binding table, data bindings first.
    pub variables: IndexMap<String, Binding>,
    /// Section keys that produced at least one step, in order.
    pub checkpoints: Vec<String>,
}

impl CompileResult {
    pub fn to_json(&self) -> Result<String, StepError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| err_msg!(Compile, "Cannot serialize compile result: {}", e))
    }

    /// Hex SHA-256 of the canonical JSON form. Two compilations of the same
    /// input always agree.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        format!("{:x}", Sha256::digest(&canonical))
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

// ============================================================================
// COMPILER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    settings: CompilerSettings,
}

impl Compiler {
    pub fn new(settings: CompilerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Compiles `def`. Fails with one [`StepError::Compile`] listing every
    /// action that does not hold exactly one valid operation.
    pub fn compile(&self, def: &TestDefinition) -> Result<CompileResult, StepError> {
        let base = def
            .base
            .as_deref()
            .or(self.settings.base_url.as_deref())
            .filter(|b| !b.trim().is_empty());
        let default_timeout = def.config.timeout_ms.or(self.settings.default_timeout_ms);

        let mut lowering = Lowering::new(
            VariableEnv::from_bindings(&def.bindings),
            self.settings.start_position,
            base,
            self.settings.clear_before_write,
            default_timeout,
        );

        let mut checkpoints = Vec::new();
        for (section, specs) in def.sections() {
            let before = lowering.steps.len();
            lowering.section = section;
            lowering.lower_all(specs);
            if lowering.steps.len() > before {
                checkpoints.push(section.key().to_string());
            }
        }

        if !lowering.failures.is_empty() {
            let count = lowering.failures.len();
            return Err(err_msg!(
                Compile,
                "{} action(s) cannot be compiled:\n  {}",
                count,
                lowering.failures.join("\n  ")
            )
            .with_help("Run 'stepwise validate' for fixes and examples"));
        }

        let starting_url = def
            .nav
            .as_deref()
            .map(|nav| lower::resolve_url(base, &lowering.env.interpolate(nav, true)));

        debug!(
            name = %def.name,
            steps = lowering.steps.len(),
            sections = checkpoints.len(),
            "compiled definition"
        );

        Ok(CompileResult {
            name: def.name.clone(),
            starting_url,
            steps: lowering.steps,
            variables: lowering.env.into_table(),
            checkpoints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;
    use crate::ErrorType;

    fn compile_with(yaml: &str, settings: CompilerSettings) -> Result<CompileResult, StepError> {
        let raw: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        let def = Normalizer::new().normalize_definition(&raw).unwrap();
        Compiler::new(settings).compile(&def)
    }

    fn compile(yaml: &str) -> CompileResult {
        compile_with(yaml, CompilerSettings::default()).unwrap()
    }

    fn args(result: &CompileResult) -> Vec<Vec<&str>> {
        result
            .steps
            .iter()
            .map(|s| s.args.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_positions_are_contiguous_across_sections() {
        let result = compile(
            "test: T\nsetup: [{nav: /a}]\ndo: [{c: Go}, {t: {'#q': hi}}]\nteardown: [{note: done}]",
        );
        let positions: Vec<_> = result.steps.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
        assert_eq!(result.checkpoints, vec!["setup", "do", "teardown"]);
    }

    #[test]
    fn test_start_position_setting() {
        let settings = CompilerSettings {
            start_position: 10,
            ..CompilerSettings::default()
        };
        let result = compile_with("test: T\ndo: [{c: A}, {c: B}]", settings).unwrap();
        assert_eq!(result.steps[0].position, 10);
        assert_eq!(result.steps[1].position, 11);
    }

    #[test]
    fn test_located_write_emits_clear_first() {
        let result = compile("test: T\ndo: [{t: {'#email': a@b.c}}]");
        assert_eq!(
            args(&result),
            vec![vec!["write", "#email", ""], vec!["write", "#email", "a@b.c"]]
        );
        assert_eq!(result.steps[0].options.clear_before_write, Some(true));
    }

    #[test]
    fn test_unlocated_write_targets_focus() {
        let result = compile("test: T\ndo: [{t: hello}]");
        assert_eq!(args(&result), vec![vec!["write", "[focused]", "hello"]]);
    }

    #[test]
    fn test_stored_values_stay_placeholders() {
        let result = compile(
            "test: T\ndata: {user: ann}\ndo: [{store: {'.total': sum}}, {ch: '{{sum}} for {{user}}'}]",
        );
        assert_eq!(result.steps[1].args, vec!["exists", "{{sum}} for ann"]);
        assert_eq!(
            result.variables.get("sum"),
            Some(&Binding::Stored { position: 1 })
        );
    }

    #[test]
    fn test_starting_url_is_metadata() {
        let result = compile("test: T\nbase: https://shop.io/\nnav: /cart\ndo: [{c: Pay}]");
        assert_eq!(result.starting_url.as_deref(), Some("https://shop.io/cart"));
        assert_eq!(result.steps.len(), 1);
    }

    #[test]
    fn test_conditionals_flatten_in_order() {
        let result = compile(
            "test: T\ndo:\n  - if: {cond: '#banner', then: [{c: Close}], else: [{note: none}]}\n  - c: Next",
        );
        let commands: Vec<_> = result.steps.iter().map(|s| s.args[0].as_str()).collect();
        assert_eq!(commands, vec!["comment", "click", "comment", "comment", "click"]);
        assert_eq!(result.steps[0].args[1], "IF: #banner");
    }

    #[test]
    fn test_invalid_actions_are_collected() {
        let err = compile_with(
            "test: T\ndo: [{c: A, h: B}, {}]",
            CompilerSettings::default(),
        )
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Compile);
        assert!(err.message().contains("do[0]"));
        assert!(err.message().contains("do[1]"));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let yaml = "test: T\ndo: [{nav: /x}, {k: enter}]";
        assert_eq!(compile(yaml).fingerprint(), compile(yaml).fingerprint());
        assert_ne!(
            compile(yaml).fingerprint(),
            compile("test: T\ndo: [{k: enter}]").fingerprint()
        );
        assert_eq!(compile(yaml).fingerprint().len(), 64);
    }
}
