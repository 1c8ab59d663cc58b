//! Validation for Stepwise test definitions.
//!
//! An extensible, rule-based pass over a normalized [`TestDefinition`].
//!
//! # Architecture
//!
//! 1. **ValidationRule trait** - each rule is a pure function of the definition
//! 2. **Validator** - runs the registered rules in order
//! 3. **Finding** - the output of validation (errors block compilation, warnings never do)
//!
//! # Adding a New Rule
//!
//! 1. Create a new file in `validation/rules/`
//! 2. Implement `ValidationRule` for your struct
//! 3. Register it in `Validator::with_settings`
//!
//! Every finding carries a concrete fix. Producers of definitions are expected
//! to correct themselves from the message alone.

pub mod rules;

use serde::Serialize;
use tracing::debug;

use crate::ast::TestDefinition;
use crate::config::ValidationSettings;

// ============================================================================
// Finding Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks compilation
    Error,
    /// Advisory only
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        })
    }
}

/// One validation result, independent of how it is rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    /// Which rule produced this finding
    pub rule: &'static str,
    /// Field path such as `do[2].wait`
    pub path: String,
    pub message: String,
    pub fix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Finding {
    pub fn error(
        rule: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
        fix: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            rule,
            path: path.into(),
            message: message.into(),
            fix: fix.into(),
            example: None,
            line: None,
        }
    }

    pub fn warning(
        rule: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
        fix: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(rule, path, message, fix)
        }
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = Some(example.into());
        self
    }

    pub fn at_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.severity, self.path)?;
        if let Some(line) = self.line {
            write!(f, " (line {})", line)?;
        }
        write!(f, ": {} [{}]", self.message, self.rule)?;
        write!(f, "\n  fix: {}", self.fix)?;
        if let Some(example) = &self.example {
            for (i, line) in example.lines().enumerate() {
                let lead = if i == 0 { "  example: " } else { "           " };
                write!(f, "\n{}{}", lead, line)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Report
// ============================================================================

/// Errors and warnings from one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

pub trait ValidationReporter {
    fn report(&mut self, finding: Finding);
}

impl ValidationReporter for ValidationReport {
    fn report(&mut self, finding: Finding) {
        match finding.severity {
            Severity::Error => self.errors.push(finding),
            Severity::Warning => self.warnings.push(finding),
        }
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            passed: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.passed
    }

    /// Errors then warnings.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.errors.iter().chain(self.warnings.iter())
    }
}

// ============================================================================
// ValidationRule Trait
// ============================================================================

/// Trait that all validation rules implement.
///
/// Rules are independent of each other and of evaluation order.
pub trait ValidationRule: Send + Sync {
    /// Unique identifier for this rule (e.g., "variable-refs")
    fn id(&self) -> &'static str;

    /// Human-readable description of what this rule checks
    fn description(&self) -> &'static str;

    fn validate(&self, definition: &TestDefinition) -> Vec<Finding>;
}

// ============================================================================
// Validator - Runs All Rules
// ============================================================================

pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
    strict: bool,
}

impl Validator {
    /// Validator with all built-in rules and default settings.
    pub fn new() -> Self {
        Self::with_settings(&ValidationSettings::default())
    }

    pub fn with_settings(settings: &ValidationSettings) -> Self {
        Self {
            rules: vec![
                Box::new(rules::StructureRule),
                Box::new(rules::ActionShapeRule),
                Box::new(rules::OperationShapeRule),
                Box::new(rules::LocatorRule),
                Box::new(rules::VariableRefsRule),
                Box::new(rules::BestPracticesRule::new(settings.max_name_length)),
            ],
            strict: settings.strict,
        }
    }

    /// Appends a rule; it runs after the built-in ones.
    pub fn register(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    pub fn validate(&self, definition: &TestDefinition) -> ValidationReport {
        let mut report = ValidationReport::new();
        for rule in &self.rules {
            for finding in rule.validate(definition) {
                report.report(finding);
            }
        }
        report.passed = report.errors.is_empty() && !(self.strict && !report.warnings.is_empty());
        debug!(
            name = %definition.name,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            passed = report.passed,
            "validated definition"
        );
        report
    }

    /// Registered rules as `(id, description)`.
    pub fn rules(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.rules.iter().map(|r| (r.id(), r.description()))
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
