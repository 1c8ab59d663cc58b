//! Validator behaviour on whole definitions.

mod common;

use pretty_assertions::assert_eq;
use stepwise::config::ValidationSettings;
use stepwise::validation::{Finding, Severity, ValidationRule, Validator};
use stepwise::ast::TestDefinition;

fn validate(yaml: &str) -> stepwise::validation::ValidationReport {
    Validator::new().validate(&common::definition(yaml))
}

fn rules_of(findings: &[Finding]) -> Vec<&'static str> {
    findings.iter().map(|f| f.rule).collect()
}

#[test]
fn fixture_login_passes() {
    let report = validate(&common::fixture("login.yaml"));
    assert!(report.passed, "{:#?}", report.errors);
}

#[test]
fn multiple_operations_is_exactly_one_error_citing_both_keys() {
    let report = validate("{test: T, do: [{c: X, t: {'#y': z}}]}");
    assert_eq!(report.errors.len(), 1);
    let error = &report.errors[0];
    assert_eq!(error.rule, "action-syntax");
    assert_eq!(error.path, "do[0]");
    assert!(error.message.contains('c'));
    assert!(error.message.contains('t'));
    assert!(error.example.is_some());
}

#[test]
fn zero_operations_is_exactly_one_error() {
    let report = validate("{test: T, do: [{clik: Save}]}");
    assert_eq!(rules_of(&report.errors), vec!["action-syntax"]);
    assert!(report.errors[0].message.contains("clik"));
    assert!(report.errors[0].fix.contains("'c:'"));
}

#[test]
fn missing_variable_fails_then_passes_once_bound() {
    let text = common::fixture("missing_variable.yaml");
    let report = validate(&text);
    assert!(!report.passed);
    assert_eq!(rules_of(&report.errors), vec!["variable-refs"]);
    assert!(report.errors[0].message.contains("missing"));

    let bound = format!("{}data:\n  missing: world\n", text);
    let report = validate(&bound);
    assert!(report.passed, "{:#?}", report.errors);
}

#[test]
fn store_satisfies_later_references_only() {
    let before = validate("{test: T, do: [{ch: '$total'}, {store: {.sum: total}}]}");
    assert!(!before.passed);
    let after = validate("{test: T, do: [{store: {.sum: total}}, {ch: '$total'}]}");
    assert!(after.passed, "{:#?}", after.errors);
}

#[test]
fn missing_name_and_empty_main_are_reported() {
    let report = validate("{setup: [{c: Go}]}");
    assert!(!report.passed);
    assert!(report.errors.iter().all(|f| f.rule == "required-fields"));
    assert_eq!(report.errors.len(), 2);
}

#[test]
fn warnings_never_block_unless_strict() {
    let yaml = "{test: T, do: [{nav: /a}, {c: Go}]}";
    let report = validate(yaml);
    assert!(report.passed);
    assert!(report.errors.is_empty());
    assert!(report
        .warnings
        .iter()
        .all(|w| w.severity == Severity::Warning));
    assert!(!report.warnings.is_empty());

    let strict = Validator::with_settings(&ValidationSettings {
        strict: true,
        ..ValidationSettings::default()
    });
    assert!(!strict.validate(&common::definition(yaml)).passed);
}

#[test]
fn every_finding_carries_a_fix() {
    let report = validate(&common::fixture("invalid_action.yaml"));
    assert_eq!(report.errors.len(), 2);
    for finding in report.findings() {
        assert!(!finding.fix.trim().is_empty(), "{}", finding);
    }
}

#[test]
fn structural_errors_carry_fix_and_example() {
    let report = validate("{test: T, nav: [a], data: plain, config: {timeout: soon}, do: [{c: Go}]}");
    let paths: Vec<_> = report.errors.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["nav", "config.timeout", "data"]);
    for finding in &report.errors {
        assert_eq!(finding.rule, "required-fields");
        assert!(!finding.fix.is_empty());
        assert!(finding.example.is_some(), "{}", finding);
    }
    assert_eq!(report.errors[2].example.as_deref(), Some("data:\n  user: ann"));
}

#[test]
fn source_lines_reach_findings() {
    let report = common::pipeline()
        .validate_source("invalid_action.yaml", &common::fixture("invalid_action.yaml"))
        .unwrap()
        .1;
    let lines: Vec<_> = report.errors.iter().map(|f| f.line).collect();
    assert_eq!(lines, vec![Some(3), Some(5)]);
}

struct NoTodoNames;

impl ValidationRule for NoTodoNames {
    fn id(&self) -> &'static str {
        "no-todo-names"
    }

    fn description(&self) -> &'static str {
        "Test names are final"
    }

    fn validate(&self, definition: &TestDefinition) -> Vec<Finding> {
        if definition.name.contains("TODO") {
            vec![Finding::error(self.id(), "test", "Name is a placeholder", "Give the test a real name")]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn registered_rules_run_after_builtins() {
    let mut validator = Validator::new();
    validator.register(Box::new(NoTodoNames));
    let ids: Vec<_> = validator.rules().map(|(id, _)| id).collect();
    assert_eq!(ids.last(), Some(&"no-todo-names"));

    let report = validator.validate(&common::definition("{test: TODO, do: [{c: Go}]}"));
    assert_eq!(rules_of(&report.errors), vec!["no-todo-names"]);
}
