//! Rule: Variable Reference Closure
//!
//! Reports an error when a `{{name}}` or `$name` placeholder refers to a name
//! that is neither bound in `data` nor produced by an earlier `store` (or a
//! click with `var`) in scope.
//!
//! Sections are walked in execution order: setup, do, teardown. Conditional
//! branches and loop bodies open a child scope; names they store stay inside.
//! A loop's `as` name is bound inside its body.
//!
//! ```yaml
//! # Error: 'total' is used before it is stored
//! - ch: "{{total}}"
//! - store: {.total: total}
//! ```

use std::collections::HashSet;

use crate::ast::{Action, ActionSpec, TestDefinition};
use crate::placeholder;

use super::super::{Finding, ValidationRule};

pub struct VariableRefsRule;

impl ValidationRule for VariableRefsRule {
    fn id(&self) -> &'static str {
        "variable-refs"
    }

    fn description(&self) -> &'static str {
        "Placeholders resolve to a binding or an earlier store"
    }

    fn validate(&self, definition: &TestDefinition) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut scope = Scope::new();
        for name in definition.bindings.keys() {
            scope.define(name);
        }

        for (field, text) in [("nav", &definition.nav), ("base", &definition.base)] {
            if let Some(text) = text {
                for name in undefined(text, true, &scope) {
                    findings.push(undefined_finding(self.id(), field.to_string(), &name, None));
                }
            }
        }

        for (_, specs) in definition.sections() {
            check_actions(specs, &mut scope, &mut findings, self.id());
        }
        findings
    }
}

// ============================================================================
// Scope Tracking
// ============================================================================

/// Names visible at a point of the walk. Child scopes copy their parent.
#[derive(Clone)]
struct Scope {
    defined: HashSet<String>,
}

impl Scope {
    fn new() -> Self {
        Self {
            defined: HashSet::new(),
        }
    }

    fn define(&mut self, name: &str) {
        self.defined.insert(name.to_string());
    }

    fn is_defined(&self, name: &str) -> bool {
        self.defined.contains(name)
    }

    fn child(&self) -> Self {
        self.clone()
    }
}

// ============================================================================
// Walk
// ============================================================================

fn check_actions(
    specs: &[ActionSpec],
    scope: &mut Scope,
    findings: &mut Vec<Finding>,
    rule: &'static str,
) {
    for spec in specs {
        // Shape problems belong to the shape rules.
        let Ok(action) = spec.resolve() else { continue };
        let sigils = !matches!(action, Action::Script(_));
        let mut reported = HashSet::new();
        for text in action.texts() {
            for name in undefined(text, sigils, scope) {
                if reported.insert(name.clone()) {
                    findings.push(undefined_finding(rule, spec.path.clone(), &name, spec.line));
                }
            }
        }
        match &action {
            Action::Store { variable, .. } => scope.define(variable),
            Action::Click {
                store_as: Some(variable),
                ..
            } => scope.define(variable),
            Action::Conditional {
                then, otherwise, ..
            } => {
                check_actions(then, &mut scope.child(), findings, rule);
                check_actions(otherwise, &mut scope.child(), findings, rule);
            }
            Action::Loop { binding, body, .. } => {
                let mut inner = scope.child();
                if let Some(name) = binding {
                    inner.define(name);
                }
                check_actions(body, &mut inner, findings, rule);
            }
            _ => {}
        }
    }
}

fn undefined(text: &str, sigils: bool, scope: &Scope) -> Vec<String> {
    placeholder::references(text, sigils)
        .into_iter()
        .filter(|r| !scope.is_defined(r.name))
        .map(|r| r.name.to_string())
        .collect()
}

fn undefined_finding(rule: &'static str, path: String, name: &str, line: Option<usize>) -> Finding {
    Finding::error(
        rule,
        path,
        format!("Undefined variable: {}", name),
        "Define variable with 'store' action or in 'data' section",
    )
    .with_example(format!("data:\n  {}: <value>", name))
    .at_line(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;

    fn check(yaml: &str) -> Vec<Finding> {
        let raw = serde_yaml::from_str(yaml).unwrap();
        let def = Normalizer::new().normalize_definition(&raw).unwrap();
        VariableRefsRule.validate(&def)
    }

    #[test]
    fn test_missing_then_bound() {
        let findings = check("{test: T, do: [{ch: '{{missing}}'}]}");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Undefined variable: missing");
        assert!(check("{test: T, data: {missing: x}, do: [{ch: '{{missing}}'}]}").is_empty());
    }

    #[test]
    fn test_store_must_come_first() {
        let before = check("{test: T, do: [{ch: '$total'}, {store: {.t: total}}]}");
        assert_eq!(before.len(), 1);
        let after = check("{test: T, do: [{store: {.t: total}}, {ch: '$total'}]}");
        assert!(after.is_empty());
    }

    #[test]
    fn test_branch_stores_do_not_leak() {
        let doc = "{test: T, do: [{if: {cond: x, then: [{store: {.a: a}}, {ch: '{{a}}'}]}}, {ch: '{{a}}'}]}";
        let findings = check(doc);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, "do[1]");
    }

    #[test]
    fn test_loop_binding_and_env() {
        let doc = "{test: T, do: [{loop: {over: .row, as: row, do: [{h: '{{row}}'}]}}, {t: '${ENV:PASSWORD}'}]}";
        assert!(check(doc).is_empty());
    }

    #[test]
    fn test_scripts_ignore_sigils() {
        assert!(check("{test: T, do: [{js: \"$('.x').remove()\"}]}").is_empty());
        assert_eq!(check("{test: T, do: [{js: 'return {{n}}'}]}").len(), 1);
    }

    #[test]
    fn test_setup_stores_are_visible_in_main() {
        let doc = "{test: T, setup: [{store: {'#id': id}}], do: [{ch: '{{id}}'}]}";
        assert!(check(doc).is_empty());
    }
}
