//! Rule: Structural Completeness
//!
//! The definition needs a name and at least one action in its main list.
//! Top-level fields the normalizer could not use are reported here too.

use crate::ast::{Section, TestDefinition};

use super::super::{Finding, ValidationRule};

pub struct StructureRule;

impl ValidationRule for StructureRule {
    fn id(&self) -> &'static str {
        "required-fields"
    }

    fn description(&self) -> &'static str {
        "A definition has a name and at least one main action"
    }

    fn validate(&self, definition: &TestDefinition) -> Vec<Finding> {
        let mut findings = Vec::new();

        if !definition.name_given {
            findings.push(
                Finding::error(
                    self.id(),
                    "test",
                    "Test name is required",
                    "Add a 'test:' field with a descriptive name",
                )
                .with_example("test: User Login Flow")
                .at_line(Some(1)),
            );
        }

        if definition.main.is_empty() {
            findings.push(
                Finding::error(
                    self.id(),
                    Section::Main.key(),
                    "Test must have at least one action in 'do' section",
                    "Add a 'do:' section with test steps",
                )
                .with_example("do:\n  - nav: /login\n  - c: Submit"),
            );
        }

        for note in &definition.notes {
            findings.push(
                Finding::error(
                    self.id(),
                    note.field.clone(),
                    format!("'{}' must be {}, found {}", note.field, note.expected, note.found),
                    format!("Rewrite '{}' as {}", note.field, note.expected),
                )
                .with_example(field_example(&note.field)),
            );
        }

        findings
    }
}

/// A well-formed value for a top-level field.
fn field_example(field: &str) -> &'static str {
    match field {
        "desc" => "desc: Signs in with a valid account",
        "nav" => "nav: /login",
        "base" => "base: https://staging.example.com",
        "data" => "data:\n  user: ann",
        "config" => "config:\n  timeout: 5000",
        "config.timeout" => "config:\n  timeout: 5s",
        "setup" => "setup:\n  - nav: /logout",
        "teardown" => "teardown:\n  - c: Log out",
        _ => "do:\n  - c: Submit",
    }
}
