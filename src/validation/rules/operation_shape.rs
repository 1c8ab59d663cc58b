//! Rule: Operation Payload Shape
//!
//! Once an action has a single operation, its payload must match what that
//! operation accepts, e.g. a wait is a duration, a locator, or a mapping with
//! `for` and an optional `max`.

use crate::ast::{ShapeError, TestDefinition};

use super::super::{Finding, ValidationRule};
use super::walk_definition;

pub struct OperationShapeRule;

impl ValidationRule for OperationShapeRule {
    fn id(&self) -> &'static str {
        "operation-format"
    }

    fn description(&self) -> &'static str {
        "Operation payloads have the shape their operation expects"
    }

    fn validate(&self, definition: &TestDefinition) -> Vec<Finding> {
        let mut findings = Vec::new();
        walk_definition(definition, &mut |spec, resolved| {
            if let Err(err @ ShapeError::Payload { op, .. }) = resolved {
                findings.push(
                    Finding::error(
                        self.id(),
                        format!("{}.{}", spec.path, op.key()),
                        err.to_string(),
                        format!("Give '{}' {}", op.key(), op.shape()),
                    )
                    .with_example(op.example())
                    .at_line(spec.line),
                );
            }
        });
        findings
    }
}
