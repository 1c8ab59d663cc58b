//! Validation Rules
//!
//! Each file in this module contains one validation rule:
//!
//! - `structure.rs` - name present, at least one main action, well-shaped top-level fields
//! - `action_shape.rs` - exactly one operation per action
//! - `operation_shape.rs` - each operation's payload has its expected shape
//! - `locator.rs` - quoting and character hygiene of locators
//! - `variables.rs` - every placeholder resolves to a binding or an earlier store
//! - `best_practices.rs` - advisory warnings

mod action_shape;
mod best_practices;
mod locator;
mod operation_shape;
mod structure;
mod variables;

pub use action_shape::ActionShapeRule;
pub use best_practices::BestPracticesRule;
pub use locator::LocatorRule;
pub use operation_shape::OperationShapeRule;
pub use structure::StructureRule;
pub use variables::VariableRefsRule;

use crate::ast::{Action, ActionSpec, ShapeError, TestDefinition};

/// Visits every action of every section, depth first, in source order.
/// Nested lists are reached only through a parent that resolved.
pub(crate) fn walk_definition(
    definition: &TestDefinition,
    visit: &mut dyn FnMut(&ActionSpec, &Result<Action, ShapeError>),
) {
    for (_, specs) in definition.sections() {
        walk(specs, visit);
    }
}

pub(crate) fn walk(
    specs: &[ActionSpec],
    visit: &mut dyn FnMut(&ActionSpec, &Result<Action, ShapeError>),
) {
    for spec in specs {
        let resolved = spec.resolve();
        visit(spec, &resolved);
        match &resolved {
            Ok(Action::Conditional {
                then, otherwise, ..
            }) => {
                walk(then, visit);
                walk(otherwise, visit);
            }
            Ok(Action::Loop { body, .. }) => walk(body, visit),
            _ => {}
        }
    }
}
