//! Rule: Action Shape
//!
//! Every action populates exactly one operation. Zero or several is one error
//! per action, naming the keys involved. Keys that name no operation next to
//! a valid one are ignored by the compiler and reported as warnings.

use crate::ast::{ActionSpec, Op, ShapeError, TestDefinition};
use crate::value::Value;

use super::super::{Finding, ValidationRule};
use super::walk_definition;

/// Full-word spellings that producers commonly reach for.
const ALIASES: &[(&str, Op)] = &[
    ("navigate", Op::Nav),
    ("goto", Op::Nav),
    ("click", Op::Click),
    ("double_click", Op::DoubleClick),
    ("right_click", Op::RightClick),
    ("hover", Op::Hover),
    ("type", Op::Write),
    ("write", Op::Write),
    ("fill", Op::Write),
    ("key", Op::Key),
    ("press", Op::Key),
    ("check", Op::Exists),
    ("assert", Op::Exists),
    ("exists", Op::Exists),
    ("not_exists", Op::NotExists),
    ("equals", Op::Equals),
    ("not_equals", Op::NotEquals),
    ("sleep", Op::Wait),
    ("script", Op::Script),
    ("execute", Op::Script),
    ("comment", Op::Comment),
    ("condition", Op::If),
    ("foreach", Op::Loop),
];

pub struct ActionShapeRule;

impl ValidationRule for ActionShapeRule {
    fn id(&self) -> &'static str {
        "action-syntax"
    }

    fn description(&self) -> &'static str {
        "Each action populates exactly one operation"
    }

    fn validate(&self, definition: &TestDefinition) -> Vec<Finding> {
        let mut findings = Vec::new();
        walk_definition(definition, &mut |spec, resolved| match resolved {
            Err(ShapeError::NoOperation { keys }) => findings.push(no_operation(self.id(), spec, keys)),
            Err(ShapeError::MultipleOperations { keys }) => {
                findings.push(multiple_operations(self.id(), spec, keys))
            }
            Err(ShapeError::NotAMapping { found }) => findings.push(
                Finding::error(
                    self.id(),
                    spec.path.clone(),
                    format!("Action must be a mapping, found {}", found),
                    "Write each action as a single 'operation: payload' entry",
                )
                .with_example(Op::Click.example())
                .at_line(spec.line),
            ),
            Err(ShapeError::Payload { .. }) => {}
            Ok(_) => {
                for key in spec.unknown_keys() {
                    findings.push(
                        Finding::warning(
                            self.id(),
                            format!("{}.{}", spec.path, key),
                            format!("Unknown key '{}' is ignored", key),
                            format!("Remove '{}' or move it into its own action", key),
                        )
                        .at_line(spec.line),
                    );
                }
            }
        });
        findings
    }
}

fn no_operation(rule: &'static str, spec: &ActionSpec, keys: &[String]) -> Finding {
    let mut message = String::from("Action has no recognized operation");
    if !keys.is_empty() {
        message.push_str(&format!(" (found: {})", keys.join(", ")));
    }
    let suggestion = keys.iter().find_map(|k| suggest(k).map(|op| (k, op)));
    let (fix, example) = match suggestion {
        Some((key, op)) => (
            format!("Did you mean '{}:' instead of '{}:'?", op.key(), key),
            retarget(spec, key, op),
        ),
        None => (
            "Add a valid action like 'c:', 't:', 'nav:', etc.".to_string(),
            Op::Click.example().to_string(),
        ),
    };
    Finding::error(rule, spec.path.clone(), message, fix)
        .with_example(example)
        .at_line(spec.line)
}

fn multiple_operations(rule: &'static str, spec: &ActionSpec, keys: &[String]) -> Finding {
    let example = keys
        .iter()
        .map(|k| {
            let payload = spec.body.get(k).map(Value::to_text).unwrap_or_default();
            format!("- {}: {}", k, payload)
        })
        .collect::<Vec<_>>()
        .join("\n");
    Finding::error(
        rule,
        spec.path.clone(),
        format!("Action has multiple operations: {}", keys.join(", ")),
        "Use only one action type per step",
    )
    .with_example(example)
    .at_line(spec.line)
}

/// The example action with the misspelt key replaced.
fn retarget(spec: &ActionSpec, key: &str, op: Op) -> String {
    match spec.body.get(key) {
        Some(payload) if !payload.to_text().is_empty() => {
            format!("- {}: {}", op.key(), payload.to_text())
        }
        _ => op.example().to_string(),
    }
}

/// Closest operation for an unknown key.
pub(crate) fn suggest(key: &str) -> Option<Op> {
    let lowered = key.trim().to_lowercase();
    if let Some((_, op)) = ALIASES.iter().find(|(alias, _)| *alias == lowered) {
        return Some(*op);
    }
    let candidates = Op::ALL
        .iter()
        .map(|op| (op.key(), *op))
        .chain(ALIASES.iter().copied());
    candidates
        .map(|(name, op)| (strsim::levenshtein(&lowered, name), name, op))
        .filter(|(distance, name, _)| *distance <= 2 && *distance < name.len())
        .min_by_key(|(distance, _, _)| *distance)
        .map(|(_, _, op)| op)
}
