//! Construction of typed actions from canonical action mappings.
//!
//! `Action::try_from(&ActionSpec)` is the single gate between the loosely
//! shaped canonical tree and the typed model. Multi-entry locator mappings
//! are rejected here: a single action carries exactly one locator pair.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::action::*;
use super::ActionSpec;
use crate::value::{Map, Value};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
static RESIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)\s*[xX]\s*(\d+)\s*$").unwrap());
static SIGIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$[A-Za-z_]|\$\{").unwrap());
static COORDINATES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(-?\d+)\s*,\s*(-?\d+)\s*$").unwrap());

/// Why a canonical action could not become a typed [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("Action has no recognized operation")]
    NoOperation { keys: Vec<String> },
    #[error("Action has multiple operations: {}", keys.join(", "))]
    MultipleOperations { keys: Vec<String> },
    #[error("Action must be a mapping, found {found}")]
    NotAMapping { found: &'static str },
    #[error("Invalid '{op}' payload: {reason}")]
    Payload { op: Op, reason: String },
}

impl ShapeError {
    /// True for the zero/multiple operation family.
    pub fn is_operation_count(&self) -> bool {
        !matches!(self, ShapeError::Payload { .. })
    }
}

impl TryFrom<&ActionSpec> for Action {
    type Error = ShapeError;

    fn try_from(spec: &ActionSpec) -> Result<Self, Self::Error> {
        let map = match &spec.body {
            Value::Map(m) => m,
            other => {
                return Err(ShapeError::NotAMapping {
                    found: other.type_name(),
                })
            }
        };
        let ops: Vec<(Op, &Value)> = map
            .iter()
            .filter_map(|(k, v)| Op::from_key(k).map(|op| (op, v)))
            .collect();
        match ops.as_slice() {
            [] => Err(ShapeError::NoOperation {
                keys: map.keys().cloned().collect(),
            }),
            [(op, payload)] => build(*op, payload, spec),
            many => Err(ShapeError::MultipleOperations {
                keys: many.iter().map(|(op, _)| op.key().to_string()).collect(),
            }),
        }
    }
}

// ============================================================================
// PER-OPERATION BUILDERS
// ============================================================================

fn build(op: Op, payload: &Value, spec: &ActionSpec) -> Result<Action, ShapeError> {
    let action = match op {
        Op::Nav => Action::Navigate(text(op, payload)?),
        Op::Scroll => Action::Scroll(scroll(op, payload)?),
        Op::Click => click(op, ClickKind::Single, payload)?,
        Op::DoubleClick => click(op, ClickKind::Double, payload)?,
        Op::RightClick => click(op, ClickKind::Right, payload)?,
        Op::Hover => Action::Hover(text(op, payload)?),
        Op::Write => match payload {
            Value::Map(_) => {
                let (locator, value) = pair(op, payload)?;
                Action::Write {
                    locator: Some(locator),
                    text: scalar(op, value)?,
                }
            }
            _ => Action::Write {
                locator: None,
                text: scalar(op, payload)?,
            },
        },
        Op::Key => Action::Key(text(op, payload)?),
        Op::Select => {
            let (locator, value) = pair(op, payload)?;
            let choice = match value {
                Value::Number(_) => SelectChoice::Index(value.as_u64().ok_or_else(|| {
                    payload_err(op, "an index must be a non-negative integer")
                })?),
                _ => {
                    let text = scalar(op, value)?;
                    match text.parse::<u64>() {
                        Ok(index) => SelectChoice::Index(index),
                        Err(_) => SelectChoice::Option(text),
                    }
                }
            };
            Action::Select { locator, choice }
        }
        Op::Exists => Action::Exists(text(op, payload)?),
        Op::NotExists => Action::NotExists(text(op, payload)?),
        Op::Equals | Op::NotEquals => {
            let (locator, value) = pair(op, payload)?;
            let expected = scalar(op, value)?;
            if op == Op::Equals {
                Action::Equals { locator, expected }
            } else {
                Action::NotEquals { locator, expected }
            }
        }
        Op::Gt | Op::Gte | Op::Lt | Op::Lte => {
            let (locator, value) = pair(op, payload)?;
            let value = scalar(op, value)?;
            if value.trim().parse::<f64>().is_err() && !has_placeholder(&value) {
                return Err(payload_err(op, format!("'{}' is not a number", value)));
            }
            let comparison = match op {
                Op::Gt => Comparison::Greater,
                Op::Gte => Comparison::GreaterOrEqual,
                Op::Lt => Comparison::Less,
                _ => Comparison::LessOrEqual,
            };
            Action::Compare {
                op: comparison,
                locator,
                value,
            }
        }
        Op::Matches => {
            let (locator, value) = pair(op, payload)?;
            let pattern = scalar(op, value)?;
            if !has_placeholder(&pattern) {
                if let Err(e) = Regex::new(&pattern) {
                    return Err(payload_err(op, format!("invalid pattern: {}", e)));
                }
            }
            Action::Matches { locator, pattern }
        }
        Op::Store => {
            let (locator, value) = pair(op, payload)?;
            let variable = scalar(op, value)?;
            if !IDENTIFIER.is_match(&variable) {
                return Err(payload_err(
                    op,
                    format!("'{}' is not a valid variable name", variable),
                ));
            }
            Action::Store { locator, variable }
        }
        Op::Cookie => Action::Cookie(cookie(op, payload)?),
        Op::Wait => Action::Wait(wait(op, payload)?),
        Op::Script => Action::Script(text(op, payload)?),
        Op::Comment => Action::Comment(scalar(op, payload)?),
        Op::Dialog => {
            let response = text(op, payload)?;
            Action::Dialog(match response.trim().to_lowercase().as_str() {
                "accept" | "dismiss" => DialogResponse::Accept,
                "confirm" => DialogResponse::Confirm,
                "cancel" => DialogResponse::Cancel,
                _ => DialogResponse::Prompt(response),
            })
        }
        Op::Window => Action::Window(window(op, payload)?),
        Op::Upload => {
            let (locator, value) = pair(op, payload)?;
            Action::Upload {
                locator,
                url: non_empty(op, scalar(op, value)?)?,
            }
        }
        Op::Mouse => Action::Mouse(mouse(op, payload)?),
        Op::If => {
            let block = block(op, payload)?;
            let condition = required_text(op, block, "cond")?;
            let then = nested(op, block, "then", true, &format!("{}.if.then", spec.path), spec)?;
            let otherwise =
                nested(op, block, "else", false, &format!("{}.if.else", spec.path), spec)?;
            reject_unknown(op, block, &["cond", "then", "else"])?;
            Action::Conditional {
                condition,
                then,
                otherwise,
            }
        }
        Op::Loop => {
            let block = block(op, payload)?;
            let over = match block.get("over") {
                Some(v @ Value::Seq(_)) => v.to_text(),
                Some(v) => non_empty(op, scalar(op, v)?)?,
                None => return Err(payload_err(op, "'over' is required")),
            };
            let binding = match block.get("as") {
                None => None,
                Some(v) => {
                    let name = scalar(op, v)?;
                    if !IDENTIFIER.is_match(&name) {
                        return Err(payload_err(
                            op,
                            format!("'{}' is not a valid variable name", name),
                        ));
                    }
                    Some(name)
                }
            };
            let max = match block.get("max") {
                None => None,
                Some(v) => Some(
                    v.as_u64()
                        .ok_or_else(|| payload_err(op, "'max' must be a non-negative integer"))?,
                ),
            };
            let until = block.get("until").map(|v| scalar(op, v)).transpose()?;
            let body = nested(op, block, "do", true, &format!("{}.loop.do", spec.path), spec)?;
            reject_unknown(op, block, &["over", "as", "do", "max", "until"])?;
            Action::Loop {
                over,
                binding,
                body,
                max,
                until,
            }
        }
    };
    Ok(action)
}

fn click(op: Op, kind: ClickKind, payload: &Value) -> Result<Action, ShapeError> {
    if !matches!(payload, Value::Map(_)) {
        return Ok(Action::Click {
            kind,
            locator: text(op, payload)?,
            position: None,
            store_as: None,
        });
    }
    let (locator, options) = pair(op, payload)?;
    let mut position = None;
    let mut store_as = None;
    match options {
        Value::Null => {}
        Value::String(s) if s.is_empty() => {}
        Value::Map(opts) => {
            for (key, value) in opts {
                match key.as_str() {
                    "pos" => position = Some(non_empty(op, scalar(op, value)?)?),
                    "var" => {
                        let name = scalar(op, value)?;
                        if !IDENTIFIER.is_match(&name) {
                            return Err(payload_err(
                                op,
                                format!("'{}' is not a valid variable name", name),
                            ));
                        }
                        store_as = Some(name);
                    }
                    other => {
                        return Err(payload_err(
                            op,
                            format!("unknown click option '{}' (only 'pos' and 'var')", other),
                        ))
                    }
                }
            }
        }
        other => {
            return Err(payload_err(
                op,
                format!("click options must be a mapping, found {}", other.type_name()),
            ))
        }
    }
    Ok(Action::Click {
        kind,
        locator,
        position,
        store_as,
    })
}

fn scroll(op: Op, payload: &Value) -> Result<ScrollTarget, ShapeError> {
    if let Value::Number(_) = payload {
        let y = payload.to_text().parse::<f64>().unwrap_or_default() as i64;
        return Ok(ScrollTarget::Position { x: 0, y });
    }
    let target = text(op, payload)?;
    Ok(match target.trim() {
        "top" => ScrollTarget::Top,
        "bottom" => ScrollTarget::Bottom,
        trimmed => {
            if let Some((x, y)) = coordinates(trimmed) {
                ScrollTarget::Position { x, y }
            } else if let Ok(y) = trimmed.parse::<i64>() {
                ScrollTarget::Position { x: 0, y }
            } else {
                ScrollTarget::Element(target)
            }
        }
    })
}

fn cookie(op: Op, payload: &Value) -> Result<CookieCommand, ShapeError> {
    match payload {
        Value::String(s) if s.trim() == "clear" => Ok(CookieCommand::ClearAll),
        Value::Map(m) if m.contains_key("remove") => {
            reject_unknown(op, m, &["remove"])?;
            let name = non_empty(op, scalar(op, &m["remove"])?)?;
            Ok(CookieCommand::Remove(name))
        }
        Value::Map(m) if m.contains_key("name") => {
            reject_unknown(op, m, &["name", "value"])?;
            let name = non_empty(op, scalar(op, &m["name"])?)?;
            let value = match m.get("value") {
                Some(v) => scalar(op, v)?,
                None => String::new(),
            };
            Ok(CookieCommand::Set { name, value })
        }
        _ => Err(payload_err(op, format!("expected {}", op.shape()))),
    }
}

fn wait(op: Op, payload: &Value) -> Result<WaitFor, ShapeError> {
    match payload {
        Value::Number(_) => payload
            .as_u64()
            .map(WaitFor::Duration)
            .ok_or_else(|| payload_err(op, "a duration must be a non-negative number")),
        Value::String(_) => Ok(WaitFor::Element {
            locator: text(op, payload)?,
            max_ms: None,
        }),
        Value::Map(m) => {
            let locator = match m.get("for") {
                Some(v) => text(op, v)?,
                None => return Err(payload_err(op, "a wait mapping requires 'for'")),
            };
            let max_ms = match m.get("max") {
                None => None,
                Some(v) => Some(
                    v.as_u64()
                        .ok_or_else(|| payload_err(op, "'max' must be a duration in milliseconds"))?,
                ),
            };
            reject_unknown(op, m, &["for", "max"])?;
            Ok(WaitFor::Element { locator, max_ms })
        }
        other => Err(payload_err(
            op,
            format!("expected {}, found {}", op.shape(), other.type_name()),
        )),
    }
}

fn window(op: Op, payload: &Value) -> Result<WindowCommand, ShapeError> {
    if let Value::Map(m) = payload {
        if let Some(frame) = m.get("frame") {
            reject_unknown(op, m, &["frame"])?;
            return Ok(WindowCommand::Frame(text(op, frame)?));
        }
        return Err(payload_err(op, format!("expected {}", op.shape())));
    }
    let command = text(op, payload)?;
    let lowered = command.trim().to_lowercase();
    match lowered.as_str() {
        "maximize" => Ok(WindowCommand::Maximize),
        "next" => Ok(WindowCommand::SwitchTab(TabDirection::Next)),
        "prev" | "previous" => Ok(WindowCommand::SwitchTab(TabDirection::Previous)),
        "parent-frame" | "parent" => Ok(WindowCommand::ParentFrame),
        _ => match RESIZE.captures(&lowered) {
            Some(caps) => {
                let width = caps[1].parse().map_err(|_| payload_err(op, "width out of range"))?;
                let height = caps[2]
                    .parse()
                    .map_err(|_| payload_err(op, "height out of range"))?;
                Ok(WindowCommand::Resize { width, height })
            }
            None => Err(payload_err(
                op,
                format!("unknown window command '{}'", command),
            )),
        },
    }
}

fn mouse(op: Op, payload: &Value) -> Result<MouseCommand, ShapeError> {
    match payload {
        Value::Map(m) => {
            let action = match m.get("action") {
                Some(v) => text(op, v)?,
                None => return Err(payload_err(op, "a mouse mapping requires 'action'")),
            };
            let target = m.get("target").map(|v| text(op, v)).transpose()?;
            reject_unknown(op, m, &["action", "target"])?;
            Ok(MouseCommand::Action { action, target })
        }
        _ => {
            let command = text(op, payload)?;
            match command.trim() {
                "down" => Ok(MouseCommand::Down),
                "up" => Ok(MouseCommand::Up),
                other => coordinates(other)
                    .map(|(x, y)| MouseCommand::MoveTo { x, y })
                    .ok_or_else(|| {
                        payload_err(op, format!("unknown mouse command '{}'", command))
                    }),
            }
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn payload_err(op: Op, reason: impl Into<String>) -> ShapeError {
    ShapeError::Payload {
        op,
        reason: reason.into(),
    }
}

fn has_placeholder(text: &str) -> bool {
    text.contains("{{") || SIGIL.is_match(text)
}

fn coordinates(text: &str) -> Option<(i64, i64)> {
    let caps = COORDINATES.captures(text)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// Any scalar as text; collections are rejected.
fn scalar(op: Op, value: &Value) -> Result<String, ShapeError> {
    value.scalar_text().ok_or_else(|| {
        payload_err(
            op,
            format!("expected a scalar value, found {}", value.type_name()),
        )
    })
}

fn non_empty(op: Op, text: String) -> Result<String, ShapeError> {
    if text.trim().is_empty() {
        Err(payload_err(op, "value must not be empty"))
    } else {
        Ok(text)
    }
}

/// Non-empty scalar text.
fn text(op: Op, value: &Value) -> Result<String, ShapeError> {
    match value {
        Value::Seq(_) | Value::Map(_) => Err(payload_err(
            op,
            format!("expected {}, found {}", op.shape(), value.type_name()),
        )),
        _ => non_empty(op, scalar(op, value)?),
    }
}

/// The single `locator: value` entry of a mapping payload.
fn pair(op: Op, payload: &Value) -> Result<(String, &Value), ShapeError> {
    let map = match payload {
        Value::Map(m) => m,
        other => {
            return Err(payload_err(
                op,
                format!("expected {}, found {}", op.shape(), other.type_name()),
            ))
        }
    };
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some((locator, value)), None) => Ok((non_empty(op, locator.clone())?, value)),
        (None, _) => Err(payload_err(op, "mapping must contain one locator")),
        (Some(_), Some(_)) => Err(payload_err(
            op,
            format!(
                "mapping must have exactly one locator pair, found {} ({}); split it into one action per pair",
                map.len(),
                map.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
        )),
    }
}

fn block(op: Op, payload: &Value) -> Result<&Map, ShapeError> {
    payload.as_map().ok_or_else(|| {
        payload_err(
            op,
            format!("expected {}, found {}", op.shape(), payload.type_name()),
        )
    })
}

fn required_text(op: Op, block: &Map, key: &str) -> Result<String, ShapeError> {
    match block.get(key) {
        Some(v) => text(op, v),
        None => Err(payload_err(op, format!("'{}' is required", key))),
    }
}

fn reject_unknown(op: Op, block: &Map, allowed: &[&str]) -> Result<(), ShapeError> {
    match block.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(payload_err(
            op,
            format!("unknown field '{}' (allowed: {})", key, allowed.join(", ")),
        )),
        None => Ok(()),
    }
}

fn nested(
    op: Op,
    block: &Map,
    key: &str,
    required: bool,
    path: &str,
    parent: &ActionSpec,
) -> Result<Vec<ActionSpec>, ShapeError> {
    match block.get(key) {
        None | Some(Value::Null) if !required => Ok(Vec::new()),
        None | Some(Value::Null) => Err(payload_err(op, format!("'{}' is required", key))),
        Some(Value::String(s)) if s.is_empty() && !required => Ok(Vec::new()),
        Some(Value::Seq(items)) => Ok(items
            .iter()
            .enumerate()
            .map(|(i, item)| ActionSpec::new(item.clone(), format!("{}[{}]", path, i), parent.line))
            .collect()),
        Some(other) => Err(payload_err(
            op,
            format!("'{}' must be a list of actions, found {}", key, other.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::single;

    fn spec(body: Value) -> ActionSpec {
        ActionSpec::new(body, "do[0]", Some(3))
    }

    fn resolve(yaml: &str) -> Result<Action, ShapeError> {
        let raw: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        let body = crate::normalize::Normalizer::new().normalize(&raw);
        spec(body).resolve()
    }

    #[test]
    fn test_zero_and_many_operations() {
        let err = resolve("{colour: red}").unwrap_err();
        assert_eq!(
            err,
            ShapeError::NoOperation {
                keys: vec!["colour".into()]
            }
        );
        let err = resolve("{c: X, t: {'#y': z}}").unwrap_err();
        assert_eq!(
            err,
            ShapeError::MultipleOperations {
                keys: vec!["c".into(), "t".into()]
            }
        );
        assert!(err.is_operation_count());
    }

    #[test]
    fn test_scalar_action_is_not_a_mapping() {
        let err = spec(Value::from("c: Submit")).resolve().unwrap_err();
        assert_eq!(err, ShapeError::NotAMapping { found: "string" });
    }

    #[test]
    fn test_write_forms() {
        assert_eq!(
            resolve("{t: hello}").unwrap(),
            Action::Write {
                locator: None,
                text: "hello".into()
            }
        );
        assert_eq!(
            resolve("{t: {'#age': 42}}").unwrap(),
            Action::Write {
                locator: Some("#age".into()),
                text: "42".into()
            }
        );
        let err = resolve("{t: {'#a': x, '#b': y}}").unwrap_err();
        assert!(matches!(err, ShapeError::Payload { op: Op::Write, .. }));
    }

    #[test]
    fn test_click_options() {
        assert_eq!(
            resolve("{c: {.item: {pos: first, var: picked}}}").unwrap(),
            Action::Click {
                kind: ClickKind::Single,
                locator: ".item".into(),
                position: Some("first".into()),
                store_as: Some("picked".into()),
            }
        );
        assert!(resolve("{c: {.item: {speed: fast}}}").is_err());
        assert!(matches!(
            resolve("{dc: .row}").unwrap(),
            Action::Click {
                kind: ClickKind::Double,
                ..
            }
        ));
    }

    #[test]
    fn test_wait_forms() {
        assert_eq!(
            resolve("{wait: 1500}").unwrap(),
            Action::Wait(WaitFor::Duration(1500))
        );
        assert_eq!(
            resolve("{wait: {for: .done, max: 3000}}").unwrap(),
            Action::Wait(WaitFor::Element {
                locator: ".done".into(),
                max_ms: Some(3000)
            })
        );
        assert!(resolve("{wait: {max: 3000}}").is_err());
        assert!(resolve("{wait: [1, 2]}").is_err());
    }

    #[test]
    fn test_nested_paths_and_lines() {
        let action = resolve("{if: {cond: .banner, then: [{c: .close}], else: [{note: none}]}}")
            .unwrap();
        match action {
            Action::Conditional {
                condition,
                then,
                otherwise,
            } => {
                assert_eq!(condition, ".banner");
                assert_eq!(then[0].path, "do[0].if.then[0]");
                assert_eq!(otherwise[0].path, "do[0].if.else[0]");
                assert_eq!(then[0].line, Some(3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_misc_payloads() {
        assert_eq!(
            resolve("{scroll: '100, 200'}").unwrap(),
            Action::Scroll(ScrollTarget::Position { x: 100, y: 200 })
        );
        assert_eq!(
            resolve("{window: 1024x768}").unwrap(),
            Action::Window(WindowCommand::Resize {
                width: 1024,
                height: 768
            })
        );
        assert_eq!(
            resolve("{select: {'#size': 2}}").unwrap(),
            Action::Select {
                locator: "#size".into(),
                choice: SelectChoice::Index(2)
            }
        );
        assert!(resolve("{gt: {.count: many}}").is_err());
        assert!(resolve("{match: {.id: '('}}").is_err());
        assert!(resolve("{store: {.id: 'not valid'}}").is_err());
        assert_eq!(
            spec(single("cookie", "clear")).resolve().unwrap(),
            Action::Cookie(CookieCommand::ClearAll)
        );
    }
}
