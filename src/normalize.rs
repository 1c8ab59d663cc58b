//! # Normalizer
//!
//! The sole ingestion boundary. Permissive parsing yields mappings whose keys
//! may be integers, booleans or null, tagged nodes, and nulls where text was
//! meant. [`Normalizer::normalize`] folds all of that into the canonical
//! [`Value`] shape; nothing downstream looks at `serde_yaml::Value` again.
//!
//! ## Invariants
//! - `normalize` is total and idempotent.
//! - Mapping order is preserved; when two keys stringify to the same text the
//!   later value wins and keeps the first position.

use serde_yaml::Value as Raw;
use tracing::debug;

use crate::ast::{ActionSpec, FieldNote, RunConfig, Section, TestDefinition};
use crate::value::{Map, Value};
use crate::{err_msg, StepError};

/// Canonicalizes loosely-typed parse trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    /// Keep nulls as `Value::Null` instead of turning them into empty strings.
    pub preserve_null: bool,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preserving_null() -> Self {
        Self {
            preserve_null: true,
        }
    }

    /// Canonical form of any parsed value. Never fails.
    pub fn normalize(&self, raw: &Raw) -> Value {
        match raw {
            Raw::Null => self.null(),
            Raw::Bool(b) => Value::Bool(*b),
            Raw::Number(n) => Value::Number(n.clone()),
            Raw::String(s) => Value::String(s.clone()),
            Raw::Sequence(items) => Value::Seq(items.iter().map(|i| self.normalize(i)).collect()),
            Raw::Mapping(mapping) => {
                let mut out = Map::with_capacity(mapping.len());
                for (k, v) in mapping {
                    out.insert(self.key_text(k), self.normalize(v));
                }
                Value::Map(out)
            }
            Raw::Tagged(tagged) => self.normalize(&tagged.value),
        }
    }

    /// Re-normalizes an already canonical value.
    pub fn renormalize(&self, value: &Value) -> Value {
        self.normalize(&Raw::from(value))
    }

    /// Builds a [`TestDefinition`] from a terse-dialect tree.
    ///
    /// Fails only when the root is not a mapping. Fields of the wrong shape are
    /// recorded as [`FieldNote`]s for the validator instead.
    pub fn normalize_definition(&self, raw: &Raw) -> Result<TestDefinition, StepError> {
        let root = match self.normalize(raw) {
            Value::Map(m) => m,
            other => {
                return Err(err_msg!(
                    Structure,
                    "Definition root must be a mapping, found {}",
                    other.type_name()
                )
                .with_help("Start the document with 'test: <name>' followed by a 'do:' list"))
            }
        };

        let mut def = TestDefinition::new(TestDefinition::DEFAULT_NAME);
        match root.get("test").map(Value::to_text) {
            Some(name) if !name.trim().is_empty() => def.name = name,
            Some(_) => def.name_given = false,
            None => def.name_given = false,
        }
        def.description = text_field(&root, "desc", &mut def.notes);
        def.nav = text_field(&root, "nav", &mut def.notes);
        def.base = text_field(&root, "base", &mut def.notes);
        def.config = run_config(root.get("config"), &mut def.notes);

        match root.get("data") {
            None => {}
            Some(Value::Map(m)) => def.bindings = m.clone(),
            Some(v) if is_blank(v) => {}
            Some(other) => def.notes.push(FieldNote {
                field: "data".into(),
                expected: "a mapping of variable names to values",
                found: other.type_name(),
            }),
        }

        for section in Section::ALL {
            let key = section.key();
            let actions = match root.get(key) {
                None => Vec::new(),
                Some(Value::Seq(items)) => items.clone(),
                Some(v) if is_blank(v) => Vec::new(),
                Some(other) => {
                    def.notes.push(FieldNote {
                        field: key.into(),
                        expected: "a list of actions",
                        found: other.type_name(),
                    });
                    vec![other.clone()]
                }
            };
            *def.section_mut(section) = actions
                .into_iter()
                .enumerate()
                .map(|(i, body)| ActionSpec::new(body, format!("{}[{}]", key, i), None))
                .collect();
        }

        debug!(
            name = %def.name,
            actions = def.action_count(),
            bindings = def.bindings.len(),
            "normalized definition"
        );
        Ok(def)
    }

    /// Looks up a dotted path (`config.timeout`, `do.0.c`) after normalizing.
    pub fn extract_field(&self, raw: &Raw, path: &str) -> Option<Value> {
        let root = self.normalize(raw);
        let mut current = &root;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = match current {
                Value::Map(m) => m.get(segment)?,
                Value::Seq(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    /// Returns a copy of `raw` with `key` set. A non-mapping input yields a
    /// fresh single-entry mapping.
    pub fn set_field(&self, raw: &Raw, key: &str, value: Value) -> Value {
        let mut map = match self.normalize(raw) {
            Value::Map(m) => m,
            _ => Map::new(),
        };
        map.insert(key.to_string(), self.renormalize(&value));
        Value::Map(map)
    }

    /// Structural equality after normalizing both sides.
    pub fn deep_equal(&self, a: &Raw, b: &Raw) -> bool {
        self.normalize(a) == self.normalize(b)
    }

    fn null(&self) -> Value {
        if self.preserve_null {
            Value::Null
        } else {
            Value::String(String::new())
        }
    }

    fn key_text(&self, key: &Raw) -> String {
        match key {
            Raw::Null => "null".to_string(),
            Raw::Bool(b) => b.to_string(),
            Raw::Number(n) => n.to_string(),
            Raw::String(s) => s.clone(),
            Raw::Tagged(tagged) => self.key_text(&tagged.value),
            Raw::Sequence(_) | Raw::Mapping(_) => {
                serde_json::to_string(&self.normalize(key)).unwrap_or_default()
            }
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn text_field(root: &Map, key: &str, notes: &mut Vec<FieldNote>) -> Option<String> {
    match root.get(key)? {
        v if is_blank(v) => None,
        v if v.is_scalar() => v.scalar_text(),
        other => {
            notes.push(FieldNote {
                field: key.into(),
                expected: "text",
                found: other.type_name(),
            });
            None
        }
    }
}

fn run_config(value: Option<&Value>, notes: &mut Vec<FieldNote>) -> RunConfig {
    let map = match value {
        None => return RunConfig::default(),
        Some(v) if is_blank(v) => return RunConfig::default(),
        Some(Value::Map(m)) => m,
        Some(other) => {
            notes.push(FieldNote {
                field: "config".into(),
                expected: "a mapping",
                found: other.type_name(),
            });
            return RunConfig::default();
        }
    };
    let timeout_ms = map.get("timeout").and_then(|v| match v {
        Value::String(s) => parse_duration_ms(s),
        other => other.as_u64(),
    });
    if map.contains_key("timeout") && timeout_ms.is_none() {
        notes.push(FieldNote {
            field: "config.timeout".into(),
            expected: "milliseconds or a duration such as '30s'",
            found: map.get("timeout").map_or("null", Value::type_name),
        });
    }
    RunConfig {
        retry: map.get("retry").and_then(Value::as_u64),
        timeout_ms,
        on_error: map.get("on_error").and_then(Value::scalar_text).filter(|s| !s.is_empty()),
        viewport: map.get("viewport").and_then(Value::scalar_text).filter(|s| !s.is_empty()),
    }
}

/// `1500`, `1500ms`, `30s`, `2m` to milliseconds.
pub fn parse_duration_ms(text: &str) -> Option<u64> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: f64 = number.parse().ok()?;
    let factor = match unit.trim() {
        "" | "ms" => 1.0,
        "s" => 1_000.0,
        "m" => 60_000.0,
        _ => return None,
    };
    Some((number * factor).round() as u64)
}
