//! Dialect-neutral test and step representation.
//!
//! Every dialect reader produces a [`UnifiedTest`]; every writer consumes one.
//! The verb table below is the single place that knows how an operation is
//! spelled in each dialect.

use crate::ast::Section;
use crate::value::{Map, Value};

/// One operation as spelled by each dialect.
#[derive(Debug, PartialEq, Eq)]
pub struct Verb {
    /// Terse key (`c`, `t`, `ch`, ...).
    pub terse: &'static str,
    /// Descriptive key; also the unified step kind.
    pub word: &'static str,
    /// Extended `type`.
    pub category: &'static str,
    /// Extended `command`.
    pub command: &'static str,
    /// Field holding the paired value in the descriptive `{selector, ...}` form.
    pub field: Option<&'static str>,
    /// A bare scalar payload names an element rather than carrying a value.
    pub scalar_is_target: bool,
}

const fn verb(
    terse: &'static str,
    word: &'static str,
    category: &'static str,
    command: &'static str,
    field: Option<&'static str>,
    scalar_is_target: bool,
) -> Verb {
    Verb {
        terse,
        word,
        category,
        command,
        field,
        scalar_is_target,
    }
}

const COMMENT: Verb = verb("note", "comment", "misc", "comment", None, false);

pub static VERBS: &[Verb] = &[
    verb("nav", "navigate", "navigate", "to", None, true),
    verb("scroll", "scroll", "navigate", "scroll", None, false),
    verb("c", "click", "interact", "click", None, true),
    verb("dc", "double_click", "interact", "double-click", None, true),
    verb("rc", "right_click", "interact", "right-click", None, true),
    verb("h", "hover", "interact", "hover", None, true),
    verb("t", "write", "interact", "write", Some("text"), false),
    verb("k", "key", "interact", "key", None, false),
    verb("select", "select", "interact", "select", Some("option"), false),
    verb("mouse", "mouse", "interact", "mouse", None, false),
    verb("ch", "assert", "assert", "exists", None, true),
    verb("nch", "assert_not", "assert", "not-exists", None, true),
    verb("eq", "assert_equals", "assert", "equals", Some("expected"), false),
    verb("neq", "assert_not_equals", "assert", "not-equals", Some("expected"), false),
    verb("gt", "assert_greater_than", "assert", "greater-than", Some("value"), false),
    verb("gte", "assert_greater_than_or_equal", "assert", "greater-than-or-equal", Some("value"), false),
    verb("lt", "assert_less_than", "assert", "less-than", Some("value"), false),
    verb("lte", "assert_less_than_or_equal", "assert", "less-than-or-equal", Some("value"), false),
    verb("match", "assert_matches", "assert", "matches", Some("pattern"), false),
    verb("store", "store", "data", "store", Some("variable"), false),
    verb("cookie", "cookie", "data", "cookie", None, false),
    verb("wait", "wait", "wait", "wait", None, false),
    verb("js", "execute_js", "misc", "execute", None, false),
    COMMENT,
    verb("dialog", "dialog", "dialog", "handle", None, false),
    verb("window", "window", "window", "window", None, false),
    verb("upload", "upload", "file", "upload", Some("url"), false),
    verb("if", "if", "control", "if", None, false),
    verb("loop", "loop", "control", "loop", None, false),
];

/// Click options that live inside the terse locator mapping.
pub const CLICK_OPTIONS: [&str; 2] = ["pos", "var"];

impl Verb {
    pub fn by_terse(key: &str) -> Option<&'static Verb> {
        VERBS.iter().find(|v| v.terse == key)
    }

    pub fn by_word(word: &str) -> Option<&'static Verb> {
        VERBS.iter().find(|v| v.word == word)
    }

    /// Control flow exists only in the terse dialect.
    pub fn is_control(&self) -> bool {
        self.category == "control"
    }

    pub fn is_click(&self) -> bool {
        matches!(self.terse, "c" | "dc" | "rc")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedStep {
    pub verb: &'static Verb,
    pub target: Option<String>,
    pub value: Option<Value>,
    pub options: Map,
}

impl UnifiedStep {
    pub fn new(verb: &'static Verb) -> Self {
        Self {
            verb,
            target: None,
            value: None,
            options: Map::new(),
        }
    }

    /// An inert comment step.
    pub fn comment(text: impl Into<String>) -> Self {
        let mut step = Self::new(&COMMENT);
        step.value = Some(Value::String(text.into()));
        step
    }

    pub fn kind(&self) -> &'static str {
        self.verb.word
    }

    /// Splits a terse-style payload into target, value and options. Shared by
    /// the terse reader and by descriptive payloads without a `selector`.
    pub fn from_payload(verb: &'static Verb, payload: &Value) -> Self {
        let mut step = Self::new(verb);
        match payload {
            Value::Map(map) if map.len() == 1 && (verb.field.is_some() || verb.is_click()) => {
                if let Some((locator, inner)) = map.iter().next() {
                    step.target = Some(locator.clone());
                    match (verb.is_click(), inner) {
                        (true, Value::Map(opts)) => step.options.extend(opts.clone()),
                        (true, Value::Null) => {}
                        (true, Value::String(s)) if s.is_empty() => {}
                        _ => step.value = Some(inner.clone()),
                    }
                }
            }
            Value::Map(_) | Value::Seq(_) => step.value = Some(payload.clone()),
            scalar => {
                let is_target = if verb.terse == "wait" {
                    scalar.as_u64().is_none()
                } else {
                    verb.scalar_is_target
                };
                match scalar.scalar_text() {
                    Some(text) if is_target => step.target = Some(text),
                    _ => step.value = Some(scalar.clone()),
                }
            }
        }
        step
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifiedTest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub starting_url: Option<String>,
    pub base_url: Option<String>,
    pub variables: Map,
    pub config: Map,
    pub setup: Vec<UnifiedStep>,
    pub steps: Vec<UnifiedStep>,
    pub teardown: Vec<UnifiedStep>,
}

impl UnifiedTest {
    pub fn section_mut(&mut self, section: Section) -> &mut Vec<UnifiedStep> {
        match section {
            Section::Setup => &mut self.setup,
            Section::Main => &mut self.steps,
            Section::Teardown => &mut self.teardown,
        }
    }

    pub fn sections(&self) -> [(Section, &[UnifiedStep]); 3] {
        [
            (Section::Setup, self.setup.as_slice()),
            (Section::Main, self.steps.as_slice()),
            (Section::Teardown, self.teardown.as_slice()),
        ]
    }

    /// Whether flat dialects need boundary markers.
    pub fn needs_markers(&self) -> bool {
        !self.setup.is_empty() || !self.teardown.is_empty()
    }
}

/// Placeholder text for a control-flow step in a dialect without one.
pub fn control_placeholder(step: &UnifiedStep) -> String {
    let payload = step.value.as_ref();
    match step.verb.terse {
        "if" => format!(
            "IF: {}",
            payload
                .and_then(|v| v.get("cond"))
                .map(Value::to_text)
                .unwrap_or_default()
        ),
        _ => format!(
            "LOOP: {}",
            payload
                .and_then(|v| v.get("over"))
                .map(Value::to_text)
                .unwrap_or_default()
        ),
    }
}

/// Reads an optional text field.
pub fn text(map: &Map, key: &str) -> Option<String> {
    map.get(key)
        .filter(|v| v.is_scalar() && !v.is_null())
        .and_then(Value::scalar_text)
        .filter(|s| !s.is_empty())
}

/// Reads an optional mapping field.
pub fn mapping(map: &Map, key: &str) -> Map {
    map.get(key).and_then(Value::as_map).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_terse_operation_has_a_verb() {
        for op in crate::ast::Op::ALL {
            assert!(Verb::by_terse(op.key()).is_some(), "missing verb for {}", op);
        }
    }

    #[test]
    fn test_words_and_commands_are_unique() {
        for (i, a) in VERBS.iter().enumerate() {
            for b in &VERBS[i + 1..] {
                assert_ne!(a.word, b.word);
                assert_ne!((a.category, a.command), (b.category, b.command));
            }
        }
    }

    #[test]
    fn test_payload_split() {
        let write = Verb::by_terse("t").unwrap();
        let mut pair = Map::new();
        pair.insert("#email".into(), Value::from("a@b.c"));
        let step = UnifiedStep::from_payload(write, &Value::Map(pair));
        assert_eq!(step.target.as_deref(), Some("#email"));
        assert_eq!(step.value, Some(Value::from("a@b.c")));

        let wait = Verb::by_terse("wait").unwrap();
        let step = UnifiedStep::from_payload(wait, &Value::from(500u64));
        assert_eq!(step.value, Some(Value::from(500u64)));
        let step = UnifiedStep::from_payload(wait, &Value::from(".spinner"));
        assert_eq!(step.target.as_deref(), Some(".spinner"));
    }
}
