//! Definition model for Stepwise test definitions.
//!
//! A [`TestDefinition`] is built once by the normalizer from a canonical
//! [`Value`] tree and is never mutated afterwards. Actions stay in their
//! canonical form as [`ActionSpec`]s; the typed [`Action`] sum type is obtained
//! through `Action::try_from`, which is the only place the "exactly one
//! operation" rule is decided.

// ============================================================================
// IMPORTS
// ============================================================================

use serde::Serialize;

use crate::syntax::SourceMap;
use crate::value::{Map, Value};

pub mod action;
pub mod resolve;

pub use action::{
    Action, ClickKind, Comparison, CookieCommand, DialogResponse, MouseCommand, Op, ScrollTarget,
    SelectChoice, TabDirection, WaitFor, WindowCommand,
};
pub use resolve::ShapeError;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// The three ordered action lists of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Setup,
    Main,
    Teardown,
}

impl Section {
    /// Compilation order.
    pub const ALL: [Section; 3] = [Section::Setup, Section::Main, Section::Teardown];

    /// Key of the section in the terse dialect.
    pub fn key(self) -> &'static str {
        match self {
            Section::Setup => "setup",
            Section::Main => "do",
            Section::Teardown => "teardown",
        }
    }

    /// Dialect-neutral name, used by boundary markers.
    pub fn label(self) -> &'static str {
        match self {
            Section::Setup => "setup",
            Section::Main => "main",
            Section::Teardown => "teardown",
        }
    }

    pub fn from_label(label: &str) -> Option<Section> {
        match label {
            "setup" => Some(Section::Setup),
            "main" | "do" | "steps" => Some(Section::Main),
            "teardown" => Some(Section::Teardown),
            _ => None,
        }
    }
}

/// One action as written, in canonical form, with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpec {
    pub body: Value,
    /// Field path such as `do[2]` or `do[2].if.then[0]`.
    pub path: String,
    /// 1-based source line, when known.
    pub line: Option<usize>,
}

impl ActionSpec {
    pub fn new(body: Value, path: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            body,
            path: path.into(),
            line,
        }
    }

    /// Keys that name no operation.
    pub fn unknown_keys(&self) -> Vec<&str> {
        self.keys().filter(|k| Op::from_key(k).is_none()).collect()
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        self.body
            .as_map()
            .into_iter()
            .flat_map(|m| m.keys().map(String::as_str))
    }

    pub fn resolve(&self) -> Result<Action, ShapeError> {
        Action::try_from(self)
    }
}

/// Execution hints carried by the terse `config` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<String>,
}

impl RunConfig {
    pub fn is_empty(&self) -> bool {
        self == &RunConfig::default()
    }
}

/// A top-level field whose value had an unusable shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNote {
    pub field: String,
    pub expected: &'static str,
    pub found: &'static str,
}

/// A normalized test definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TestDefinition {
    pub name: String,
    /// False when `name` holds the default because the source had none.
    pub name_given: bool,
    pub description: Option<String>,
    /// Starting navigation target.
    pub nav: Option<String>,
    /// Base path override for relative navigation.
    pub base: Option<String>,
    pub config: RunConfig,
    pub bindings: Map,
    pub setup: Vec<ActionSpec>,
    pub main: Vec<ActionSpec>,
    pub teardown: Vec<ActionSpec>,
    pub notes: Vec<FieldNote>,
}

impl TestDefinition {
    pub const DEFAULT_NAME: &'static str = "Unnamed Test";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_given: true,
            description: None,
            nav: None,
            base: None,
            config: RunConfig::default(),
            bindings: Map::new(),
            setup: Vec::new(),
            main: Vec::new(),
            teardown: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn section(&self, section: Section) -> &[ActionSpec] {
        match section {
            Section::Setup => &self.setup,
            Section::Main => &self.main,
            Section::Teardown => &self.teardown,
        }
    }

    pub fn section_mut(&mut self, section: Section) -> &mut Vec<ActionSpec> {
        match section {
            Section::Setup => &mut self.setup,
            Section::Main => &mut self.main,
            Section::Teardown => &mut self.teardown,
        }
    }

    /// Sections in compilation order.
    pub fn sections(&self) -> impl Iterator<Item = (Section, &[ActionSpec])> {
        Section::ALL.into_iter().map(move |s| (s, self.section(s)))
    }

    pub fn action_count(&self) -> usize {
        self.setup.len() + self.main.len() + self.teardown.len()
    }

    /// Attaches best-effort source lines to top-level actions.
    pub fn with_lines(mut self, lines: &SourceMap) -> Self {
        for section in Section::ALL {
            for (index, spec) in self.section_mut(section).iter_mut().enumerate() {
                spec.line = lines.item_line(section.key(), index);
            }
        }
        self
    }
}
