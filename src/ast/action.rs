//! Typed actions.
//!
//! `Action` holds exactly one operation by construction. The operation
//! catalogue ([`Op`]) maps terse keys to kinds and carries the shape
//! descriptions and examples used in validation feedback.

use serde::Serialize;

use super::ActionSpec;

/// Operation kinds, one per terse action key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Op {
    Nav,
    Scroll,
    Click,
    DoubleClick,
    RightClick,
    Hover,
    Write,
    Key,
    Select,
    Exists,
    NotExists,
    Equals,
    NotEquals,
    Gt,
    Gte,
    Lt,
    Lte,
    Matches,
    Store,
    Cookie,
    Wait,
    Script,
    Comment,
    Dialog,
    Window,
    Upload,
    Mouse,
    If,
    Loop,
}

impl Op {
    pub const ALL: [Op; 29] = [
        Op::Nav,
        Op::Scroll,
        Op::Click,
        Op::DoubleClick,
        Op::RightClick,
        Op::Hover,
        Op::Write,
        Op::Key,
        Op::Select,
        Op::Exists,
        Op::NotExists,
        Op::Equals,
        Op::NotEquals,
        Op::Gt,
        Op::Gte,
        Op::Lt,
        Op::Lte,
        Op::Matches,
        Op::Store,
        Op::Cookie,
        Op::Wait,
        Op::Script,
        Op::Comment,
        Op::Dialog,
        Op::Window,
        Op::Upload,
        Op::Mouse,
        Op::If,
        Op::Loop,
    ];

    /// Terse dialect key.
    pub fn key(self) -> &'static str {
        match self {
            Op::Nav => "nav",
            Op::Scroll => "scroll",
            Op::Click => "c",
            Op::DoubleClick => "dc",
            Op::RightClick => "rc",
            Op::Hover => "h",
            Op::Write => "t",
            Op::Key => "k",
            Op::Select => "select",
            Op::Exists => "ch",
            Op::NotExists => "nch",
            Op::Equals => "eq",
            Op::NotEquals => "neq",
            Op::Gt => "gt",
            Op::Gte => "gte",
            Op::Lt => "lt",
            Op::Lte => "lte",
            Op::Matches => "match",
            Op::Store => "store",
            Op::Cookie => "cookie",
            Op::Wait => "wait",
            Op::Script => "js",
            Op::Comment => "note",
            Op::Dialog => "dialog",
            Op::Window => "window",
            Op::Upload => "upload",
            Op::Mouse => "mouse",
            Op::If => "if",
            Op::Loop => "loop",
        }
    }

    pub fn from_key(key: &str) -> Option<Op> {
        Op::ALL.into_iter().find(|op| op.key() == key)
    }

    /// Expected payload, phrased for a finding message.
    pub fn shape(self) -> &'static str {
        match self {
            Op::Nav => "a URL or path",
            Op::Scroll => "'top', 'bottom', 'x,y', a vertical offset or a locator",
            Op::Click | Op::DoubleClick | Op::RightClick => {
                "a locator, or a single locator mapping with optional 'pos' and 'var'"
            }
            Op::Hover | Op::Exists | Op::NotExists => "a locator",
            Op::Write => "text for the focused field, or a single locator: text pair",
            Op::Key => "a key name",
            Op::Select => "a single locator: option (or index) pair",
            Op::Equals | Op::NotEquals => "a single locator: expected pair",
            Op::Gt | Op::Gte | Op::Lt | Op::Lte => "a single locator: number pair",
            Op::Matches => "a single locator: pattern pair",
            Op::Store => "a single locator: variable pair",
            Op::Cookie => "'clear', a mapping with 'name' and 'value', or a mapping with 'remove'",
            Op::Wait => {
                "a duration in milliseconds, a locator, or a mapping with 'for' and optional 'max'"
            }
            Op::Script => "a script",
            Op::Comment => "text",
            Op::Dialog => "'accept', 'dismiss', 'confirm', 'cancel' or prompt text",
            Op::Window => "'maximize', 'WIDTHxHEIGHT', 'next', 'prev', 'parent-frame' or a mapping with 'frame'",
            Op::Upload => "a single locator: file URL pair",
            Op::Mouse => "'down', 'up', 'x,y', or a mapping with 'action' and optional 'target'",
            Op::If => "a mapping with 'cond', 'then' and optional 'else'",
            Op::Loop => "a mapping with 'over', 'do' and optional 'as', 'max', 'until'",
        }
    }

    /// A corrected one-line example.
    pub fn example(self) -> &'static str {
        match self {
            Op::Nav => "- nav: /login",
            Op::Scroll => "- scroll: bottom",
            Op::Click => "- c: button.submit",
            Op::DoubleClick => "- dc: .file-row",
            Op::RightClick => "- rc: .context-target",
            Op::Hover => "- h: .menu",
            Op::Write => "- t: {\"#email\": user@example.com}",
            Op::Key => "- k: enter",
            Op::Select => "- select: {\"#country\": Canada}",
            Op::Exists => "- ch: Welcome",
            Op::NotExists => "- nch: .error",
            Op::Equals => "- eq: {h1: Dashboard}",
            Op::NotEquals => "- neq: {.status: Failed}",
            Op::Gt => "- gt: {.count: 5}",
            Op::Gte => "- gte: {.count: 5}",
            Op::Lt => "- lt: {.count: 10}",
            Op::Lte => "- lte: {.count: 10}",
            Op::Matches => "- match: {.order-id: \"^ORD-[0-9]+$\"}",
            Op::Store => "- store: {.order-id: orderId}",
            Op::Cookie => "- cookie: {name: session, value: abc}",
            Op::Wait => "- wait: {for: .results, max: 5000}",
            Op::Script => "- js: window.scrollTo(0, 0)",
            Op::Comment => "- note: Checkout starts here",
            Op::Dialog => "- dialog: accept",
            Op::Window => "- window: 1280x800",
            Op::Upload => "- upload: {\"#file\": https://example.com/a.pdf}",
            Op::Mouse => "- mouse: 100,200",
            Op::If => "- if: {cond: .banner, then: [{c: .close}]}",
            Op::Loop => "- loop: {over: .row, as: row, do: [{h: .row}]}",
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// PAYLOAD TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollTarget {
    Top,
    Bottom,
    Position { x: i64, y: i64 },
    Element(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickKind {
    Single,
    Double,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectChoice {
    Index(u64),
    Option(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieCommand {
    Set { name: String, value: String },
    Remove(String),
    ClearAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitFor {
    Duration(u64),
    Element {
        locator: String,
        max_ms: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogResponse {
    Accept,
    Confirm,
    Cancel,
    Prompt(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabDirection {
    Next,
    Previous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowCommand {
    Maximize,
    Resize { width: u32, height: u32 },
    SwitchTab(TabDirection),
    Frame(String),
    ParentFrame,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MouseCommand {
    Down,
    Up,
    MoveTo { x: i64, y: i64 },
    Action { action: String, target: Option<String> },
}

// ============================================================================
// ACTION
// ============================================================================

/// One step-defining unit. Every variant is exactly one operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate(String),
    Scroll(ScrollTarget),
    Click {
        kind: ClickKind,
        locator: String,
        position: Option<String>,
        store_as: Option<String>,
    },
    Hover(String),
    /// `locator` is `None` for text sent to the focused element.
    Write {
        locator: Option<String>,
        text: String,
    },
    Key(String),
    Select {
        locator: String,
        choice: SelectChoice,
    },
    Exists(String),
    NotExists(String),
    Equals {
        locator: String,
        expected: String,
    },
    NotEquals {
        locator: String,
        expected: String,
    },
    Compare {
        op: Comparison,
        locator: String,
        value: String,
    },
    Matches {
        locator: String,
        pattern: String,
    },
    Store {
        locator: String,
        variable: String,
    },
    Cookie(CookieCommand),
    Wait(WaitFor),
    Script(String),
    Comment(String),
    Dialog(DialogResponse),
    Window(WindowCommand),
    Upload {
        locator: String,
        url: String,
    },
    Mouse(MouseCommand),
    Conditional {
        condition: String,
        then: Vec<ActionSpec>,
        otherwise: Vec<ActionSpec>,
    },
    Loop {
        over: String,
        binding: Option<String>,
        body: Vec<ActionSpec>,
        max: Option<u64>,
        until: Option<String>,
    },
}

impl Action {
    pub fn op(&self) -> Op {
        match self {
            Action::Navigate(_) => Op::Nav,
            Action::Scroll(_) => Op::Scroll,
            Action::Click { kind, .. } => match kind {
                ClickKind::Single => Op::Click,
                ClickKind::Double => Op::DoubleClick,
                ClickKind::Right => Op::RightClick,
            },
            Action::Hover(_) => Op::Hover,
            Action::Write { .. } => Op::Write,
            Action::Key(_) => Op::Key,
            Action::Select { .. } => Op::Select,
            Action::Exists(_) => Op::Exists,
            Action::NotExists(_) => Op::NotExists,
            Action::Equals { .. } => Op::Equals,
            Action::NotEquals { .. } => Op::NotEquals,
            Action::Compare { op, .. } => match op {
                Comparison::Greater => Op::Gt,
                Comparison::GreaterOrEqual => Op::Gte,
                Comparison::Less => Op::Lt,
                Comparison::LessOrEqual => Op::Lte,
            },
            Action::Matches { .. } => Op::Matches,
            Action::Store { .. } => Op::Store,
            Action::Cookie(_) => Op::Cookie,
            Action::Wait(_) => Op::Wait,
            Action::Script(_) => Op::Script,
            Action::Comment(_) => Op::Comment,
            Action::Dialog(_) => Op::Dialog,
            Action::Window(_) => Op::Window,
            Action::Upload { .. } => Op::Upload,
            Action::Mouse(_) => Op::Mouse,
            Action::Conditional { .. } => Op::If,
            Action::Loop { .. } => Op::Loop,
        }
    }

    /// Locators this action targets, for hygiene checks.
    pub fn locators(&self) -> Vec<&str> {
        match self {
            Action::Scroll(ScrollTarget::Element(l))
            | Action::Click { locator: l, .. }
            | Action::Hover(l)
            | Action::Select { locator: l, .. }
            | Action::Exists(l)
            | Action::NotExists(l)
            | Action::Equals { locator: l, .. }
            | Action::NotEquals { locator: l, .. }
            | Action::Compare { locator: l, .. }
            | Action::Matches { locator: l, .. }
            | Action::Store { locator: l, .. }
            | Action::Wait(WaitFor::Element { locator: l, .. })
            | Action::Upload { locator: l, .. }
            | Action::Window(WindowCommand::Frame(l)) => vec![l.as_str()],
            Action::Write {
                locator: Some(l), ..
            } => vec![l.as_str()],
            Action::Mouse(MouseCommand::Action {
                target: Some(t), ..
            }) => vec![t.as_str()],
            _ => Vec::new(),
        }
    }

    /// Every string payload that may carry variable placeholders.
    pub fn texts(&self) -> Vec<&str> {
        let mut out = self.locators();
        match self {
            Action::Navigate(s)
            | Action::Key(s)
            | Action::Script(s)
            | Action::Comment(s)
            | Action::Dialog(DialogResponse::Prompt(s)) => out.push(s),
            Action::Write { text, .. } => out.push(text),
            Action::Select {
                choice: SelectChoice::Option(o),
                ..
            } => out.push(o),
            Action::Equals { expected, .. } | Action::NotEquals { expected, .. } => {
                out.push(expected)
            }
            Action::Compare { value, .. } => out.push(value),
            Action::Matches { pattern, .. } => out.push(pattern),
            Action::Cookie(CookieCommand::Set { name, value }) => {
                out.push(name);
                out.push(value);
            }
            Action::Cookie(CookieCommand::Remove(name)) => out.push(name),
            Action::Upload { url, .. } => out.push(url),
            Action::Conditional { condition, .. } => out.push(condition),
            Action::Loop { over, until, .. } => {
                out.push(over);
                if let Some(u) = until {
                    out.push(u);
                }
            }
            _ => {}
        }
        out
    }
}
