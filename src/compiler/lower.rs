//! Lowering of typed actions into executor commands.
//!
//! One `Lowering` lives for one compiler invocation. It owns the variable
//! environment and the position counter; nothing here outlives the call.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{trace, warn};

use super::env::VariableEnv;
use super::{CompiledStep, StepOptions};
use crate::ast::{
    Action, ActionSpec, ClickKind, Comparison, CookieCommand, DialogResponse, MouseCommand,
    ScrollTarget, Section, SelectChoice, TabDirection, WaitFor, WindowCommand,
};

static CSS_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[#.\[*]|[>~+\[\]#]|^[a-z][a-z0-9-]*[.#\[:]|^(a|button|input|select|textarea|form|label|img|div|span|p|li|ul|ol|td|tr|th|table|nav|header|footer|main|section|h[1-6])$")
        .unwrap()
});

pub(super) const NAVIGATE: &str = "step-navigate";
pub(super) const INTERACT: &str = "step-interact";
pub(super) const ASSERT: &str = "step-assert";
pub(super) const DATA: &str = "step-data";
pub(super) const WAIT: &str = "step-wait";
pub(super) const MISC: &str = "step-misc";
pub(super) const DIALOG: &str = "step-dialog";
pub(super) const WINDOW: &str = "step-window";
pub(super) const FILE: &str = "step-file";

/// Locator flavour hint for the executor.
pub(super) fn element_type(locator: &str) -> &'static str {
    let trimmed = locator.trim();
    if trimmed.starts_with('/') || trimmed.starts_with("(/") {
        "xpath"
    } else if CSS_HINT.is_match(trimmed) {
        "css"
    } else {
        "text"
    }
}

/// Joins a relative navigation target onto a base path.
pub(super) fn resolve_url(base: Option<&str>, target: &str) -> String {
    match base {
        Some(base) if !base.is_empty() && !target.starts_with("http") => {
            if target.is_empty() {
                base.to_string()
            } else {
                format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    target.trim_start_matches('/')
                )
            }
        }
        _ => target.to_string(),
    }
}

fn canonical_key(key: &str) -> String {
    let mapped = match key.trim().to_lowercase().as_str() {
        "enter" | "return" => "Enter",
        "esc" | "escape" => "Escape",
        "tab" => "Tab",
        "space" => "Space",
        "backspace" => "Backspace",
        "delete" | "del" => "Delete",
        "up" => "ArrowUp",
        "down" => "ArrowDown",
        "left" => "ArrowLeft",
        "right" => "ArrowRight",
        "home" => "Home",
        "end" => "End",
        "pageup" => "PageUp",
        "pagedown" => "PageDown",
        _ => return key.trim().to_string(),
    };
    mapped.to_string()
}

pub(super) struct Lowering<'a> {
    pub env: VariableEnv,
    pub steps: Vec<CompiledStep>,
    /// One entry per action that could not be lowered.
    pub failures: Vec<String>,
    pub section: Section,
    next_position: usize,
    base: Option<&'a str>,
    clear_before_write: bool,
    default_timeout_ms: Option<u64>,
}

impl<'a> Lowering<'a> {
    pub fn new(
        env: VariableEnv,
        start_position: usize,
        base: Option<&'a str>,
        clear_before_write: bool,
        default_timeout_ms: Option<u64>,
    ) -> Self {
        Self {
            env,
            steps: Vec::new(),
            failures: Vec::new(),
            section: Section::Main,
            next_position: start_position,
            base,
            clear_before_write,
            default_timeout_ms,
        }
    }

    pub fn lower_all(&mut self, specs: &[ActionSpec]) {
        for spec in specs {
            self.lower(spec);
        }
    }

    /// Lowers one action. An action that does not hold exactly one valid
    /// operation is recorded as a failure, never dropped silently.
    fn lower(&mut self, spec: &ActionSpec) {
        let action = match spec.resolve() {
            Ok(action) => action,
            Err(err) => {
                warn!(path = %spec.path, error = %err, "rejecting action");
                let mut failure = format!("{}: {}", spec.path, err);
                if let Some(line) = spec.line {
                    failure.push_str(&format!(" (line {})", line));
                }
                self.failures.push(failure);
                return;
            }
        };
        trace!(path = %spec.path, op = %action.op(), "lowering action");
        match &action {
            Action::Navigate(target) => {
                let url = resolve_url(self.base, &self.sub(target));
                let description = format!("Navigate to {}", url);
                self.emit(spec, NAVIGATE, vec!["to".into(), url], description, StepOptions::default());
            }
            Action::Scroll(target) => {
                let (args, description, options) = match target {
                    ScrollTarget::Top => (vec!["top".into()], "Scroll to top".to_string(), StepOptions::default()),
                    ScrollTarget::Bottom => (
                        vec!["bottom".into()],
                        "Scroll to bottom".to_string(),
                        StepOptions::default(),
                    ),
                    ScrollTarget::Position { x, y } => (
                        vec!["position".into(), format!("{},{}", x, y)],
                        format!("Scroll to {},{}", x, y),
                        StepOptions::default(),
                    ),
                    ScrollTarget::Element(locator) => {
                        let locator = self.sub(locator);
                        (
                            vec!["element".into(), locator.clone()],
                            format!("Scroll to {}", locator),
                            StepOptions::for_locator(&locator),
                        )
                    }
                };
                let mut full = vec!["scroll".to_string()];
                full.extend(args);
                self.emit(spec, NAVIGATE, full, description, options);
            }
            Action::Click {
                kind,
                locator,
                position,
                store_as,
            } => {
                let locator = self.sub(locator);
                let (verb, label) = match kind {
                    ClickKind::Single => ("click", "Click"),
                    ClickKind::Double => ("double-click", "Double-click"),
                    ClickKind::Right => ("right-click", "Right-click"),
                };
                let mut options = StepOptions::for_locator(&locator);
                options.click_position = position.clone();
                let at = self.emit(
                    spec,
                    INTERACT,
                    vec![verb.into(), locator.clone()],
                    format!("{} {}", label, locator),
                    options,
                );
                if let Some(name) = store_as {
                    self.env.store(name, at);
                }
            }
            Action::Hover(locator) => {
                let locator = self.sub(locator);
                self.emit(
                    spec,
                    INTERACT,
                    vec!["hover".into(), locator.clone()],
                    format!("Hover over {}", locator),
                    StepOptions::for_locator(&locator),
                );
            }
            Action::Write { locator: None, text } => {
                let text = self.sub(text);
                self.emit(
                    spec,
                    INTERACT,
                    vec!["write".into(), "[focused]".into(), text.clone()],
                    format!("Type: {}", text),
                    StepOptions::default(),
                );
            }
            Action::Write {
                locator: Some(locator),
                text,
            } => {
                let locator = self.sub(locator);
                let text = self.sub(text);
                if self.clear_before_write {
                    let mut options = StepOptions::for_locator(&locator);
                    options.clear_before_write = Some(true);
                    self.emit(
                        spec,
                        INTERACT,
                        vec!["write".into(), locator.clone(), String::new()],
                        format!("Clear {}", locator),
                        options,
                    );
                }
                self.emit(
                    spec,
                    INTERACT,
                    vec!["write".into(), locator.clone(), text.clone()],
                    format!("Type '{}' into {}", text, locator),
                    StepOptions::for_locator(&locator),
                );
            }
            Action::Key(key) => {
                let key = canonical_key(&self.sub(key));
                self.emit(
                    spec,
                    INTERACT,
                    vec!["key".into(), key.clone()],
                    format!("Press {}", key),
                    StepOptions::default(),
                );
            }
            Action::Select { locator, choice } => {
                let locator = self.sub(locator);
                let (args, description) = match choice {
                    SelectChoice::Index(index) => (
                        vec!["select".into(), "index".into(), locator.clone(), index.to_string()],
                        format!("Select index {} in {}", index, locator),
                    ),
                    SelectChoice::Option(option) => {
                        let option = self.sub(option);
                        (
                            vec!["select".into(), "option".into(), locator.clone(), option.clone()],
                            format!("Select '{}' in {}", option, locator),
                        )
                    }
                };
                self.emit(spec, INTERACT, args, description, StepOptions::for_locator(&locator));
            }
            Action::Exists(locator) | Action::NotExists(locator) => {
                let check = if matches!(action, Action::Exists(_)) {
                    "exists"
                } else {
                    "not-exists"
                };
                let locator = self.sub(locator);
                self.emit(
                    spec,
                    ASSERT,
                    vec![check.into(), locator.clone()],
                    format!("Assert {}: {}", check, locator),
                    StepOptions::for_locator(&locator),
                );
            }
            Action::Equals { locator, expected } | Action::NotEquals { locator, expected } => {
                let check = if matches!(action, Action::Equals { .. }) {
                    "equals"
                } else {
                    "not-equals"
                };
                self.assertion(spec, check, &self.sub(locator), &self.sub(expected));
            }
            Action::Compare { op, locator, value } => {
                let check = match op {
                    Comparison::Greater => "greater-than",
                    Comparison::GreaterOrEqual => "greater-than-or-equal",
                    Comparison::Less => "less-than",
                    Comparison::LessOrEqual => "less-than-or-equal",
                };
                self.assertion(spec, check, &self.sub(locator), &self.sub(value));
            }
            Action::Matches { locator, pattern } => {
                self.assertion(spec, "matches", &self.sub(locator), &self.sub(pattern));
            }
            Action::Store { locator, variable } => {
                let locator = self.sub(locator);
                let at = self.emit(
                    spec,
                    DATA,
                    vec!["store".into(), "element-text".into(), locator.clone(), variable.clone()],
                    format!("Store text from {} as {}", locator, variable),
                    StepOptions::for_locator(&locator),
                );
                self.env.store(variable, at);
            }
            Action::Cookie(command) => {
                let (args, description) = match command {
                    CookieCommand::Set { name, value } => {
                        let (name, value) = (self.sub(name), self.sub(value));
                        (
                            vec!["cookie-set".into(), name.clone(), value],
                            format!("Set cookie {}", name),
                        )
                    }
                    CookieCommand::Remove(name) => {
                        let name = self.sub(name);
                        (
                            vec!["cookie-remove".into(), name.clone()],
                            format!("Remove cookie {}", name),
                        )
                    }
                    CookieCommand::ClearAll => (
                        vec!["cookie-clear-all".into()],
                        "Clear all cookies".to_string(),
                    ),
                };
                self.emit(spec, DATA, args, description, StepOptions::default());
            }
            Action::Wait(WaitFor::Duration(ms)) => {
                self.emit(
                    spec,
                    WAIT,
                    vec!["time".into(), ms.to_string()],
                    format!("Wait {}ms", ms),
                    StepOptions::default(),
                );
            }
            Action::Wait(WaitFor::Element { locator, max_ms }) => {
                let locator = self.sub(locator);
                let mut options = StepOptions::for_locator(&locator);
                options.timeout_ms = max_ms.or(self.default_timeout_ms);
                self.emit(
                    spec,
                    WAIT,
                    vec!["element".into(), locator.clone()],
                    format!("Wait for {}", locator),
                    options,
                );
            }
            Action::Script(script) => {
                self.emit(
                    spec,
                    MISC,
                    vec!["execute".into(), self.env.interpolate(script, false)],
                    "Execute JavaScript".to_string(),
                    StepOptions::default(),
                );
            }
            Action::Comment(note) => {
                let note = self.sub(note);
                self.emit(
                    spec,
                    MISC,
                    vec!["comment".into(), note.clone()],
                    format!("Note: {}", note),
                    StepOptions::default(),
                );
            }
            Action::Dialog(response) => {
                let (args, label): (Vec<String>, String) = match response {
                    DialogResponse::Accept => (vec!["dismiss-alert".into()], "accept".into()),
                    DialogResponse::Confirm => (
                        vec!["dismiss-confirm".into(), "--accept".into()],
                        "confirm".into(),
                    ),
                    DialogResponse::Cancel => (
                        vec!["dismiss-confirm".into(), "--reject".into()],
                        "cancel".into(),
                    ),
                    DialogResponse::Prompt(text) => {
                        let text = self.sub(text);
                        (
                            vec!["dismiss-prompt-with-text".into(), text.clone()],
                            format!("prompt '{}'", text),
                        )
                    }
                };
                self.emit(
                    spec,
                    DIALOG,
                    args,
                    format!("Handle dialog: {}", label),
                    StepOptions::default(),
                );
            }
            Action::Window(command) => {
                let (args, description, options): (Vec<String>, String, StepOptions) = match command {
                    WindowCommand::Maximize => (
                        vec!["maximize".into()],
                        "Maximize window".into(),
                        StepOptions::default(),
                    ),
                    WindowCommand::Resize { width, height } => {
                        let size = format!("{}x{}", width, height);
                        (
                            vec!["resize".into(), size.clone()],
                            format!("Resize window to {}", size),
                            StepOptions::default(),
                        )
                    }
                    WindowCommand::SwitchTab(direction) => {
                        let which = match direction {
                            TabDirection::Next => "next",
                            TabDirection::Previous => "prev",
                        };
                        (
                            vec!["switch".into(), "tab".into(), which.into()],
                            format!("Switch to {} tab", which),
                            StepOptions::default(),
                        )
                    }
                    WindowCommand::Frame(locator) => {
                        let locator = self.sub(locator);
                        (
                            vec!["switch".into(), "iframe".into(), locator.clone()],
                            format!("Switch to frame {}", locator),
                            StepOptions::for_locator(&locator),
                        )
                    }
                    WindowCommand::ParentFrame => (
                        vec!["switch".into(), "parent-frame".into()],
                        "Switch to parent frame".into(),
                        StepOptions::default(),
                    ),
                };
                self.emit(spec, WINDOW, args, description, options);
            }
            Action::Upload { locator, url } => {
                let locator = self.sub(locator);
                self.emit(
                    spec,
                    FILE,
                    vec!["upload".into(), locator.clone(), self.sub(url)],
                    format!("Upload file to {}", locator),
                    StepOptions::for_locator(&locator),
                );
            }
            Action::Mouse(command) => {
                let (args, description, options): (Vec<String>, String, StepOptions) = match command {
                    MouseCommand::Down => (vec!["mouse".into(), "down".into()], "Mouse down".into(), StepOptions::default()),
                    MouseCommand::Up => (vec!["mouse".into(), "up".into()], "Mouse up".into(), StepOptions::default()),
                    MouseCommand::MoveTo { x, y } => {
                        let at = format!("{},{}", x, y);
                        (
                            vec!["mouse".into(), "move-to".into(), at.clone()],
                            format!("Move mouse to {}", at),
                            StepOptions::default(),
                        )
                    }
                    MouseCommand::Action { action, target } => match target {
                        Some(target) => {
                            let target = self.sub(target);
                            (
                                vec!["mouse".into(), action.clone(), target.clone()],
                                format!("Mouse {} {}", action, target),
                                StepOptions::for_locator(&target),
                            )
                        }
                        None => (
                            vec!["mouse".into(), action.clone()],
                            format!("Mouse {}", action),
                            StepOptions::default(),
                        ),
                    },
                };
                self.emit(spec, INTERACT, args, description, options);
            }
            Action::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.sub(condition);
                self.emit(
                    spec,
                    MISC,
                    vec!["comment".into(), format!("IF: {}", condition)],
                    format!("Conditional block: {}", condition),
                    StepOptions::default(),
                );
                self.lower_all(then);
                if !otherwise.is_empty() {
                    self.emit(
                        spec,
                        MISC,
                        vec!["comment".into(), "ELSE".into()],
                        "Else branch".to_string(),
                        StepOptions::default(),
                    );
                    self.lower_all(otherwise);
                }
            }
            Action::Loop {
                over,
                binding,
                body,
                max,
                until,
            } => {
                let over = self.sub(over);
                let mut description = format!("Loop over: {}", over);
                if let Some(name) = binding {
                    description.push_str(&format!(" as {}", name));
                }
                if let Some(max) = max {
                    description.push_str(&format!(", at most {} times", max));
                }
                if let Some(until) = until {
                    description.push_str(&format!(", until {}", self.sub(until)));
                }
                let at = self.emit(
                    spec,
                    MISC,
                    vec!["comment".into(), format!("LOOP: {}", over)],
                    description,
                    StepOptions::default(),
                );
                if let Some(name) = binding {
                    self.env.store(name, at);
                }
                self.lower_all(body);
            }
        }
    }

    /// Sigil placeholders stay literal only inside scripts, which call the
    /// environment directly.
    fn sub(&self, text: &str) -> String {
        self.env.interpolate(text, true)
    }

    fn assertion(&mut self, spec: &ActionSpec, check: &str, locator: &str, expected: &str) {
        self.emit(
            spec,
            ASSERT,
            vec![check.into(), locator.to_string(), expected.to_string()],
            format!("Assert {} {}: {}", locator, check, expected),
            StepOptions::for_locator(locator),
        );
    }

    /// Appends one step at the next position and returns that position.
    fn emit(
        &mut self,
        spec: &ActionSpec,
        command: &str,
        args: Vec<String>,
        description: String,
        options: StepOptions,
    ) -> usize {
        let position = self.next_position;
        self.next_position += 1;
        self.steps.push(CompiledStep {
            position,
            command: command.to_string(),
            args,
            description,
            section: self.section,
            line: spec.line,
            options,
        });
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_type_hint() {
        assert_eq!(element_type("#email"), "css");
        assert_eq!(element_type("button.primary"), "css");
        assert_eq!(element_type("input[name=q]"), "css");
        assert_eq!(element_type("button"), "css");
        assert_eq!(element_type("//div[@id='x']"), "xpath");
        assert_eq!(element_type("Sign in"), "text");
        assert_eq!(element_type("Submit"), "text");
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(resolve_url(Some("https://a.io/"), "/login"), "https://a.io/login");
        assert_eq!(resolve_url(Some("https://a.io"), "https://b.io/x"), "https://b.io/x");
        assert_eq!(resolve_url(None, "/login"), "/login");
    }

    #[test]
    fn test_canonical_keys() {
        assert_eq!(canonical_key("ESC"), "Escape");
        assert_eq!(canonical_key("down"), "ArrowDown");
        assert_eq!(canonical_key("Control+A"), "Control+A");
    }
}
