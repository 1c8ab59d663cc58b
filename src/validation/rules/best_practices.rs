//! Rule: Best-Practice Advisories
//!
//! Warnings only: overlong names, navigation not followed by a wait or a
//! check, and values that look like embedded credentials.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::ast::{Action, ActionSpec, TestDefinition};
use crate::placeholder;

use super::super::{Finding, ValidationRule};

const CREDENTIAL_WORDS: &[&str] = &["password", "passwd", "secret", "token", "api_key", "apikey"];

static SECRET_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:sk|pk|rk)_(?:live|test)_[A-Za-z0-9]{8,}|gh[pousr]_[A-Za-z0-9]{20,}|AKIA[0-9A-Z]{16}|xox[abpr]-[A-Za-z0-9-]{10,}|eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*)$")
        .unwrap()
});

pub struct BestPracticesRule {
    max_name_length: usize,
}

impl BestPracticesRule {
    pub fn new(max_name_length: usize) -> Self {
        Self { max_name_length }
    }
}

impl Default for BestPracticesRule {
    fn default() -> Self {
        Self::new(80)
    }
}

impl ValidationRule for BestPracticesRule {
    fn id(&self) -> &'static str {
        "best-practices"
    }

    fn description(&self) -> &'static str {
        "Advisories for names, navigation timing and embedded secrets"
    }

    fn validate(&self, definition: &TestDefinition) -> Vec<Finding> {
        let mut findings = Vec::new();

        let length = definition.name.graphemes(true).count();
        if definition.name_given && length > self.max_name_length {
            findings.push(
                Finding::warning(
                    self.id(),
                    "test",
                    format!("Test name is very long ({} characters)", length),
                    format!("Keep test names under {} characters", self.max_name_length),
                )
                .with_example("test: Checkout applies promo code"),
            );
        }

        for (_, specs) in definition.sections() {
            self.check_navigation(specs, &mut findings);
        }

        for (key, value) in &definition.bindings {
            let Some(text) = value.scalar_text() else { continue };
            if looks_secret(key, &text, false) {
                findings.push(self.credential(
                    format!("data.{}", key),
                    key,
                    format!("{}: ${{ENV:{}}}", key, env_name(key)),
                ));
            }
        }
        for (_, specs) in definition.sections() {
            self.check_writes(specs, &mut findings);
        }

        findings
    }
}

impl BestPracticesRule {
    fn check_navigation(&self, specs: &[ActionSpec], findings: &mut Vec<Finding>) {
        let actions: Vec<_> = specs.iter().map(|s| s.resolve().ok()).collect();
        for (i, action) in actions.iter().enumerate() {
            if !matches!(action, Some(Action::Navigate(_))) {
                continue;
            }
            let settled = match actions.get(i + 1) {
                None => true,
                Some(Some(Action::Wait(_) | Action::Exists(_))) => true,
                Some(_) => false,
            };
            if !settled {
                findings.push(
                    Finding::warning(
                        self.id(),
                        specs[i].path.clone(),
                        "Navigation without wait may cause timing issues",
                        "Add a 'wait:' or 'ch:' right after the navigation",
                    )
                    .with_example(format!(
                        "- nav: {}\n- wait: {{for: body, max: 5000}}",
                        match action {
                            Some(Action::Navigate(url)) => url.as_str(),
                            _ => "/page",
                        }
                    ))
                    .at_line(specs[i].line),
                );
            }
        }
        // Branch and loop bodies are their own sequences.
        for action in actions.into_iter().flatten() {
            match action {
                Action::Conditional {
                    then, otherwise, ..
                } => {
                    self.check_navigation(&then, findings);
                    self.check_navigation(&otherwise, findings);
                }
                Action::Loop { body, .. } => self.check_navigation(&body, findings),
                _ => {}
            }
        }
    }

    /// Typed text that looks like a literal secret, at any nesting depth.
    fn check_writes(&self, specs: &[ActionSpec], findings: &mut Vec<Finding>) {
        for spec in specs {
            match spec.resolve() {
                Ok(Action::Write { locator, text }) => {
                    let name = locator.as_deref().unwrap_or("");
                    if !looks_secret(name, &text, true) {
                        continue;
                    }
                    let (label, example) = match &locator {
                        Some(locator) => (
                            locator.clone(),
                            format!("- t: {{'{}': '${{ENV:{}}}'}}", locator, env_name(locator)),
                        ),
                        None => ("typed text".to_string(), "- t: '${ENV:SECRET}'".to_string()),
                    };
                    let path = format!("{}.t", spec.path);
                    findings.push(self.credential(path, &label, example).at_line(spec.line));
                }
                Ok(Action::Conditional {
                    then, otherwise, ..
                }) => {
                    self.check_writes(&then, findings);
                    self.check_writes(&otherwise, findings);
                }
                Ok(Action::Loop { body, .. }) => self.check_writes(&body, findings),
                _ => {}
            }
        }
    }

    fn credential(&self, path: String, label: &str, example: String) -> Finding {
        Finding::warning(
            self.id(),
            path,
            format!("Possible hardcoded credential in '{}'", label),
            "Use an environment reference instead of a literal secret",
        )
        .with_example(example)
    }
}

/// A secret-looking name paired with a literal value, or a value shaped like
/// a known token. With `value_words`, the value itself may name the secret.
fn looks_secret(name: &str, text: &str, value_words: bool) -> bool {
    if text.is_empty() || !placeholder::references(text, true).is_empty() || text.contains("${ENV:") {
        return false;
    }
    let names_secret = |s: &str| {
        let lowered = s.to_lowercase();
        CREDENTIAL_WORDS.iter().any(|w| lowered.contains(w))
    };
    names_secret(name) || (value_words && names_secret(text)) || SECRET_VALUE.is_match(text.trim())
}

fn env_name(name: &str) -> String {
    let upper: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    upper.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;

    fn check(yaml: &str) -> Vec<Finding> {
        let raw = serde_yaml::from_str(yaml).unwrap();
        let def = Normalizer::new().normalize_definition(&raw).unwrap();
        BestPracticesRule::default().validate(&def)
    }

    #[test]
    fn test_long_name_counts_graphemes() {
        let long = "é".repeat(81);
        let findings = check(&format!("{{test: '{}', do: [{{c: Go}}]}}", long));
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("81"));
        let ok = "é".repeat(80);
        assert!(check(&format!("{{test: '{}', do: [{{c: Go}}]}}", ok)).is_empty());
    }

    #[test]
    fn test_navigation_needs_wait() {
        let findings = check("{test: T, do: [{nav: /a}, {c: Go}, {nav: /b}, {wait: 500}, {nav: /c}]}");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].path, "do[0]");
    }

    #[test]
    fn test_credentials() {
        let findings = check(
            "{test: T, data: {password: hunter2, user: ann, key: sk_live_abcdefgh12}, do: [{t: {'#password': letmein}}]}",
        );
        let paths: Vec<_> = findings.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["data.password", "data.key", "do[0].t"]);
        assert_eq!(
            findings[0].example.as_deref(),
            Some("password: ${ENV:PASSWORD}")
        );
        assert!(check("{test: T, data: {password: '${ENV:PW}'}, do: [{c: Go}]}").is_empty());
    }

    #[test]
    fn test_nested_and_unlocated_writes_are_checked() {
        let findings = check(
            "test: T\ndo:\n  - if:\n      cond: Login form\n      then:\n        - t: {'#pass': 'sk_test_abcdefgh12'}\n  - loop:\n      over: .row\n      do:\n        - t: password123\n  - t: hello\n",
        );
        let paths: Vec<_> = findings.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["do[0].if.then[0].t", "do[1].loop.do[0].t"]);
        assert_eq!(
            findings[1].example.as_deref(),
            Some("- t: '${ENV:SECRET}'")
        );
        assert!(findings[1].message.contains("typed text"));
    }
}
