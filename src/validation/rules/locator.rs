//! Rule: Locator Hygiene
//!
//! Warns about unbalanced quotes and characters that rarely belong in a CSS
//! selector or visible text. Locators built from placeholders are skipped
//! because their final text is unknown.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::TestDefinition;
use crate::placeholder;

use super::super::{Finding, ValidationRule};
use super::walk_definition;

static SAFE_LOCATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[#.\[\]\w\-:\s*>+~="'(),@/!?&%|^$]+$"#).unwrap());
static UNSAFE_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^#.\[\]\w\-:\s*>+~="'(),@/!?&%|^$]"#).unwrap());

pub struct LocatorRule;

impl ValidationRule for LocatorRule {
    fn id(&self) -> &'static str {
        "selector-format"
    }

    fn description(&self) -> &'static str {
        "Locators have balanced quotes and ordinary characters"
    }

    fn validate(&self, definition: &TestDefinition) -> Vec<Finding> {
        let mut findings = Vec::new();
        walk_definition(definition, &mut |spec, resolved| {
            let Ok(action) = resolved else { return };
            for locator in action.locators() {
                if locator.contains("{{") || !placeholder::references(locator, true).is_empty() {
                    continue;
                }
                let path = format!("{}.{}", spec.path, action.op().key());
                if let Some(fixed) = close_quote(locator) {
                    findings.push(
                        Finding::warning(
                            self.id(),
                            path,
                            format!("Unclosed quote in selector: {}", locator),
                            "Close the quote or remove it",
                        )
                        .with_example(format!("- {}: {}", action.op().key(), fixed))
                        .at_line(spec.line),
                    );
                } else if !SAFE_LOCATOR.is_match(locator) {
                    let cleaned = UNSAFE_CHAR.replace_all(locator, "").trim().to_string();
                    findings.push(
                        Finding::warning(
                            self.id(),
                            path,
                            format!("Selector contains unusual characters: {}", locator),
                            "Use a CSS selector or the element's visible text",
                        )
                        .with_example(format!("- {}: {}", action.op().key(), cleaned))
                        .at_line(spec.line),
                    );
                }
            }
        });
        findings
    }
}

/// The locator with its unbalanced quote closed, if one is unbalanced.
fn close_quote(locator: &str) -> Option<String> {
    for quote in ['"', '\''] {
        if locator.matches(quote).count() % 2 == 1 {
            return Some(format!("{}{}", locator, quote));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;

    fn check(yaml: &str) -> Vec<Finding> {
        let raw = serde_yaml::from_str(yaml).unwrap();
        let def = Normalizer::new().normalize_definition(&raw).unwrap();
        LocatorRule.validate(&def)
    }

    #[test]
    fn test_unclosed_quote() {
        let findings = check(r#"{test: T, do: [{c: "input[name='email]"}]}"#);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.starts_with("Unclosed quote"));
        assert_eq!(
            findings[0].example.as_deref(),
            Some("- c: input[name='email]'")
        );
    }

    #[test]
    fn test_unusual_characters() {
        let findings = check("{test: T, do: [{ch: 'Total ☃ due'}]}");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].example.as_deref(), Some("- ch: Total  due"));
    }

    #[test]
    fn test_ordinary_and_templated_locators_pass() {
        let doc = "{test: T, do: [{c: 'button.primary > span'}, {ch: 'Welcome back, Ann!'}, {c: '#{{row}} ~ td'}]}";
        assert!(check(doc).is_empty());
    }
}
