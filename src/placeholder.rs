//! Placeholder grammars shared by the validator and the compiler.
//!
//! Three forms appear in string payloads:
//! - brace style `{{name}}` (inner whitespace allowed)
//! - sigil style `$name`
//! - environment style `${ENV:NAME}`, never resolved here; the executor owns it
//!
//! Sigil style is not recognised inside script payloads, where `$` belongs to
//! the script language.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{ENV:[A-Za-z_][A-Za-z0-9_]*\}|\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Brace,
    Sigil,
}

/// One variable reference found in a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'a> {
    pub name: &'a str,
    pub style: Style,
}

/// Variable references in `text`, in order. Environment references are skipped.
pub fn references(text: &str, sigils: bool) -> Vec<Reference<'_>> {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| reference(&caps, sigils))
        .collect()
}

fn reference<'a>(caps: &Captures<'a>, sigils: bool) -> Option<Reference<'a>> {
    if let Some(name) = caps.get(1) {
        return Some(Reference {
            name: name.as_str(),
            style: Style::Brace,
        });
    }
    match caps.get(2) {
        Some(name) if sigils => Some(Reference {
            name: name.as_str(),
            style: Style::Sigil,
        }),
        _ => None,
    }
}

/// Replaces each reference with `lookup(name)`; `None` keeps the original text.
pub fn substitute<F>(text: &str, sigils: bool, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            let whole = caps.get(0).map_or("", |m| m.as_str()).to_string();
            match reference(caps, sigils) {
                Some(r) => lookup(r.name).unwrap_or(whole),
                None => whole,
            }
        })
        .into_owned()
}
