//! Dialect detection by weighted feature scoring.
//!
//! Each dialect scores its own indicators and is penalised for the others'.
//! Detection fails outright on mixed top-level indicators (`test` with `name`,
//! `do` with `steps`) or when nothing scores.

use std::collections::BTreeSet;

use tracing::debug;

use super::Dialect;
use crate::value::{Map, Value};
use crate::{err_msg, StepError};

/// Below this, a detection is reported with a warning.
pub const MIN_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub dialect: Dialect,
    pub confidence: f64,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Feature {
    Test,
    Do,
    Nav,
    Data,
    CompactActions,
    MajorityCompact,
    Name,
    Steps,
    DescriptiveSteps,
    MajorityDescriptive,
    TypedSteps,
    Infrastructure,
    ExtendedConfig,
}

const DESCRIPTIVE_KEYS: [&str; 5] = ["navigate", "click", "write", "assert", "wait"];

fn features(root: &Map) -> BTreeSet<Feature> {
    let mut found = BTreeSet::new();
    for (key, feature) in [
        ("test", Feature::Test),
        ("do", Feature::Do),
        ("nav", Feature::Nav),
        ("data", Feature::Data),
        ("name", Feature::Name),
        ("steps", Feature::Steps),
        ("infrastructure", Feature::Infrastructure),
    ] {
        if root.contains_key(key) {
            found.insert(feature);
        }
    }

    if let Some(actions) = root.get("do").and_then(Value::as_seq) {
        let compact = actions
            .iter()
            .filter(|a| match a {
                Value::Map(m) => m.keys().any(|k| k.chars().count() <= 4),
                Value::String(_) => true,
                _ => false,
            })
            .count();
        if compact > 0 {
            found.insert(Feature::CompactActions);
        }
        if majority(compact, actions.len()) {
            found.insert(Feature::MajorityCompact);
        }
    }

    if let Some(steps) = root.get("steps").and_then(Value::as_seq) {
        let mut descriptive = 0;
        for map in steps.iter().filter_map(Value::as_map) {
            descriptive += map
                .keys()
                .filter(|k| DESCRIPTIVE_KEYS.contains(&k.as_str()))
                .count();
            if map.contains_key("type") {
                found.insert(Feature::TypedSteps);
            }
        }
        if descriptive > 0 {
            found.insert(Feature::DescriptiveSteps);
        }
        if majority(descriptive, steps.len()) {
            found.insert(Feature::MajorityDescriptive);
        }
    }

    if root
        .get("config")
        .and_then(Value::as_map)
        .is_some_and(|c| c.contains_key("timeout"))
    {
        found.insert(Feature::ExtendedConfig);
    }
    found
}

fn majority(count: usize, total: usize) -> bool {
    total > 0 && count as f64 / total as f64 > 0.8
}

fn score(found: &BTreeSet<Feature>, weights: &[(Feature, f64)]) -> f64 {
    let total: f64 = weights
        .iter()
        .filter(|(f, _)| found.contains(f))
        .map(|(_, w)| w)
        .sum();
    total.clamp(0.0, 1.0)
}

fn scores(found: &BTreeSet<Feature>) -> [(Dialect, f64); 3] {
    use Feature::*;
    [
        (
            Dialect::Terse,
            score(
                found,
                &[
                    (Test, 0.3),
                    (Do, 0.3),
                    (CompactActions, 0.2),
                    (MajorityCompact, 0.1),
                    (Nav, 0.05),
                    (Data, 0.05),
                    (Name, -0.2),
                    (Steps, -0.2),
                    (Infrastructure, -0.3),
                ],
            ),
        ),
        (
            Dialect::Descriptive,
            score(
                found,
                &[
                    (Name, 0.3),
                    (Steps, 0.3),
                    (DescriptiveSteps, 0.2),
                    (MajorityDescriptive, 0.2),
                    (Test, -0.3),
                    (Do, -0.3),
                    (TypedSteps, -0.2),
                    (Infrastructure, -0.1),
                ],
            ),
        ),
        (
            Dialect::Extended,
            score(
                found,
                &[
                    (Name, 0.2),
                    (Steps, 0.2),
                    (Infrastructure, 0.3),
                    (TypedSteps, 0.2),
                    (ExtendedConfig, 0.1),
                    (Test, -0.3),
                    (Do, -0.3),
                    (CompactActions, -0.2),
                    (DescriptiveSteps, -0.1),
                ],
            ),
        ),
    ]
}

/// Detects the dialect of a normalized document root.
pub fn detect_value(root: &Value) -> Result<Detection, StepError> {
    let map = match root {
        Value::Map(m) if !m.is_empty() => m,
        Value::Map(_) | Value::Null => return Err(err_msg!(Convert, "Empty document")),
        other => {
            return Err(err_msg!(
                Convert,
                "Document root must be a mapping, found {}",
                other.type_name()
            ))
        }
    };
    let found = features(map);

    if found.contains(&Feature::Test) && found.contains(&Feature::Name) {
        return Err(mixed("both 'test' and 'name' fields present"));
    }
    if found.contains(&Feature::Do) && found.contains(&Feature::Steps) {
        return Err(mixed("both 'do' and 'steps' fields present"));
    }

    let mut warnings = Vec::new();
    if found.contains(&Feature::CompactActions) && found.contains(&Feature::TypedSteps) {
        warnings.push("Mixed action styles: both terse and extended syntax detected".to_string());
    }

    // Ties keep the earlier dialect.
    let (dialect, confidence) = scores(&found)
        .into_iter()
        .fold((Dialect::Terse, 0.0), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        });
    if confidence <= 0.0 {
        return Err(err_msg!(Convert, "Cannot recognise the dialect of this document")
            .with_help("Terse documents start with 'test:' and 'do:', descriptive and extended ones with 'name:' and 'steps:'"));
    }
    if confidence < MIN_CONFIDENCE {
        warnings.push(format!(
            "Low confidence detection ({:.2}); the dialect may be ambiguous",
            confidence
        ));
    }
    debug!(%dialect, confidence, "detected dialect");
    Ok(Detection {
        dialect,
        confidence,
        warnings,
    })
}

fn mixed(detail: &str) -> StepError {
    err_msg!(Convert, "Mixed dialect indicators: {}", detail)
        .with_help("Use one dialect per document")
}
