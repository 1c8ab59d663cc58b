//! # Dialect Converter
//!
//! Translates a definition between the terse, descriptive and extended
//! dialects through [`unified::UnifiedTest`]. Runs straight off the parsed
//! document and never involves the validator or the compiler.
//!
//! Constructs the target cannot express (conditionals and loops outside the
//! terse dialect) become comment steps plus a warning, so the output always
//! parses.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::normalize::Normalizer;
use crate::syntax::parse_document;
use crate::value::Value;
use crate::{err_msg, StepError};

pub mod descriptive;
pub mod detect;
pub mod extended;
pub mod terse;
pub mod unified;

pub use detect::{detect_value, Detection};
pub use unified::{UnifiedStep, UnifiedTest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Terse,
    Descriptive,
    Extended,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Dialect::Terse, Dialect::Descriptive, Dialect::Extended];

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Terse => "terse",
            Dialect::Descriptive => "descriptive",
            Dialect::Extended => "extended",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    /// Also accepts the older names `compact` and `simplified`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "terse" | "compact" => Ok(Dialect::Terse),
            "descriptive" | "simplified" => Ok(Dialect::Descriptive),
            "extended" => Ok(Dialect::Extended),
            other => Err(format!(
                "unknown dialect '{}' (expected terse, descriptive or extended)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub source: Dialect,
    pub target: Dialect,
    pub output: String,
    /// Detection warnings first, then conversion warnings, in order.
    pub warnings: Vec<String>,
}

/// Parses `text` and detects its dialect.
pub fn detect(text: &str) -> Result<Detection, StepError> {
    let raw = parse_document("input", text)?;
    detect_value(&Normalizer::preserving_null().normalize(&raw))
}

/// Converts `text` to `target`. Input already in `target` comes back as is.
pub fn convert(text: &str, target: Dialect) -> Result<Conversion, StepError> {
    let raw = parse_document("input", text)?;
    let root = Normalizer::preserving_null().normalize(&raw);
    let detection = detect_value(&root)?;
    let mut warnings = detection.warnings;

    if detection.dialect == target {
        return Ok(Conversion {
            source: target,
            target,
            output: text.to_string(),
            warnings,
        });
    }

    let converted = convert_value(&root, detection.dialect, target, &mut warnings)?;
    let output = serde_yaml::to_string(&converted)
        .map_err(|e| err_msg!(Convert, "Cannot write {} output: {}", target, e))?;
    debug!(
        source = %detection.dialect,
        %target,
        warnings = warnings.len(),
        "converted document"
    );
    Ok(Conversion {
        source: detection.dialect,
        target,
        output,
        warnings,
    })
}

/// Converts a normalized document root between dialects.
pub fn convert_value(
    root: &Value,
    source: Dialect,
    target: Dialect,
    warnings: &mut Vec<String>,
) -> Result<Value, StepError> {
    let map = root.as_map().ok_or_else(|| {
        err_msg!(
            Convert,
            "Document root must be a mapping, found {}",
            root.type_name()
        )
    })?;
    let test = match source {
        Dialect::Terse => terse::read(map, warnings),
        Dialect::Descriptive => descriptive::read(map, warnings),
        Dialect::Extended => extended::read(map, warnings),
    };
    Ok(match target {
        Dialect::Terse => terse::write(&test),
        Dialect::Descriptive => descriptive::write(&test, warnings),
        Dialect::Extended => extended::write(&test, warnings),
    })
}

/// A document brought to the terse tree the normalizer consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct TerseTree {
    pub source: Dialect,
    pub root: Value,
    pub warnings: Vec<String>,
}

///
/// A mapping whose dialect cannot be told is read as terse, with the
/// detection failure as the first warning, so the validator can report what
/// is missing. Non-mapping roots still fail.
pub fn to_terse(root: &Value) -> Result<TerseTree, StepError> {
    let detection = match detect_value(root) {
        Ok(detection) => detection,
        Err(err) if root.as_map().is_some() => {
            debug!(error = %err.message(), "falling back to terse reading");
            return Ok(TerseTree {
                source: Dialect::Terse,
                root: root.clone(),
                warnings: vec![format!("{}; reading the document as terse", err.message())],
            });
        }
        Err(err) => return Err(err),
    };
    let mut warnings = detection.warnings;
    let terse = match detection.dialect {
        Dialect::Terse => root.clone(),
        source => convert_value(root, source, Dialect::Terse, &mut warnings)?,
    };
    Ok(TerseTree {
        source: detection.dialect,
        root: terse,
        warnings,
    })
}
