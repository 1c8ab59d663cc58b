//! Stepwise source parsing - thin front-end over `serde_yaml`.
//!
//! Accepts YAML and JSON documents (JSON is a YAML subset for the parser).
//! This stage is purely syntactic; shape checks start in the normalizer.

use serde_yaml::Value as Raw;

use crate::diagnostics::{to_error_source, Span};
use crate::{err_ctx, err_msg, StepError};

pub mod source_map;

pub use source_map::SourceMap;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses one whole source buffer.
///
/// Empty or whitespace-only input parses to `Null`. Parse errors carry the
/// parser's line when it reports one, else line 1.
pub fn parse_document(name: &str, text: &str) -> Result<Raw, StepError> {
    if text.trim().is_empty() {
        return Ok(Raw::Null);
    }
    serde_yaml::from_str::<Raw>(text).map_err(|e| convert_parse_error(name, text, e))
}

// ============================================================================
// ERROR CONVERSION
// ============================================================================

fn convert_parse_error(name: &str, text: &str, error: serde_yaml::Error) -> StepError {
    let message = first_sentence(&error.to_string());
    match error.location() {
        Some(location) => {
            let source = to_error_source(name, text);
            let offset = location.index().min(text.len().saturating_sub(1));
            err_ctx!(
                Parse,
                message,
                &source,
                Span::at(offset),
                "Check indentation and quoting around this position"
            )
            .at_line(Some(location.line()))
            .caused_by(error)
        }
        None => err_msg!(Parse, message).at_line(Some(1)).caused_by(error),
    }
}

/// serde_yaml appends " at line X column Y"; the span already carries that.
fn first_sentence(message: &str) -> String {
    match message.find(" at line ") {
        Some(idx) => message[..idx].to_string(),
        None => message.to_string(),
    }
}
