//! Stepwise: a pipeline for a terse browser-test definition language.
//!
//! Source text in one of three dialects flows through the [`normalize`]
//! stage, the rule-based [`validation`] pass and the [`compiler`], which emits
//! a flat, positioned command list for an external executor. The [`convert`]
//! module translates between dialects without touching the other stages.

pub use crate::diagnostics::{to_error_source, ErrorContext, ErrorType, Span, StepError};

pub mod ast;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod engine;
pub mod normalize;
pub mod placeholder;
pub mod syntax;
pub mod validation;
pub mod value;
