//!
//! ****************************************************************************************
//! ** ERROR CONSTRUCTION RULES FOR Stepwise Error Macros (`err_msg!`, `err_ctx!`)         **
//! ****************************************************************************************
//!
//! # Overview
//!
//! This module defines the unified, `miette`-based diagnostic system for Stepwise. Every
//! fatal failure produced by a pipeline stage (parsing, definition structure, validation,
//! compilation, dialect conversion, configuration, file access) is a [`StepError`].
//! Validation *findings* are plain data (see `validation::Finding`) and only become a
//! `StepError` when a pipeline run is aborted because of them.
//!
//! # Error Construction Macros
//!
//! - **Use `err_msg!` for simple, message-only errors.**
//!   - `err_msg!(Compile, "Unknown key name {}", key)`
//!
//! - **Use `err_ctx!` for errors that point into a source buffer.**
//!   - `err_ctx!(Parse, "Unexpected token", &src, span)`
//!   - `err_ctx!(Parse, "Unexpected token", &src, span, "close the mapping")`
//!
//! # Rules
//!
//! - **Do not construct `ErrorContext` manually unless absolutely necessary.**
//! - **Pass a `Span`, never a raw offset.** `Span { start: pos, end: pos + 1 }`.
//! - **Attach help and line data with the builder methods** `with_help` and `at_line`.
//!
//! ****************************************************************************************

use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode};
use thiserror::Error;

// Type aliases for clarity and brevity
pub type SourceArc = Arc<NamedSource<String>>;
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Byte range into a source buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset + 1,
        }
    }
}

/// Type-safe error classification enum that corresponds to StepError variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    /// Unparseable source text
    Parse,
    /// Source parsed but the root or a section has the wrong shape
    Structure,
    /// Blocking validation findings
    Validation,
    /// Defensive compiler failures for a single action
    Compile,
    /// Dialect detection or conversion failures
    Convert,
    /// Settings file or environment override problems
    Config,
    /// File system access
    Io,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Parse => "parse",
            ErrorType::Structure => "structure",
            ErrorType::Validation => "validation",
            ErrorType::Compile => "compile",
            ErrorType::Convert => "convert",
            ErrorType::Config => "config",
            ErrorType::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimal, composable error context for diagnostics.
#[derive(Debug, Default)]
pub struct ErrorContext {
    /// The source buffer this error points into (if any).
    pub source: Option<SourceArc>,
    /// The primary span for this error (if any).
    pub span: Option<Span>,
    /// An optional help message.
    pub help: Option<String>,
    /// 1-based source line, when only a line is known.
    pub line: Option<usize>,
}

impl ErrorContext {
    /// Returns an empty error context.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a context with both source and span.
    pub fn with_source_and_span(source: SourceArc, span: Span) -> Self {
        Self {
            source: Some(source),
            span: Some(span),
            help: None,
            line: None,
        }
    }
}

/// Unified error type for every Stepwise failure mode.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedCause>,
    },
    #[error("Structure error: {message}")]
    Structure {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedCause>,
    },
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedCause>,
    },
    #[error("Compile error: {message}")]
    Compile {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedCause>,
    },
    #[error("Conversion error: {message}")]
    Convert {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedCause>,
    },
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedCause>,
    },
    #[error("I/O error: {message}")]
    Io {
        message: String,
        ctx: ErrorContext,
        #[source]
        source: Option<BoxedCause>,
    },
}

impl StepError {
    fn parts(&self) -> (&String, &ErrorContext) {
        match self {
            StepError::Parse { message, ctx, .. }
            | StepError::Structure { message, ctx, .. }
            | StepError::Validation { message, ctx, .. }
            | StepError::Compile { message, ctx, .. }
            | StepError::Convert { message, ctx, .. }
            | StepError::Config { message, ctx, .. }
            | StepError::Io { message, ctx, .. } => (message, ctx),
        }
    }

    fn parts_mut(&mut self) -> (&mut ErrorContext, &mut Option<BoxedCause>) {
        match self {
            StepError::Parse { ctx, source, .. }
            | StepError::Structure { ctx, source, .. }
            | StepError::Validation { ctx, source, .. }
            | StepError::Compile { ctx, source, .. }
            | StepError::Convert { ctx, source, .. }
            | StepError::Config { ctx, source, .. }
            | StepError::Io { ctx, source, .. } => (ctx, source),
        }
    }

    /// Returns the type-safe error classification for this error.
    pub fn error_type(&self) -> ErrorType {
        match self {
            StepError::Parse { .. } => ErrorType::Parse,
            StepError::Structure { .. } => ErrorType::Structure,
            StepError::Validation { .. } => ErrorType::Validation,
            StepError::Compile { .. } => ErrorType::Compile,
            StepError::Convert { .. } => ErrorType::Convert,
            StepError::Config { .. } => ErrorType::Config,
            StepError::Io { .. } => ErrorType::Io,
        }
    }

    /// The bare message, without the variant prefix.
    pub fn message(&self) -> &str {
        self.parts().0
    }

    pub fn help_text(&self) -> Option<&str> {
        self.parts().1.help.as_deref()
    }

    pub fn line(&self) -> Option<usize> {
        self.parts().1.line
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.parts_mut().0.help = Some(help.into());
        self
    }

    pub fn at_line(mut self, line: Option<usize>) -> Self {
        if line.is_some() {
            self.parts_mut().0.line = line;
        }
        self
    }

    pub fn caused_by<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        *self.parts_mut().1 = Some(Box::new(cause));
        self
    }
}

impl Diagnostic for StepError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("stepwise::{}", self.error_type())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.parts()
            .1
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.parts()
            .1
            .source
            .as_ref()
            .map(|s| s.as_ref() as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let (message, ctx) = self.parts();
        // A label without a source buffer cannot be rendered.
        ctx.source.as_ref()?;
        let span = ctx.span?;
        let len = if span.end > span.start {
            span.end - span.start
        } else {
            1
        };
        let label = LabeledSpan::new(Some(message.clone()), span.start, len);
        Some(Box::new(std::iter::once(label)))
    }
}

/// Converts a source string into an `Arc<NamedSource<String>>` for use in error contexts.
pub fn to_error_source<S: AsRef<str>>(name: &str, source: S) -> SourceArc {
    Arc::new(NamedSource::new(name, source.as_ref().to_string()))
}

/// Constructs a StepError variant with a formatted message and no context.
#[macro_export]
macro_rules! err_msg {
    // Format string with arguments
    ($variant:ident, $fmt:literal, $($arg:expr),+ $(,)?) => {
        $crate::StepError::$variant {
            message: format!($fmt, $($arg),+),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
    // Message only
    ($variant:ident, $msg:expr) => {
        $crate::StepError::$variant {
            message: format!("{}", $msg),
            ctx: $crate::ErrorContext::none(),
            source: None,
        }
    };
}

/// Constructs a StepError variant pointing at a span of a source buffer.
#[macro_export]
macro_rules! err_ctx {
    // Message, src, span, help
    ($variant:ident, $msg:expr, $src:expr, $span:expr, $help:expr) => {
        $crate::StepError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext {
                source: Some($crate::diagnostics::SourceArc::clone($src)),
                span: Some($span),
                help: Some(format!("{}", $help)),
                line: None,
            },
            source: None,
        }
    };
    // Message, src, span
    ($variant:ident, $msg:expr, $src:expr, $span:expr) => {
        $crate::StepError::$variant {
            message: $msg.to_string(),
            ctx: $crate::ErrorContext::with_source_and_span(
                $crate::diagnostics::SourceArc::clone($src),
                $span,
            ),
            source: None,
        }
    };
}

#[cfg(test)]
mod diagnostics_tests {
    use miette::Report;

    use super::*;

    #[test]
    fn test_labelled_diagnostic_renders_help_and_code() {
        let src = to_error_source("login.yaml", "test: Login\ndo: [\n");
        let err = crate::err_ctx!(Parse, "unclosed sequence", &src, Span::at(16), "close the list");
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("unclosed sequence"));
        assert!(output.contains("close the list"));
        assert!(output.contains("stepwise::parse"));
    }

    #[test]
    fn test_error_chaining() {
        let cause = crate::err_msg!(Parse, "bad indentation");
        let err = crate::err_msg!(Validation, "{} finding(s) block compilation", 2)
            .with_help("fix the findings above")
            .caused_by(cause);
        let output = format!("{:?}", Report::new(err));
        assert!(output.contains("2 finding(s) block compilation"));
        assert!(output.contains("bad indentation"));
        assert!(output.contains("fix the findings above"));
    }

    #[test]
    fn test_builders_keep_line_and_type() {
        let err = crate::err_msg!(Compile, "no operation").at_line(Some(7));
        assert_eq!(err.error_type(), ErrorType::Compile);
        assert_eq!(err.line(), Some(7));
        assert_eq!(err.message(), "no operation");
        let err = err.at_line(None);
        assert_eq!(err.line(), Some(7));
    }
}
