//! Handles all user-facing output for the CLI.
//!
//! Findings and compiled steps go to stdout; notices and fatal errors go to
//! stderr so stdout stays machine-readable.

use std::io::Write;
use std::path::Path;

use miette::Report;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::compiler::CompileResult;
use crate::convert::Detection;
use crate::validation::{Finding, Severity, ValidationReport};
use crate::StepError;

// ============================================================================
// VALIDATION OUTPUT
// ============================================================================

/// Prints every finding for one file followed by a status line.
pub fn print_report(path: &Path, report: &ValidationReport) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    for finding in report.findings() {
        print_finding(&mut stdout, finding);
    }
    let (color, status) = if report.passed {
        (Color::Green, "ok")
    } else {
        (Color::Red, "FAILED")
    };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(stdout, "{}", status);
    let _ = stdout.reset();
    let _ = writeln!(
        stdout,
        " {} ({} error(s), {} warning(s))",
        path.display(),
        report.errors.len(),
        report.warnings.len()
    );
}

fn print_finding(out: &mut StandardStream, finding: &Finding) {
    let color = match finding.severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
    };
    let _ = out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(out, "{}", finding.severity);
    let _ = out.reset();
    let rendered = finding.to_string();
    let rest = rendered
        .strip_prefix(finding.severity.to_string().as_str())
        .unwrap_or(&rendered);
    let _ = writeln!(out, "{}", rest);
}

pub fn print_summary(files: usize, failed: usize) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let color = if failed == 0 { Color::Green } else { Color::Red };
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = writeln!(stdout, "{} file(s) checked, {} failed", files, failed);
    let _ = stdout.reset();
}

// ============================================================================
// COMPILE, CONVERT AND DETECT OUTPUT
// ============================================================================

/// One line per step: position, command, args, description.
pub fn print_steps(result: &CompileResult) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = writeln!(stdout, "# {}", result.name);
    if let Some(url) = &result.starting_url {
        let _ = writeln!(stdout, "# starting at {}", url);
    }
    for step in &result.steps {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
        let _ = write!(stdout, "{:>4}", step.position);
        let _ = stdout.reset();
        let _ = writeln!(
            stdout,
            "  {} {}  # {}",
            step.command,
            step.args.join(" "),
            step.description
        );
    }
    let _ = writeln!(stdout, "# fingerprint {}", result.fingerprint());
}

pub fn print_detection(detection: &Detection) {
    println!(
        "{} (confidence {:.2})",
        detection.dialect, detection.confidence
    );
    print_notices(&detection.warnings);
}

/// Detection and conversion warnings, on stderr.
pub fn print_notices(notices: &[String]) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    for notice in notices {
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        let _ = write!(stderr, "note");
        let _ = stderr.reset();
        let _ = writeln!(stderr, ": {}", notice);
    }
}

/// Prints a StepError with full miette diagnostics.
pub fn print_error(error: StepError) {
    let report = Report::new(error);
    eprintln!("{report:?}");
}
