// Regression tests for the `stepwise` binary: exit codes, stdout/stderr split
// and miette rendering of fatal errors.

mod common;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

fn stepwise() -> Command {
    let mut cmd = Command::cargo_bin("stepwise").unwrap();
    cmd.env_remove("STEPWISE_BASE_URL")
        .env_remove("STEPWISE_CLEAR_BEFORE_WRITE")
        .env_remove("STEPWISE_DEFAULT_TIMEOUT_MS")
        .env_remove("STEPWISE_STRICT");
    cmd
}

#[test]
fn validate_passing_file() {
    stepwise()
        .arg("validate")
        .arg(common::fixture_path("login.yaml"))
        .assert()
        .success()
        .stdout(contains("ok").and(contains("1 file(s) checked, 0 failed")));
}

#[test]
fn validate_directory_reports_each_failure() {
    stepwise()
        .arg("validate")
        .arg(common::fixture_path(""))
        .assert()
        .failure()
        .stdout(
            contains("Undefined variable: missing")
                .and(contains("Action has multiple operations"))
                .and(contains("FAILED")),
        )
        .stderr(contains("stepwise::parse").or(contains("Parse error")));
}

#[test]
fn compile_prints_json() {
    stepwise()
        .arg("compile")
        .arg(common::fixture_path("login.yaml"))
        .assert()
        .success()
        .stdout(
            contains("\"command\": \"step-interact\"")
                .and(contains("\"starting_url\": \"/login\""))
                .and(contains("\"checkpoints\"")),
        );
}

#[test]
fn compile_text_format_and_flags() {
    stepwise()
        .args(["compile", "--format", "text", "--no-clear", "--base-url", "https://qa.example.com"])
        .arg(common::fixture_path("login.yaml"))
        .assert()
        .success()
        .stdout(
            contains("# starting at https://qa.example.com/login")
                .and(contains("Clear #email").not())
                .and(contains("# fingerprint ")),
        );
}

#[test]
fn compile_honours_environment_overrides() {
    stepwise()
        .env("STEPWISE_CLEAR_BEFORE_WRITE", "false")
        .arg("compile")
        .arg(common::fixture_path("login.yaml"))
        .assert()
        .success()
        .stdout(contains("\"clear_before_write\": true").not());
}

#[test]
fn compile_refuses_invalid_definitions() {
    stepwise()
        .arg("compile")
        .arg(common::fixture_path("missing_variable.yaml"))
        .assert()
        .failure()
        .stdout(contains("Undefined variable: missing"))
        .stderr(contains("Validation failed"));
}

#[test]
fn convert_warns_on_stderr_and_writes_stdout() {
    stepwise()
        .args(["convert", "--to", "descriptive"])
        .arg(common::fixture_path("conditional.yaml"))
        .assert()
        .success()
        .stdout(contains("name: Banner").and(contains("IF: Cookie banner")))
        .stderr(contains("note").and(contains("'if'")));
}

#[test]
fn convert_rejects_unknown_dialects() {
    stepwise()
        .args(["convert", "--to", "xml"])
        .arg(common::fixture_path("login.yaml"))
        .assert()
        .failure()
        .stderr(contains("unknown dialect"));
}

#[test]
fn detect_names_the_dialect() {
    stepwise()
        .arg("detect")
        .arg(common::fixture_path("checkout_extended.yaml"))
        .assert()
        .success()
        .stdout(contains("extended (confidence"));
}

#[test]
fn parse_errors_render_with_miette() {
    stepwise()
        .arg("compile")
        .arg(common::fixture_path("unparseable.yaml"))
        .assert()
        .failure()
        .stderr(contains("stepwise::parse").or(contains("help:")));
}

#[test]
fn missing_files_are_io_errors() {
    stepwise()
        .arg("detect")
        .arg(common::fixture_path("absent.yaml"))
        .assert()
        .failure()
        .stderr(contains("Cannot read"));
}

#[test]
fn bad_settings_file_fails_early() {
    stepwise()
        .arg("--config")
        .arg(common::fixture_path("bad_settings.toml"))
        .arg("validate")
        .arg(common::fixture_path("login.yaml"))
        .assert()
        .failure()
        .stderr(contains("Invalid settings"));
}
