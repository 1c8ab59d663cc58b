//! The pipeline as a library: loading, discovery, settings and failures.

mod common;

use pretty_assertions::assert_eq;
use stepwise::config::Settings;
use stepwise::convert::Dialect;
use stepwise::engine::Pipeline;
use stepwise::ErrorType;

#[test]
fn load_reports_dialect_and_lines() {
    let loaded = common::pipeline()
        .load("login.yaml", &common::fixture("login.yaml"))
        .unwrap();
    assert_eq!(loaded.dialect, Dialect::Terse);
    assert!(loaded.notices.is_empty());
    let lines: Vec<_> = loaded.definition.main.iter().map(|a| a.line).collect();
    assert_eq!(lines, vec![Some(9), Some(10), Some(11), Some(12)]);
    assert_eq!(loaded.definition.setup[0].line, Some(7));
}

#[test]
fn converted_input_has_no_lines() {
    let loaded = common::pipeline()
        .load("search.yaml", &common::fixture("search_descriptive.yaml"))
        .unwrap();
    assert_eq!(loaded.dialect, Dialect::Descriptive);
    assert!(loaded.definition.main.iter().all(|a| a.line.is_none()));
}

#[test]
fn validation_failure_returns_findings_not_a_result() {
    let run = common::pipeline()
        .run("missing.yaml", &common::fixture("missing_variable.yaml"))
        .unwrap();
    assert!(!run.report.passed);
    assert!(run.compiled.is_none());
    assert_eq!(run.report.errors[0].path, "do[0]");
    assert_eq!(run.report.errors[0].line, Some(3));

    let err = run.into_result().unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Validation);
    assert!(err.message().contains("1 error(s)"));
}

#[test]
fn undetectable_mappings_get_structural_findings() {
    for text in ["{}", "setup: [{c: A}]", "description: x"] {
        let run = common::pipeline().run("t.yaml", text).unwrap();
        assert_eq!(run.loaded.dialect, Dialect::Terse, "{}", text);
        assert_eq!(run.loaded.notices.len(), 1, "{}", text);
        assert!(run.compiled.is_none());
        let paths: Vec<_> = run.report.errors.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["test", "do"], "{}", text);
        assert!(run
            .report
            .errors
            .iter()
            .all(|f| f.rule == "required-fields" && f.example.is_some()));
    }
}

#[test]
fn mixed_indicators_are_read_as_terse_with_a_notice() {
    let run = common::pipeline()
        .run("t.yaml", "test: A\nname: B\ndo:\n  - c: Go\n")
        .unwrap();
    assert!(run.loaded.notices[0].contains("Mixed dialect indicators"));
    assert_eq!(run.loaded.definition.name, "A");
    assert_eq!(run.loaded.definition.main[0].line, Some(4));
    assert!(run.report.passed, "{:#?}", run.report.errors);
}

#[test]
fn non_mapping_roots_still_fail() {
    let err = common::pipeline().run("t.yaml", "- c: Go\n").unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Convert);
}

#[test]
fn parse_errors_carry_a_line() {
    let err = common::pipeline()
        .load("unparseable.yaml", &common::fixture("unparseable.yaml"))
        .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Parse);
    assert!(err.line().is_some());
}

#[test]
fn compile_unchecked_skips_validation() {
    let text = common::fixture("missing_variable.yaml");
    let result = common::pipeline().compile_unchecked("missing.yaml", &text).unwrap();
    assert_eq!(result.steps[0].args, vec!["exists", "Hello {{missing}}"]);
}

#[test]
fn settings_file_drives_the_compiler() {
    let settings = Settings::load(Some(&common::fixture_path("settings.toml"))).unwrap();
    assert!(!settings.compiler.clear_before_write);

    let pipeline = Pipeline::new(settings);
    let result = pipeline
        .compile_source("t.yaml", "{test: T, nav: /cart, do: [{t: {'#q': x}}, {nav: /done}, {ch: Done}]}")
        .unwrap();
    assert_eq!(result.starting_url.as_deref(), Some("https://shop.example.com/cart"));
    assert_eq!(result.step_count(), 3);
    assert_eq!(result.steps[1].args, vec!["to", "https://shop.example.com/done"]);
}

#[test]
fn definition_base_overrides_configured_base() {
    let settings = Settings::load(Some(&common::fixture_path("settings.toml"))).unwrap();
    let result = Pipeline::new(settings)
        .compile_source("t.yaml", "{test: T, base: 'http://localhost:8080', do: [{nav: /a}, {ch: A}]}")
        .unwrap();
    assert_eq!(result.steps[0].args, vec!["to", "http://localhost:8080/a"]);
}

#[test]
fn unknown_settings_are_rejected() {
    let err = Settings::load(Some(&common::fixture_path("bad_settings.toml"))).unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Config);
}

#[test]
fn discovery_walks_directories_in_order() {
    let files = Pipeline::discover(&[common::fixture_path("")]).unwrap();
    let names: Vec<_> = files
        .iter()
        .filter_map(|p| p.file_name())
        .filter_map(|n| n.to_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "checkout_extended.yaml",
            "conditional.yaml",
            "invalid_action.yaml",
            "login.yaml",
            "missing_variable.yaml",
            "search_descriptive.yaml",
            "unparseable.yaml",
        ]
    );
}

#[test]
fn discovery_rejects_missing_paths() {
    let err = Pipeline::discover(&[common::fixture_path("nope")]).unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Io);
}
