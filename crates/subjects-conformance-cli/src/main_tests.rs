// crates/subjects-conformance-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and result rendering.
// Purpose: Ensure flags, locale resolution and verdict lines stay stable.
// Dependencies: subjects-conformance-cli main helpers
// ============================================================================

//! ## Overview
//! Validates flag parsing, locale resolution, event sink selection and the
//! per-scenario lines printed after a run.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use clap::Parser;
use subjects_conformance_cli::i18n::Locale;
use subjects_conformance_core::HarnessEvent;
use subjects_conformance_core::RecordViolation;
use subjects_conformance_core::ScenarioId;
use subjects_conformance_core::ScenarioResult;
use subjects_conformance_core::ScenarioStatus;
use subjects_conformance_core::SchemaReport;
use subjects_conformance_core::SubjectViolation;

use super::Cli;
use super::LangArg;
use super::open_event_sink;
use super::render_result;
use super::resolve_locale;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn result(status: ScenarioStatus, message: Option<&str>) -> ScenarioResult {
    ScenarioResult {
        scenario: ScenarioId::UnauthorizedFetch,
        status,
        message: message.map(str::to_string),
        schema: None,
        duration_ms: 12,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn flags_and_positional_scenarios_parse() {
    let cli = Cli::try_parse_from([
        "subjects-conformance",
        "-i",
        "harness.toml",
        "--report",
        "out",
        "--events",
        "-",
        "ssl",
        "latency_bound",
    ])
    .unwrap();
    assert_eq!(cli.config_path, Some(PathBuf::from("harness.toml")));
    assert_eq!(cli.report, Some(PathBuf::from("out")));
    assert_eq!(cli.events, Some(PathBuf::from("-")));
    assert_eq!(cli.scenarios, vec!["ssl".to_string(), "latency_bound".to_string()]);
    assert!(!cli.list);

    let cli = Cli::try_parse_from(["subjects-conformance", "--config-path", "a.json", "--list"])
        .unwrap();
    assert!(cli.list);
    assert!(cli.scenarios.is_empty());
}

#[test]
fn unknown_language_flag_is_rejected_by_parser() {
    assert!(Cli::try_parse_from(["subjects-conformance", "--lang", "fr"]).is_err());
}

#[test]
fn locale_flag_overrides_environment() {
    assert_eq!(resolve_locale(Some(LangArg::Ca), Some("en")).unwrap(), Locale::Ca);
    assert_eq!(resolve_locale(None, Some("ca_ES")).unwrap(), Locale::Ca);
    assert_eq!(resolve_locale(None, None).unwrap(), Locale::En);
}

#[test]
fn invalid_environment_locale_is_an_error() {
    let err = resolve_locale(None, Some("fr")).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("SUBJECTS_CONFORMANCE_LANG"));
    assert!(message.contains("fr"));
    assert!(message.contains("Expected one of 'en', 'ca'."), "{message}");
}

#[test]
fn event_sink_targets_file_when_given_a_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let sink = open_event_sink(Some(&path)).unwrap();
    sink.record(&HarnessEvent::new("suite_started"));
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("\"suite_started\""));

    assert!(open_event_sink(None).is_ok());
    assert!(open_event_sink(Some(Path::new("-"))).is_ok());
    let missing_dir = dir.path().join("absent").join("events.jsonl");
    assert!(open_event_sink(Some(&missing_dir)).is_err());
}

#[test]
fn plain_results_render_status_and_message() {
    let lines = render_result(&result(ScenarioStatus::Passed, None));
    assert_eq!(lines, vec!["[PASS] unauthorized_fetch (12 ms)".to_string()]);

    let lines = render_result(&result(
        ScenarioStatus::Failed,
        Some("assertion failed: expected status 401 without credentials, got 200"),
    ));
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("[FAIL]"));
    assert!(lines[1].contains("got 200"));
}

#[test]
fn schema_results_render_each_finding() {
    let report = SchemaReport {
        top_level: None,
        violations: vec![RecordViolation {
            index: 3,
            record: serde_json::json!({"id": "XX"}),
            reason: SubjectViolation::MissingKeys,
        }],
        missing_subjects: vec!["MATH".to_string(), "PHYS".to_string()],
    };
    let mut failed = result(ScenarioStatus::Failed, Some("schema error: ..."));
    failed.scenario = ScenarioId::AuthorizedFetch;
    failed.schema = Some(report);
    let lines = render_result(&failed);
    assert_eq!(
        lines,
        vec![
            "[FAIL] authorized_fetch (12 ms)".to_string(),
            "    record 3: missing id, type, or attributes".to_string(),
            "    missing known subjects: MATH, PHYS".to_string(),
        ]
    );
}
