// crates/subjects-conformance-core/tests/subject_validator.rs
// ============================================================================
// Module: Subject Validator Tests
// Description: Record validation and collection aggregation.
// Purpose: Ensure validation is ordered, total and aggregated.
// ============================================================================

//! ## Overview
//! Pins the record check order and reasons, the collection aggregation
//! rules, and the guarantee that malformed input never aborts the pass.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;
use subjects_conformance_core::SubjectViolation;
use subjects_conformance_core::check_collection;
use subjects_conformance_core::validate;

mod common;
use crate::common::collection;
use crate::common::subject;

fn known(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|code| (*code).to_string()).collect()
}

// ============================================================================
// SECTION: Record Examples
// ============================================================================

#[test]
fn valid_record_passes() {
    let record = json!({
        "id": "CS",
        "type": "subjects",
        "attributes": {"abbreviation": "CS", "title": "Computer Science"}
    });
    assert_eq!(validate(&record), None);
}

#[test]
fn id_abbreviation_mismatch_is_reported() {
    let record = json!({
        "id": "CS",
        "type": "subjects",
        "attributes": {"abbreviation": "ME", "title": "X"}
    });
    assert_eq!(
        validate(&record),
        Some(SubjectViolation::IdMismatch {
            id: "CS".to_string(),
            abbreviation: "ME".to_string(),
        })
    );
}

#[test]
fn missing_id_reports_missing_keys() {
    let record = json!({"type": "subjects", "attributes": {"abbreviation": "CS", "title": "X"}});
    let violation = validate(&record).unwrap();
    assert_eq!(violation, SubjectViolation::MissingKeys);
    assert_eq!(violation.to_string(), "missing id, type, or attributes");
}

#[test]
fn non_objects_are_rejected_first() {
    for candidate in [json!(null), json!([1, 2]), json!("CS"), json!(7)] {
        assert_eq!(
            validate(&candidate).map(|violation| violation.to_string()).as_deref(),
            Some("expected an object")
        );
    }
}

#[test]
fn attribute_checks_follow_the_documented_order() {
    let not_object = json!({"id": "CS", "type": "subjects", "attributes": "CS"});
    assert_eq!(
        validate(&not_object).map(|violation| violation.to_string()).as_deref(),
        Some("expected attributes to be an object")
    );
    let missing_title =
        json!({"id": "CS", "type": "courses", "attributes": {"abbreviation": "CS"}});
    assert_eq!(
        validate(&missing_title).map(|violation| violation.to_string()).as_deref(),
        Some("missing abbreviation or title")
    );
    let empty_title = json!({
        "id": "CS",
        "type": "subjects",
        "attributes": {"abbreviation": "CS", "title": ""}
    });
    assert_eq!(
        validate(&empty_title).map(|violation| violation.to_string()).as_deref(),
        Some("empty title")
    );
}

// ============================================================================
// SECTION: Collection Aggregation
// ============================================================================

#[test]
fn clean_collection_has_no_findings() {
    let body = collection(&["CS", "ME"], Vec::new());
    let report = check_collection(&body, &known(&["CS", "ME"]));
    assert!(report.is_clean(), "{report}");
    assert_eq!(report.to_string(), "collection is valid");
}

#[test]
fn every_invalid_record_and_missing_code_is_reported() {
    let bad_title = json!({
        "id": "EE",
        "type": "subjects",
        "attributes": {"abbreviation": "EE", "title": 3}
    });
    let body = collection(&["CS"], vec![json!("oops"), bad_title]);
    let report = check_collection(&body, &known(&["CS", "ME", "MATH"]));

    assert_eq!(report.top_level, None);
    assert_eq!(report.violations.len(), 2);
    assert_eq!(report.violations[0].index, 1);
    assert_eq!(report.violations[0].reason, SubjectViolation::NotAnObject);
    assert_eq!(report.violations[1].index, 2);
    assert!(matches!(report.violations[1].reason, SubjectViolation::Malformed { .. }));
    assert_eq!(report.missing_subjects, vec!["ME".to_string(), "MATH".to_string()]);
}

#[test]
fn invalid_records_still_count_toward_coverage() {
    let mismatched = json!({
        "id": "ME",
        "type": "subjects",
        "attributes": {"abbreviation": "EE", "title": "X"}
    });
    let body = collection(&["CS"], vec![mismatched]);
    let report = check_collection(&body, &known(&["CS", "ME"]));
    assert_eq!(report.violations.len(), 1);
    assert!(report.missing_subjects.is_empty());
}

#[test]
fn extra_top_level_key_is_reported_alongside_records() {
    let mut body = collection(&["CS"], vec![json!({"id": "ME"})]);
    body["meta"] = json!({"count": 2});
    let report = check_collection(&body, &known(&["CS"]));
    let top_level = report.top_level.clone().unwrap();
    assert!(top_level.contains("[data, links, meta]"), "{top_level}");
    assert_eq!(report.violations.len(), 1);
}

#[test]
fn unusable_data_only_reports_the_shape() {
    let report = check_collection(&json!({"data": {}, "links": {}}), &known(&["CS"]));
    assert!(report.top_level.unwrap().contains("`data` to be an array"));
    assert!(report.violations.is_empty());
    assert!(report.missing_subjects.is_empty());

    let report = check_collection(&json!([subject("CS")]), &known(&["CS"]));
    assert!(report.top_level.unwrap().contains("top level"));
}

#[test]
fn known_codes_are_compared_verbatim() {
    let body = collection(&["MATH", "ME"], Vec::new());
    let report = check_collection(&body, &known(&["MATHME"]));
    assert_eq!(report.missing_subjects, vec!["MATHME".to_string()]);
}

// ============================================================================
// SECTION: Properties
// ============================================================================

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|value| json!(value)),
        "[a-zA-Z]{0,6}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0 .. 4).prop_map(Value::Array),
            prop::collection::btree_map(
                prop_oneof![
                    Just("id".to_string()),
                    Just("type".to_string()),
                    Just("attributes".to_string()),
                    Just("abbreviation".to_string()),
                    Just("title".to_string()),
                    "[a-z]{1,4}",
                ],
                inner,
                0 .. 5,
            )
            .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn valid_records_always_pass(code in "[A-Z]{1,6}", title in ".{1,32}") {
        let record = json!({
            "id": code,
            "type": "subjects",
            "attributes": {"abbreviation": code, "title": title}
        });
        prop_assert_eq!(validate(&record), None);
    }

    #[test]
    fn records_missing_a_required_key_report_missing_keys(
        code in "[A-Z]{1,6}",
        dropped in prop_oneof![Just("id"), Just("type"), Just("attributes")],
    ) {
        let mut record = json!({
            "id": code,
            "type": "subjects",
            "attributes": {"abbreviation": code, "title": "Title"}
        });
        record.as_object_mut().unwrap().remove(dropped);
        prop_assert_eq!(validate(&record), Some(SubjectViolation::MissingKeys));
    }

    #[test]
    fn arbitrary_json_never_panics(candidate in arb_json()) {
        let _ = validate(&candidate);
        let report = check_collection(&json!({"data": [candidate], "links": {}}), &[]);
        prop_assert!(report.violations.len() <= 1);
    }
}
