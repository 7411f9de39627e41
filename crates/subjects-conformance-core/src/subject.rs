// crates/subjects-conformance-core/src/subject.rs
// ============================================================================
// Module: Subject Validator
// Description: Structural checks for subject records and collections.
// Purpose: Decide whether the API returned well-formed subject resources.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`validate`] checks one candidate record and returns the first violation
//! in a fixed order (ties are broken by check order, not severity):
//! 1. the candidate is an object,
//! 2. it has `id`, `type` and `attributes`,
//! 3. `attributes` is an object,
//! 4. `attributes` has `abbreviation` and `title`,
//! 5. `type` is `"subjects"`,
//! 6. `id` equals `attributes.abbreviation`,
//! 7. `attributes.title` is non-empty.
//!
//! A value of the wrong JSON kind met along the way (a numeric title, an array
//! id) becomes a [`SubjectViolation::Malformed`] reason; it never aborts the
//! pass, so one malformed record cannot hide problems in the rest of a
//! collection. [`check_collection`] applies the top-level shape check,
//! validates every record, and computes known subject codes that are absent.
//! Pure functions; no I/O.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde::Serializer;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Required value of a record's `type` field.
pub const SUBJECT_TYPE: &str = "subjects";

/// Exact top-level key set of a subject collection.
pub const COLLECTION_KEYS: [&str; 2] = ["data", "links"];

/// Keys every record must carry.
const RECORD_KEYS: [&str; 3] = ["id", "type", "attributes"];

/// Keys every record's `attributes` must carry.
const ATTRIBUTE_KEYS: [&str; 2] = ["abbreviation", "title"];

// ============================================================================
// SECTION: Violations
// ============================================================================

/// Reason a candidate record is not a valid subject.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectViolation {
    /// The candidate is not a JSON object.
    #[error("expected an object")]
    NotAnObject,
    /// One of `id`, `type`, `attributes` is absent.
    #[error("missing id, type, or attributes")]
    MissingKeys,
    /// `attributes` is not a JSON object.
    #[error("expected attributes to be an object")]
    AttributesNotObject,
    /// One of `attributes.abbreviation`, `attributes.title` is absent.
    #[error("missing abbreviation or title")]
    MissingAttributeKeys,
    /// `type` is a string other than `"subjects"`.
    #[error("type mismatch: expected \"subjects\", found {found:?}")]
    TypeMismatch {
        /// Type string the record carried.
        found: String,
    },
    /// `id` differs from `attributes.abbreviation`.
    #[error("id/abbreviation mismatch: id {id:?} does not equal abbreviation {abbreviation:?}")]
    IdMismatch {
        /// Record id.
        id: String,
        /// Record abbreviation.
        abbreviation: String,
    },
    /// `attributes.title` is the empty string.
    #[error("empty title")]
    EmptyTitle,
    /// A field holds a value of the wrong JSON kind.
    #[error("type error: expected `{field}` to be a {expected}, found {found}")]
    Malformed {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Expected JSON kind.
        expected: &'static str,
        /// JSON kind actually found.
        found: &'static str,
    },
}

impl Serialize for SubjectViolation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// SECTION: Record Validation
// ============================================================================

/// Validates one candidate subject record.
///
/// Returns `None` when the record is valid, otherwise the first violation.
#[must_use]
pub fn validate(candidate: &Value) -> Option<SubjectViolation> {
    let Value::Object(record) = candidate else {
        return Some(SubjectViolation::NotAnObject);
    };
    if !has_keys(record, &RECORD_KEYS) {
        return Some(SubjectViolation::MissingKeys);
    }
    let Some(Value::Object(attributes)) = record.get("attributes") else {
        return Some(SubjectViolation::AttributesNotObject);
    };
    if !has_keys(attributes, &ATTRIBUTE_KEYS) {
        return Some(SubjectViolation::MissingAttributeKeys);
    }

    let kind = match string_field(record, "type", "type") {
        Ok(kind) => kind,
        Err(violation) => return Some(violation),
    };
    if kind != SUBJECT_TYPE {
        return Some(SubjectViolation::TypeMismatch {
            found: kind.to_string(),
        });
    }

    let id = match string_field(record, "id", "id") {
        Ok(id) => id,
        Err(violation) => return Some(violation),
    };
    let abbreviation =
        match string_field(attributes, "abbreviation", "attributes.abbreviation") {
            Ok(abbreviation) => abbreviation,
            Err(violation) => return Some(violation),
        };
    if id != abbreviation {
        return Some(SubjectViolation::IdMismatch {
            id: id.to_string(),
            abbreviation: abbreviation.to_string(),
        });
    }

    match string_field(attributes, "title", "attributes.title") {
        Ok("") => Some(SubjectViolation::EmptyTitle),
        Ok(_) => None,
        Err(violation) => Some(violation),
    }
}

/// Returns true when every key is present.
fn has_keys(map: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().all(|key| map.contains_key(*key))
}

/// Reads a present field that must be a string.
fn string_field<'a>(
    map: &'a Map<String, Value>,
    key: &str,
    field: &'static str,
) -> Result<&'a str, SubjectViolation> {
    match map.get(key) {
        Some(Value::String(value)) => Ok(value),
        other => Err(SubjectViolation::Malformed {
            field,
            expected: "string",
            found: other.map_or("nothing", json_kind),
        }),
    }
}

/// Names the JSON kind of a value.
const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// SECTION: Collection Report
// ============================================================================

/// One invalid record inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordViolation {
    /// Position within `data`.
    pub index: usize,
    /// The offending record as returned.
    pub record: Value,
    /// First violation found.
    pub reason: SubjectViolation,
}

/// Aggregated result of checking a subject collection.
///
/// Every problem is gathered; nothing is fail-fast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    /// Problem with the top-level shape, if any.
    pub top_level: Option<String>,
    /// Every invalid record, in collection order.
    pub violations: Vec<RecordViolation>,
    /// Known subject codes absent from the collection, in configured order.
    pub missing_subjects: Vec<String>,
}

impl SchemaReport {
    /// Returns true when the collection passed every check.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.top_level.is_none() && self.violations.is_empty() && self.missing_subjects.is_empty()
    }
}

impl fmt::Display for SchemaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(top_level) = &self.top_level {
            parts.push(top_level.clone());
        }
        if !self.violations.is_empty() {
            let details: Vec<String> = self
                .violations
                .iter()
                .map(|violation| format!("data[{}]: {}", violation.index, violation.reason))
                .collect();
            parts.push(format!(
                "{} invalid record(s): {}",
                self.violations.len(),
                details.join("; ")
            ));
        }
        if !self.missing_subjects.is_empty() {
            parts.push(format!("missing subjects: {}", self.missing_subjects.join(", ")));
        }
        if parts.is_empty() {
            f.write_str("collection is valid")
        } else {
            f.write_str(&parts.join(" | "))
        }
    }
}

/// Checks a subject collection body against shape, records and coverage.
///
/// When `data` is missing or not an array only the top-level problem is
/// reported; record and coverage checks need a usable `data` array.
#[must_use]
pub fn check_collection(body: &Value, known_subjects: &[String]) -> SchemaReport {
    let mut report = SchemaReport::default();
    let Value::Object(top) = body else {
        report.top_level =
            Some(format!("expected a json object at the top level, found {}", json_kind(body)));
        return report;
    };

    let keys: BTreeSet<&str> = top.keys().map(String::as_str).collect();
    let expected: BTreeSet<&str> = COLLECTION_KEYS.into_iter().collect();
    if keys != expected {
        let found: Vec<&str> = keys.into_iter().collect();
        report.top_level = Some(format!(
            "expected top-level keys [data, links], found [{}]",
            found.join(", ")
        ));
    }

    let records = match top.get("data") {
        Some(Value::Array(records)) => records,
        other => {
            let problem = format!(
                "expected `data` to be an array, found {}",
                other.map_or("nothing", json_kind)
            );
            report.top_level = Some(match report.top_level.take() {
                Some(existing) => format!("{existing}; {problem}"),
                None => problem,
            });
            return report;
        }
    };

    let mut present = BTreeSet::new();
    for (index, record) in records.iter().enumerate() {
        if let Some(Value::String(id)) = record.get("id") {
            present.insert(id.as_str());
        }
        if let Some(reason) = validate(record) {
            report.violations.push(RecordViolation {
                index,
                record: record.clone(),
                reason,
            });
        }
    }
    report.missing_subjects = known_subjects
        .iter()
        .filter(|code| !present.contains(code.as_str()))
        .cloned()
        .collect();
    report
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::SubjectViolation;
    use super::validate;

    #[test]
    fn type_is_checked_before_id() {
        let candidate = json!({
            "id": "CS",
            "type": "courses",
            "attributes": {"abbreviation": "ME", "title": ""}
        });
        assert_eq!(
            validate(&candidate),
            Some(SubjectViolation::TypeMismatch {
                found: "courses".to_string()
            })
        );
    }

    #[test]
    fn id_mismatch_is_checked_before_empty_title() {
        let candidate = json!({
            "id": "CS",
            "type": "subjects",
            "attributes": {"abbreviation": "ME", "title": ""}
        });
        assert!(matches!(validate(&candidate), Some(SubjectViolation::IdMismatch { .. })));
    }

    #[test]
    fn wrong_kinds_become_type_errors() {
        let candidate = json!({
            "id": "CS",
            "type": "subjects",
            "attributes": {"abbreviation": "CS", "title": 42}
        });
        let violation = validate(&candidate).map(|violation| violation.to_string());
        assert_eq!(
            violation.as_deref(),
            Some("type error: expected `attributes.title` to be a string, found number")
        );

        let candidate = json!({
            "id": ["CS"],
            "type": "subjects",
            "attributes": {"abbreviation": "CS", "title": "Computer Science"}
        });
        assert_eq!(
            validate(&candidate),
            Some(SubjectViolation::Malformed {
                field: "id",
                expected: "string",
                found: "array",
            })
        );
    }

    #[test]
    fn null_attributes_are_not_an_object() {
        let candidate = json!({"id": "CS", "type": "subjects", "attributes": null});
        assert_eq!(validate(&candidate), Some(SubjectViolation::AttributesNotObject));
    }
}
