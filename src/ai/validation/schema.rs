//! Transcript Schema: normalization and validation
//!
//! [`normalize`] heals cosmetically wrong-typed output in place and is
//! idempotent. [`validate`] then checks the fixed transcript shape and either
//! yields a [`Transcript`] or every violation found, in field order.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::types::{
    DATE_FIELD, FieldKind, METADATA_FIELDS, TOP_LEVEL_KEYS, Transcript, ValidationError,
    ValidationErrorKind,
};

static RE_DAY_MONTH_UNKNOWN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^00-00-([0-9]{4})$").expect("valid date regex"));

/// Result of validating one normalized response
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Conformant(Transcript),
    /// Never empty
    Violations(Vec<ValidationError>),
}

impl ValidationOutcome {
    pub fn is_conformant(&self) -> bool {
        matches!(self, Self::Conformant(_))
    }
}

// =============================================================================
// Normalization
// =============================================================================

/// Coerce cosmetically wrong metadata values in place.
///
/// - array field: string `s` becomes `[s]`; absent or null becomes `[]`
/// - string field: any present non-string becomes `""`
/// - page count: JSON numbers are kept as they are; a string holding a
///   non-negative integer becomes that number; anything else present
///   becomes `0`
/// - `document_date` of the form `00-00-YYYY` becomes `YYYY-00-00`
///
/// Values of any other shape are left for [`validate`] to report.
pub fn normalize(value: &mut Value) {
    let Some(Value::Object(metadata)) = value.get_mut("metadata") else {
        return;
    };

    for field in METADATA_FIELDS {
        match field.kind {
            FieldKind::Array => normalize_array(metadata, field.name),
            FieldKind::String => normalize_string(metadata, field.name),
            FieldKind::Number => normalize_count(metadata, field.name),
        }
    }

    if let Some(Value::String(date)) = metadata.get_mut(DATE_FIELD)
        && let Some(caps) = RE_DAY_MONTH_UNKNOWN.captures(date)
    {
        *date = format!("{}-00-00", &caps[1]);
    }
}

fn normalize_array(metadata: &mut Map<String, Value>, name: &str) {
    match metadata.get(name) {
        None | Some(Value::Null) => {
            metadata.insert(name.to_string(), Value::Array(Vec::new()));
        }
        Some(Value::String(s)) => {
            let single = Value::Array(vec![Value::String(s.clone())]);
            metadata.insert(name.to_string(), single);
        }
        Some(_) => {}
    }
}

fn normalize_string(metadata: &mut Map<String, Value>, name: &str) {
    if let Some(v) = metadata.get_mut(name)
        && !v.is_string()
    {
        *v = Value::String(String::new());
    }
}

// Out-of-range numbers (negative, fractional) are numeric, so they stay
// and validation reports them.
fn normalize_count(metadata: &mut Map<String, Value>, name: &str) {
    if let Some(v) = metadata.get_mut(name)
        && !v.is_number()
    {
        let count = v
            .as_str()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(0);
        *v = Value::from(count);
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Check a (normalized) response against the transcript schema
pub fn validate(value: &Value) -> ValidationOutcome {
    let Value::Object(root) = value else {
        return ValidationOutcome::Violations(vec![ValidationError::new(
            ValidationErrorKind::Schema,
            format!("response must be a JSON object, got {}", json_type(value)),
        )]);
    };

    let mut violations = Vec::new();

    for key in TOP_LEVEL_KEYS {
        match root.get(*key) {
            None => violations.push(ValidationError::missing(*key)),
            Some(Value::Object(metadata)) if *key == "metadata" => {
                check_metadata(metadata, &mut violations);
            }
            Some(v) if *key == "metadata" => {
                violations.push(ValidationError::wrong_type(*key, "object", json_type(v)));
            }
            Some(v) if !v.is_string() => {
                violations.push(ValidationError::wrong_type(
                    *key,
                    FieldKind::String.as_str(),
                    json_type(v),
                ));
            }
            Some(_) => {}
        }
    }

    if !violations.is_empty() {
        return ValidationOutcome::Violations(violations);
    }

    match serde_json::from_value::<Transcript>(value.clone()) {
        Ok(transcript) => ValidationOutcome::Conformant(transcript),
        Err(e) => ValidationOutcome::Violations(vec![ValidationError::new(
            ValidationErrorKind::Schema,
            e.to_string(),
        )]),
    }
}

fn check_metadata(metadata: &Map<String, Value>, violations: &mut Vec<ValidationError>) {
    for field in METADATA_FIELDS {
        let path = format!("metadata.{}", field.name);
        let Some(v) = metadata.get(field.name) else {
            violations.push(ValidationError::missing(path));
            continue;
        };

        match field.kind {
            FieldKind::String if !v.is_string() => {
                violations.push(ValidationError::wrong_type(
                    path,
                    field.kind.as_str(),
                    json_type(v),
                ));
            }
            FieldKind::Array => match v {
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        if !item.is_string() {
                            violations.push(ValidationError::wrong_type(
                                format!("{}[{}]", path, i),
                                FieldKind::String.as_str(),
                                json_type(item),
                            ));
                        }
                    }
                }
                other => {
                    violations.push(ValidationError::wrong_type(
                        path,
                        field.kind.as_str(),
                        json_type(other),
                    ));
                }
            },
            FieldKind::Number => {
                let whole = v
                    .as_u64()
                    .is_some_and(|n| u32::try_from(n).is_ok());
                if !whole {
                    violations.push(ValidationError::wrong_type(
                        path,
                        "non-negative whole number",
                        json_type(v),
                    ));
                }
            }
            FieldKind::String => {}
        }
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
