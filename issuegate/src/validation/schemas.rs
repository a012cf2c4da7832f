//! Shape rules for well-known tracker fields and custom fields

use super::FieldValidationOptions;
use crate::security::check_content;
use crate::{GatewayError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

const MAX_SUMMARY_LENGTH: usize = 255;
const MAX_LABEL_LENGTH: usize = 255;
const MAX_NESTING_DEPTH: usize = 4;

static ACCOUNT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9:_\-]{1,128}$").expect("account id regex"));
static ESTIMATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[wdhm](\s+\d+[wdhm])*$").expect("estimate regex"));
static CUSTOM_FIELD_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^customfield_\d+$").expect("custom field regex"));

fn invalid<T>(field: &str, reason: impl Into<String>) -> Result<T> {
    Err(GatewayError::validation(field, reason))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn checked_text(field: &str, text: &str, max: usize, opts: &FieldValidationOptions) -> Result<()> {
    let length = text.chars().count();
    if length > max {
        return invalid(field, format!("{length} characters exceeds the {max} limit"));
    }
    if opts.block_dangerous_values {
        check_content(field, text)?;
    }
    Ok(())
}

/// Validate a known field; `None` when `field` has no dedicated schema
pub(super) fn validate_known(
    field: &str,
    value: &Value,
    opts: &FieldValidationOptions,
) -> Option<Result<Value>> {
    let result = match field {
        "summary" => summary(field, value, opts),
        "description" | "environment" => rich_text(field, value, opts),
        "labels" => labels(field, value, opts),
        "priority" | "issuetype" | "resolution" | "security" => named_ref(field, value, opts),
        "assignee" | "reporter" => user_ref(field, value),
        "components" | "fixVersions" | "versions" => named_ref_list(field, value, opts),
        "duedate" => due_date(field, value),
        "parent" | "project" => keyed_ref(field, value),
        "timetracking" => time_tracking(field, value),
        _ => return None,
    };
    Some(result)
}

fn summary(field: &str, value: &Value, opts: &FieldValidationOptions) -> Result<Value> {
    let Some(text) = value.as_str() else {
        return invalid(field, format!("expected string, got {}", type_name(value)));
    };
    let text = text.trim();
    if text.is_empty() {
        return invalid(field, "cannot be empty");
    }
    if text.contains(&['\n', '\r'][..]) {
        return invalid(field, "must be a single line");
    }
    checked_text(field, text, MAX_SUMMARY_LENGTH, opts)?;
    Ok(Value::String(text.to_string()))
}

/// Plain text, or a document-format object whose text is checked after serialization
fn rich_text(field: &str, value: &Value, opts: &FieldValidationOptions) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(text) => {
            checked_text(field, text, opts.max_string_length, opts)?;
            Ok(value.clone())
        }
        Value::Object(doc) if doc.get("type").and_then(Value::as_str) == Some("doc") => {
            let serialized = value.to_string();
            checked_text(field, &serialized, opts.max_string_length * 4, opts)?;
            Ok(value.clone())
        }
        other => invalid(
            field,
            format!("expected string or document, got {}", type_name(other)),
        ),
    }
}

fn labels(field: &str, value: &Value, opts: &FieldValidationOptions) -> Result<Value> {
    let Some(items) = value.as_array() else {
        return invalid(field, format!("expected array, got {}", type_name(value)));
    };
    if items.len() > opts.max_array_length {
        return invalid(
            field,
            format!("{} labels exceeds the {} limit", items.len(), opts.max_array_length),
        );
    }
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(label) = item.as_str().map(str::trim) else {
            return invalid(field, "labels must be strings");
        };
        if label.is_empty() || label.chars().any(char::is_whitespace) {
            return invalid(field, format!("label '{label}' must be non-empty without spaces"));
        }
        checked_text(field, label, MAX_LABEL_LENGTH, opts)?;
        out.push(Value::String(label.to_string()));
    }
    Ok(Value::Array(out))
}

/// `{"name": ..}` or `{"id": ..}`; a bare string becomes `{"name": s}`
fn named_ref(field: &str, value: &Value, opts: &FieldValidationOptions) -> Result<Value> {
    match value {
        Value::String(name) if !name.trim().is_empty() => {
            checked_text(field, name, MAX_LABEL_LENGTH, opts)?;
            Ok(json!({ "name": name.trim() }))
        }
        Value::Object(map) => {
            let reference = map
                .get("id")
                .or_else(|| map.get("name"))
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty());
            match reference {
                Some(text) => {
                    checked_text(field, text, MAX_LABEL_LENGTH, opts)?;
                    Ok(value.clone())
                }
                None => invalid(field, "object must carry a non-empty 'id' or 'name'"),
            }
        }
        other => invalid(
            field,
            format!("expected name or object, got {}", type_name(other)),
        ),
    }
}

fn named_ref_list(field: &str, value: &Value, opts: &FieldValidationOptions) -> Result<Value> {
    let Some(items) = value.as_array() else {
        return invalid(field, format!("expected array, got {}", type_name(value)));
    };
    if items.len() > opts.max_array_length {
        return invalid(
            field,
            format!("{} entries exceeds the {} limit", items.len(), opts.max_array_length),
        );
    }
    items
        .iter()
        .map(|item| named_ref(field, item, opts))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// `{"accountId": ..}`, a bare account id, or null to clear
fn user_ref(field: &str, value: &Value) -> Result<Value> {
    let account_id = match value {
        Value::Null => return Ok(Value::Null),
        Value::String(id) => id.trim(),
        Value::Object(map) => match map.get("accountId") {
            Some(Value::Null) => return Ok(json!({ "accountId": null })),
            Some(Value::String(id)) => id.trim(),
            _ => return invalid(field, "object must carry an 'accountId'"),
        },
        other => {
            return invalid(
                field,
                format!("expected account id, got {}", type_name(other)),
            )
        }
    };
    if !ACCOUNT_ID.is_match(account_id) {
        return invalid(field, format!("'{account_id}' is not a valid account id"));
    }
    Ok(json!({ "accountId": account_id }))
}

fn due_date(field: &str, value: &Value) -> Result<Value> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(date) => chrono::NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .or_else(|_| invalid(field, format!("'{date}' is not a YYYY-MM-DD date"))),
        other => invalid(field, format!("expected date string, got {}", type_name(other))),
    }
}

/// `{"key": ..}` or `{"id": ..}`; a bare string becomes `{"key": s}`
fn keyed_ref(field: &str, value: &Value) -> Result<Value> {
    match value {
        Value::String(key) => {
            let key = key.trim();
            if super::is_issue_key(key) || super::is_project_key(key) {
                Ok(json!({ "key": key }))
            } else {
                invalid(field, format!("'{key}' is not a valid key"))
            }
        }
        Value::Object(map) if map.get("key").or_else(|| map.get("id")).is_some_and(Value::is_string) => {
            Ok(value.clone())
        }
        other => invalid(field, format!("expected key or object, got {}", type_name(other))),
    }
}

fn time_tracking(field: &str, value: &Value) -> Result<Value> {
    let Some(map) = value.as_object() else {
        return invalid(field, format!("expected object, got {}", type_name(value)));
    };
    for (key, estimate) in map {
        if !matches!(key.as_str(), "originalEstimate" | "remainingEstimate") {
            return invalid(field, format!("unsupported key '{key}'"));
        }
        match estimate.as_str() {
            Some(text) if ESTIMATE.is_match(text.trim()) => {}
            _ => return invalid(field, format!("'{key}' must look like '2d 4h'")),
        }
    }
    Ok(value.clone())
}

/// Validate a `customfield_NNNNN` value by its JSON type
///
/// Strings are trimmed and content-checked, integral floats become integers,
/// arrays and objects are validated element by element up to a fixed depth.
pub(super) fn validate_custom(
    field: &str,
    value: &Value,
    opts: &FieldValidationOptions,
) -> Result<Value> {
    if !CUSTOM_FIELD_ID.is_match(field) {
        return invalid(field, "custom field ids look like customfield_10010");
    }
    coerce(field, value, opts, 0)
}

/// Fallback checks for fields without a dedicated schema
pub(super) fn validate_generic(
    field: &str,
    value: &Value,
    opts: &FieldValidationOptions,
) -> Result<Value> {
    coerce(field, value, opts, 0)
}

fn coerce(field: &str, value: &Value, opts: &FieldValidationOptions, depth: usize) -> Result<Value> {
    if depth > MAX_NESTING_DEPTH {
        return invalid(field, format!("nested deeper than {MAX_NESTING_DEPTH} levels"));
    }
    match value {
        Value::Null | Value::Bool(_) => Ok(value.clone()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if !f.is_finite() => invalid(field, "number must be finite"),
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                Ok(Value::from(f as i64))
            }
            _ => Ok(value.clone()),
        },
        Value::String(text) => {
            let text = text.trim();
            checked_text(field, text, opts.max_string_length, opts)?;
            Ok(Value::String(text.to_string()))
        }
        Value::Array(items) => {
            if items.len() > opts.max_array_length {
                return invalid(
                    field,
                    format!("{} entries exceeds the {} limit", items.len(), opts.max_array_length),
                );
            }
            items
                .iter()
                .map(|item| coerce(field, item, opts, depth + 1))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key.clone(), coerce(field, item, opts, depth + 1)?);
            }
            Ok(Value::Object(out))
        }
    }
}
