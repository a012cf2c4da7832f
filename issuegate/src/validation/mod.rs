//! Field validation for payloads sent to the remote tracker
//!
//! [`validate_issue_fields`] checks every field of a create/update payload
//! against an optional allow-list, a known-field schema, the custom-field
//! rules, or the generic content and size checks, in that order. It stops at
//! the first violation and names the offending field.

mod schemas;
pub mod tiers;

use crate::config::SecurityConfig;
use crate::{GatewayError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub use tiers::{FieldTier, CUSTOM_FIELD_WILDCARD};

static ISSUE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]{0,49}-[1-9]\d{0,9}$").expect("issue key regex"));
static PROJECT_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]{1,49}$").expect("project key regex"));
static NUMERIC_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9]\d{0,17}$").expect("numeric id regex"));

/// Options for [`validate_issue_fields`]
#[derive(Debug, Clone)]
pub struct FieldValidationOptions {
    /// Fields permitted in the payload; `None` admits all
    pub allowed_fields: Option<Vec<String>>,
    /// Longest string accepted for free-text fields
    pub max_string_length: usize,
    /// Largest array accepted
    pub max_array_length: usize,
    /// Reject markup and script content
    pub block_dangerous_values: bool,
}

impl FieldValidationOptions {
    /// Options restricted to `tier`, with limits from `config`
    pub fn for_tier(tier: FieldTier, config: &SecurityConfig) -> Self {
        Self {
            allowed_fields: Some(tier.allow_list()),
            ..Self::from(config)
        }
    }
}

impl From<&SecurityConfig> for FieldValidationOptions {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            allowed_fields: None,
            max_string_length: config.max_string_length,
            max_array_length: config.max_array_length,
            block_dangerous_values: config.block_dangerous_patterns,
        }
    }
}

impl Default for FieldValidationOptions {
    fn default() -> Self {
        Self::from(&SecurityConfig::default())
    }
}

/// Validate and normalize a field map, failing on the first bad field
pub fn validate_issue_fields(
    fields: &Map<String, Value>,
    options: &FieldValidationOptions,
) -> Result<Map<String, Value>> {
    let mut validated = Map::with_capacity(fields.len());

    for (name, value) in fields {
        if let Some(allowed) = &options.allowed_fields {
            if !tiers::is_allowed(name, allowed) {
                return Err(GatewayError::validation(
                    name,
                    "field is not permitted for this operation",
                ));
            }
        }

        let checked = match schemas::validate_known(name, value, options) {
            Some(result) => result?,
            None if name.starts_with("customfield_") => {
                schemas::validate_custom(name, value, options)?
            }
            None => schemas::validate_generic(name, value, options)?,
        };
        validated.insert(name.clone(), checked);
    }

    Ok(validated)
}

/// True for keys like `PROJ-123`
pub fn is_issue_key(key: &str) -> bool {
    ISSUE_KEY.is_match(key)
}

/// True for keys like `PROJ`
pub fn is_project_key(key: &str) -> bool {
    PROJECT_KEY.is_match(key)
}

/// Accept an issue key or a numeric issue id
pub fn validate_issue_key(field: &str, key: &str) -> Result<String> {
    let key = key.trim();
    if is_issue_key(key) || NUMERIC_ID.is_match(key) {
        Ok(key.to_string())
    } else {
        Err(GatewayError::validation(
            field,
            format!("'{key}' is not an issue key like PROJ-123"),
        ))
    }
}

/// Accept a project key
pub fn validate_project_key(field: &str, key: &str) -> Result<String> {
    let key = key.trim();
    if is_project_key(key) {
        Ok(key.to_string())
    } else {
        Err(GatewayError::validation(
            field,
            format!("'{key}' is not a project key like PROJ"),
        ))
    }
}

/// Accept a positive numeric identifier given as a string
pub fn validate_numeric_id(field: &str, id: &str) -> Result<String> {
    let id = id.trim();
    if NUMERIC_ID.is_match(id) {
        Ok(id.to_string())
    } else {
        Err(GatewayError::validation(
            field,
            format!("'{id}' is not a numeric id"),
        ))
    }
}

/// Content and length checks for a single free-text argument
pub fn validate_text(field: &str, text: &str, options: &FieldValidationOptions) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::validation(field, "cannot be empty"));
    }
    let length = trimmed.chars().count();
    if length > options.max_string_length {
        return Err(GatewayError::validation(
            field,
            format!(
                "{length} characters exceeds the {} limit",
                options.max_string_length
            ),
        ));
    }
    if options.block_dangerous_values {
        crate::security::check_content(field, trimmed)?;
    }
    Ok(trimmed.to_string())
}
