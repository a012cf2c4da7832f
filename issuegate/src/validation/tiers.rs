//! Tiered field allow-lists

use serde::{Deserialize, Serialize};

/// Wildcard entry admitting every custom field
pub const CUSTOM_FIELD_WILDCARD: &str = "customfield_*";

const BASIC_FIELDS: &[&str] = &[
    "summary",
    "description",
    "environment",
    "labels",
    "priority",
    "assignee",
    "duedate",
];

const EXTENDED_FIELDS: &[&str] = &[
    "components",
    "fixVersions",
    "versions",
    "issuetype",
    "parent",
    "reporter",
    "timetracking",
    CUSTOM_FIELD_WILDCARD,
];

const ADMIN_FIELDS: &[&str] = &["project", "security", "resolution", "issuelinks", "worklog"];

/// Privilege tier of a field allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldTier {
    /// Descriptive fields only, for bulk and transition payloads
    Basic,
    /// Basic plus classification and custom fields, for create and update
    Extended,
    /// Everything, including project moves and security levels
    Admin,
}

impl FieldTier {
    /// Field names admitted by this tier, including lower tiers
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = BASIC_FIELDS.to_vec();
        if *self >= FieldTier::Extended {
            fields.extend_from_slice(EXTENDED_FIELDS);
        }
        if *self >= FieldTier::Admin {
            fields.extend_from_slice(ADMIN_FIELDS);
        }
        fields
    }

    /// Owned allow-list for [`super::FieldValidationOptions`]
    pub fn allow_list(&self) -> Vec<String> {
        self.fields().into_iter().map(String::from).collect()
    }
}

/// True when `field` is admitted by `allowed`, honouring [`CUSTOM_FIELD_WILDCARD`]
pub fn is_allowed(field: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|entry| match entry.strip_suffix('*') {
        Some(prefix) => field.starts_with(prefix),
        None => entry == field,
    })
}
