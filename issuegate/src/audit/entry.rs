//! Audit entry types and risk classification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use ulid::Ulid;

/// Metadata key marking the pipeline phase of an entry
pub const PHASE_KEY: &str = "phase";

/// Phase of entries written before the operation runs
pub const PHASE_STARTED: &str = "started";

/// Phase of entries written once the outcome is known
pub const PHASE_COMPLETED: &str = "completed";

/// Risk attached to every audit entry
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Reads and listings
    Low,
    /// Ordinary modifications
    Medium,
    /// State changes that are hard to reverse
    High,
    /// Deletions
    Critical,
}

impl RiskLevel {
    /// All levels, lowest first
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RiskLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown risk level '{s}'"))
    }
}

const CRITICAL_OPERATION_WORDS: &[&str] = &["delete", "remove", "destroy", "purge"];
const HIGH_OPERATION_WORDS: &[&str] = &[
    "bulk",
    "mass",
    "complete",
    "close",
    "resolve",
    "transition",
];
const HIGH_RESOURCES: &[&str] = &["sprint", "attachment", "permission"];
const MEDIUM_OPERATION_WORDS: &[&str] = &["update", "modify", "edit", "move", "assign"];
const MEDIUM_RESOURCES: &[&str] = &["issue", "comment", "worklog"];

fn mentions(text: &str, words: &[&str]) -> bool {
    words.iter().any(|word| text.contains(word))
}

/// Derive a risk level from operation and resource keywords
///
/// Pure function of its inputs; matching is case-insensitive substring search.
pub fn classify_risk(operation: &str, resource_type: &str) -> RiskLevel {
    let operation = operation.to_ascii_lowercase();
    let resource = resource_type.to_ascii_lowercase();

    if mentions(&operation, CRITICAL_OPERATION_WORDS) {
        RiskLevel::Critical
    } else if mentions(&operation, HIGH_OPERATION_WORDS) || mentions(&resource, HIGH_RESOURCES) {
        RiskLevel::High
    } else if mentions(&operation, MEDIUM_OPERATION_WORDS) || mentions(&resource, MEDIUM_RESOURCES)
    {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// An event about to be recorded
///
/// Built with the `with_*` methods, then handed to
/// [`AuditLogger::log`](super::AuditLogger::log), which assigns the id,
/// timestamp and final risk level.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    /// Operation name, usually the tool name
    pub operation: String,
    /// Kind of resource acted on
    pub resource_type: String,
    /// Identifier of the resource, when there is one
    pub resource_id: Option<String>,
    /// Free-form details
    pub details: Map<String, Value>,
    /// Explicit risk level overriding classification
    pub risk_level: Option<RiskLevel>,
    /// Whether the operation succeeded
    pub success: bool,
    /// Error text for failures
    pub error: Option<String>,
    /// Extra metadata
    pub metadata: Option<Map<String, Value>>,
}

impl AuditEvent {
    /// Start a successful event for `operation` on `resource_type`
    pub fn new(operation: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            details: Map::new(),
            risk_level: None,
            success: true,
            error: None,
            metadata: None,
        }
    }

    /// Set the resource identifier
    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    /// Set the resource identifier when present
    pub fn with_optional_resource_id(mut self, id: Option<impl Into<String>>) -> Self {
        self.resource_id = id.map(Into::into);
        self
    }

    /// Replace the details map
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = details;
        self
    }

    /// Add one detail
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Force a risk level
    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = Some(risk);
        self
    }

    /// Mark as failed with error text
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    /// Add one metadata value
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Explicit risk if set, otherwise the classified one
    pub fn effective_risk(&self) -> RiskLevel {
        self.risk_level
            .unwrap_or_else(|| classify_risk(&self.operation, &self.resource_type))
    }
}

/// A recorded audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Monotonic identifier
    pub id: Ulid,
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
    /// Operation name
    pub operation: String,
    /// Kind of resource acted on
    pub resource_type: String,
    /// Resource identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Free-form details
    pub details: Map<String, Value>,
    /// Risk level
    pub risk_level: RiskLevel,
    /// Outcome
    pub success: bool,
    /// Error text for failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Extra metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl AuditEntry {
    /// Freeze an event with its id and timestamp
    pub fn from_event(event: AuditEvent, id: Ulid, timestamp: DateTime<Utc>) -> Self {
        let risk_level = event.effective_risk();
        Self {
            id,
            timestamp,
            operation: event.operation,
            resource_type: event.resource_type,
            resource_id: event.resource_id,
            details: event.details,
            risk_level,
            success: event.success,
            error: event.error,
            metadata: event.metadata,
        }
    }

    /// Metadata value by key
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }

    /// False for `started` entries, which record an attempt rather than a result
    ///
    /// Outcome filters and success/failure counts only consider outcome entries.
    pub fn is_outcome(&self) -> bool {
        self.metadata_value(PHASE_KEY).and_then(Value::as_str) != Some(PHASE_STARTED)
    }
}
