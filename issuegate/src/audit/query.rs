//! Audit journal queries and aggregate statistics

use super::entry::{AuditEntry, RiskLevel};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Filter over the audit journal
///
/// Every set criterion must match. Results are always newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditQuery {
    /// Substring of the operation name, case-insensitive
    pub operation: Option<String>,
    /// Substring of the resource type, case-insensitive
    pub resource_type: Option<String>,
    /// Exact risk level
    pub risk_level: Option<RiskLevel>,
    /// Outcome; `started` entries never match
    pub success: Option<bool>,
    /// Only entries at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Most entries returned
    pub limit: Option<usize>,
}

impl AuditQuery {
    /// Match everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by operation substring
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Filter by resource substring
    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Filter by risk level
    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = Some(risk);
        self
    }

    /// Filter by outcome
    pub fn with_success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    /// Only entries at or after `since`
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    /// Cap the number of results
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when `entry` satisfies every criterion
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(operation) = &self.operation {
            if !contains_ignore_case(&entry.operation, operation) {
                return false;
            }
        }
        if let Some(resource) = &self.resource_type {
            if !contains_ignore_case(&entry.resource_type, resource) {
                return false;
            }
        }
        if let Some(risk) = self.risk_level {
            if entry.risk_level != risk {
                return false;
            }
        }
        if let Some(success) = self.success {
            if !entry.is_outcome() || entry.success != success {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        true
    }

    /// Apply the filter to `entries`, newest first
    pub fn run<'a, I>(&self, entries: I) -> Vec<AuditEntry>
    where
        I: IntoIterator<Item = &'a AuditEntry>,
    {
        let mut matched: Vec<AuditEntry> = entries
            .into_iter()
            .filter(|entry| self.matches(entry))
            .cloned()
            .collect();
        sort_newest_first(&mut matched);
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

/// Sort by timestamp descending, ties broken by id descending
pub fn sort_newest_first(entries: &mut [AuditEntry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
}

/// Aggregate counts over the journal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditStats {
    /// Entries currently held
    pub total_entries: usize,
    /// Count per risk level, every level present
    pub by_risk_level: BTreeMap<RiskLevel, usize>,
    /// Successful outcomes
    pub successes: usize,
    /// Failed outcomes
    pub failures: usize,
    /// `started` entries, which carry no outcome
    pub started: usize,
    /// Entries in the 24 hours before `now`
    pub last_24h: usize,
    /// Oldest entry timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest: Option<DateTime<Utc>>,
    /// Newest entry timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest: Option<DateTime<Utc>>,
}

impl AuditStats {
    /// Compute statistics relative to `now`
    pub fn compute<'a, I>(entries: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a AuditEntry>,
    {
        let day_ago = now - Duration::hours(24);
        let mut stats = AuditStats {
            by_risk_level: RiskLevel::ALL.into_iter().map(|level| (level, 0)).collect(),
            ..Default::default()
        };

        for entry in entries {
            stats.total_entries += 1;
            *stats.by_risk_level.entry(entry.risk_level).or_default() += 1;
            if !entry.is_outcome() {
                stats.started += 1;
            } else if entry.success {
                stats.successes += 1;
            } else {
                stats.failures += 1;
            }
            if entry.timestamp >= day_ago {
                stats.last_24h += 1;
            }
            stats.oldest = Some(stats.oldest.map_or(entry.timestamp, |t| t.min(entry.timestamp)));
            stats.newest = Some(stats.newest.map_or(entry.timestamp, |t| t.max(entry.timestamp)));
        }
        stats
    }
}
