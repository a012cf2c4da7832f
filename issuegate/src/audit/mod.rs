//! Structured audit journal
//!
//! Every governed operation writes a `started` entry before it runs and a
//! `completed` entry once its outcome is known. Entries carry a risk level
//! derived from the operation and resource names unless the caller sets one.
//! Only outcome entries count towards success and failure filters and totals.

mod entry;
mod logger;
mod query;

pub use entry::{
    classify_risk, AuditEntry, AuditEvent, RiskLevel, PHASE_COMPLETED, PHASE_KEY, PHASE_STARTED,
};
pub use logger::{AuditLogger, MEMORY_EVICTION_BATCH, MIN_RETAINED_ENTRIES, SECURITY_RESOURCE};
pub use query::{sort_newest_first, AuditQuery, AuditStats};
