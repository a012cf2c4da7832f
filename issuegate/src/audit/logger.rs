//! In-memory audit journal with bounded retention

use super::entry::{
    AuditEntry, AuditEvent, RiskLevel, PHASE_COMPLETED, PHASE_KEY, PHASE_STARTED,
};
use super::query::{sort_newest_first, AuditQuery, AuditStats};
use crate::clock::{system_clock, Clock};
use crate::common::{generate_monotonic_ulid, CleanupHandle};
use crate::config::{AuditConfig, AuditLevel};
use crate::security::AUDIT_TARGET;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Entries removed per step while over the memory budget
pub const MEMORY_EVICTION_BATCH: usize = 100;

/// Memory eviction never goes below this many entries
pub const MIN_RETAINED_ENTRIES: usize = 100;

/// Entries serialized to estimate the average entry size
const MEMORY_SAMPLE_SIZE: usize = 10;

/// Multiplier over serialized size for allocator and index overhead
const MEMORY_OVERHEAD_FACTOR: f64 = 2.0;

/// Resource type of entries written by [`AuditLogger::log_security_event`]
pub const SECURITY_RESOURCE: &str = "security";

/// Append-only audit journal
///
/// Entries live only for the lifetime of the process. Cleanup runs when the
/// entry count or estimated memory exceeds its budget, when the configured
/// interval has elapsed since the last run, and from an optional background
/// task.
#[derive(Debug)]
pub struct AuditLogger {
    config: AuditConfig,
    entries: RwLock<Vec<AuditEntry>>,
    clock: Arc<dyn Clock>,
    cleaning: AtomicBool,
    last_cleanup: Mutex<Instant>,
    cleanup_task: CleanupHandle,
}

struct CleaningGuard<'a>(&'a AtomicBool);

impl Drop for CleaningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AuditLogger {
    /// Create a logger using the system clock
    pub fn new(config: AuditConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    /// Create a logger reading time from `clock`
    pub fn with_clock(config: AuditConfig, clock: Arc<dyn Clock>) -> Self {
        let started = clock.now();
        Self {
            config,
            entries: RwLock::new(Vec::new()),
            clock,
            cleaning: AtomicBool::new(false),
            last_cleanup: Mutex::new(started),
            cleanup_task: CleanupHandle::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Record an event
    ///
    /// Returns the stored entry, or `None` when auditing is disabled.
    pub fn log(&self, event: AuditEvent) -> Option<AuditEntry> {
        if !self.config.enabled {
            return None;
        }

        let entry = AuditEntry::from_event(event, generate_monotonic_ulid(), self.clock.wall_now());
        self.emit(&entry);

        let count = {
            let mut entries = self.write();
            entries.push(entry.clone());
            entries.len()
        };

        if self.needs_cleanup(count) {
            self.cleanup();
        }
        Some(entry)
    }

    /// Record the start of an operation
    pub fn log_operation(
        &self,
        operation: &str,
        resource_type: &str,
        resource_id: Option<&str>,
        details: Map<String, Value>,
    ) -> Option<AuditEntry> {
        self.log(
            AuditEvent::new(operation, resource_type)
                .with_optional_resource_id(resource_id)
                .with_details(details)
                .with_metadata(PHASE_KEY, PHASE_STARTED),
        )
    }

    /// Record a successful outcome
    pub fn log_success(
        &self,
        operation: &str,
        resource_type: &str,
        resource_id: Option<&str>,
        details: Map<String, Value>,
    ) -> Option<AuditEntry> {
        self.log(
            AuditEvent::new(operation, resource_type)
                .with_optional_resource_id(resource_id)
                .with_details(details)
                .with_metadata(PHASE_KEY, PHASE_COMPLETED),
        )
    }

    /// Record a failed outcome at high risk
    pub fn log_failure(
        &self,
        operation: &str,
        resource_type: &str,
        resource_id: Option<&str>,
        error: &str,
        details: Map<String, Value>,
    ) -> Option<AuditEntry> {
        self.log(
            AuditEvent::new(operation, resource_type)
                .with_optional_resource_id(resource_id)
                .with_details(details)
                .with_error(error)
                .with_risk(RiskLevel::High)
                .with_metadata(PHASE_KEY, PHASE_COMPLETED),
        )
    }

    /// Record a security event, high risk unless `risk` says otherwise
    pub fn log_security_event(
        &self,
        operation: &str,
        message: &str,
        details: Map<String, Value>,
        risk: Option<RiskLevel>,
    ) -> Option<AuditEntry> {
        self.log(
            AuditEvent::new(operation, SECURITY_RESOURCE)
                .with_details(details)
                .with_error(message)
                .with_risk(risk.unwrap_or(RiskLevel::High)),
        )
    }

    /// Entries matching `query`, newest first
    pub fn query(&self, query: &AuditQuery) -> Vec<AuditEntry> {
        query.run(self.read().iter())
    }

    /// Most recent `limit` entries
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        self.query(&AuditQuery::new().with_limit(limit))
    }

    /// Entries written by [`AuditLogger::log_security_event`]
    pub fn security_events(&self, limit: usize) -> Vec<AuditEntry> {
        let mut events: Vec<AuditEntry> = self
            .read()
            .iter()
            .filter(|e| e.resource_type == SECURITY_RESOURCE)
            .cloned()
            .collect();
        sort_newest_first(&mut events);
        events.truncate(limit);
        events
    }

    /// Failed entries
    pub fn failed_operations(&self, limit: usize) -> Vec<AuditEntry> {
        self.query(&AuditQuery::new().with_success(false).with_limit(limit))
    }

    /// High and critical entries
    pub fn high_risk_operations(&self, limit: usize) -> Vec<AuditEntry> {
        let mut risky: Vec<AuditEntry> = self
            .read()
            .iter()
            .filter(|e| e.risk_level >= RiskLevel::High)
            .cloned()
            .collect();
        sort_newest_first(&mut risky);
        risky.truncate(limit);
        risky
    }

    /// Aggregate counts over the journal
    pub fn stats(&self) -> AuditStats {
        AuditStats::compute(self.read().iter(), self.clock.wall_now())
    }

    /// Entries currently held
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True when nothing is held
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Estimated memory held by the journal, in megabytes
    pub fn estimated_memory_mb(&self) -> f64 {
        estimate_memory_mb(&self.read())
    }

    /// Apply retention, count and memory limits
    ///
    /// Returns the number of entries removed. A call made while another
    /// cleanup is running returns 0 without touching the journal.
    pub fn cleanup(&self) -> usize {
        if self
            .cleaning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return 0;
        }
        let _guard = CleaningGuard(&self.cleaning);

        let removed = {
            let mut entries = self.write();
            self.enforce_limits(&mut entries)
        };
        *self
            .last_cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = self.clock.now();

        if removed > 0 {
            tracing::debug!(removed, remaining = self.len(), "audit cleanup");
        }
        removed
    }

    /// Run [`AuditLogger::cleanup`] every configured interval until [`AuditLogger::destroy`]
    pub fn start_cleanup_task(self: &Arc<Self>) {
        let period = Duration::from_secs(self.config.cleanup_interval_secs.max(1));
        self.cleanup_task.start(self, period, "audit", |logger| {
            logger.cleanup();
        });
    }

    /// Stop background cleanup and drop every entry
    pub fn destroy(&self) {
        self.cleanup_task.stop();
        self.write().clear();
    }

    fn enforce_limits(&self, entries: &mut Vec<AuditEntry>) -> usize {
        let before = entries.len();

        // a horizon reaching past the representable range keeps everything
        let cutoff = chrono::Duration::try_days(i64::from(self.config.retention_days))
            .and_then(|retention| self.clock.wall_now().checked_sub_signed(retention));
        if let Some(cutoff) = cutoff {
            entries.retain(|e| e.timestamp >= cutoff);
        }

        if entries.len() > self.config.max_entries {
            sort_oldest_first(entries);
            let excess = entries.len() - self.config.max_entries;
            entries.drain(..excess);
        }

        if entries.len() > MIN_RETAINED_ENTRIES
            && estimate_memory_mb(entries) > self.config.max_memory_mb
        {
            sort_oldest_first(entries);
            while entries.len() > MIN_RETAINED_ENTRIES
                && estimate_memory_mb(entries) > self.config.max_memory_mb
            {
                let batch = MEMORY_EVICTION_BATCH.min(entries.len() - MIN_RETAINED_ENTRIES);
                entries.drain(..batch);
            }
        }

        before - entries.len()
    }

    fn needs_cleanup(&self, count: usize) -> bool {
        if count > self.config.max_entries {
            return true;
        }
        let interval = Duration::from_secs(self.config.cleanup_interval_secs);
        let last = *self
            .last_cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.clock.now().saturating_duration_since(last) >= interval {
            return true;
        }
        count > MIN_RETAINED_ENTRIES && self.estimated_memory_mb() > self.config.max_memory_mb
    }

    fn emit(&self, entry: &AuditEntry) {
        let threshold = match entry.risk_level {
            RiskLevel::Low => AuditLevel::Debug,
            RiskLevel::Medium => AuditLevel::Info,
            RiskLevel::High => AuditLevel::Warn,
            RiskLevel::Critical => AuditLevel::Error,
        };
        if threshold < self.config.level {
            return;
        }

        let id = entry.id.to_string();
        let resource_id = entry.resource_id.as_deref().unwrap_or("-");
        let error = entry.error.as_deref().unwrap_or("");
        match entry.risk_level {
            RiskLevel::Critical => tracing::error!(
                target: AUDIT_TARGET,
                %id, operation = %entry.operation, resource = %entry.resource_type,
                resource_id, success = entry.success, error, "critical operation"
            ),
            RiskLevel::High => tracing::warn!(
                target: AUDIT_TARGET,
                %id, operation = %entry.operation, resource = %entry.resource_type,
                resource_id, success = entry.success, error, "high risk operation"
            ),
            RiskLevel::Medium => tracing::info!(
                target: AUDIT_TARGET,
                %id, operation = %entry.operation, resource = %entry.resource_type,
                resource_id, success = entry.success, error, "operation"
            ),
            RiskLevel::Low => tracing::debug!(
                target: AUDIT_TARGET,
                %id, operation = %entry.operation, resource = %entry.resource_type,
                resource_id, success = entry.success, error, "operation"
            ),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<AuditEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<AuditEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sort_oldest_first(entries: &mut [AuditEntry]) {
    entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
}

/// Sampled average serialized size times count, with overhead, in megabytes
fn estimate_memory_mb(entries: &[AuditEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let step = (entries.len() / MEMORY_SAMPLE_SIZE).max(1);
    let (bytes, sampled) = entries
        .iter()
        .step_by(step)
        .take(MEMORY_SAMPLE_SIZE)
        .map(|e| serde_json::to_vec(e).map(|v| v.len()).unwrap_or(0))
        .fold((0usize, 0usize), |(bytes, n), size| (bytes + size, n + 1));
    let average = bytes as f64 / sampled as f64;
    average * entries.len() as f64 * MEMORY_OVERHEAD_FACTOR / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    fn logger_with(config: AuditConfig) -> (AuditLogger, MockClock) {
        let clock = MockClock::new();
        (AuditLogger::with_clock(config, Arc::new(clock.clone())), clock)
    }

    fn logger() -> (AuditLogger, MockClock) {
        logger_with(AuditConfig::default())
    }

    #[test]
    fn test_log_assigns_ids_and_risk() {
        let (logger, _) = logger();
        let first = logger
            .log(AuditEvent::new("update_issue", "issue").with_resource_id("PROJ-1"))
            .unwrap();
        let second = logger.log(AuditEvent::new("list_projects", "project")).unwrap();
        assert!(first.id < second.id);
        assert_eq!(first.risk_level, RiskLevel::Medium);
        assert_eq!(second.risk_level, RiskLevel::Low);
        assert_eq!(logger.len(), 2);
    }

    #[test]
    fn test_disabled_logger_records_nothing() {
        let (logger, _) = logger_with(AuditConfig {
            enabled: false,
            ..AuditConfig::default()
        });
        assert!(logger.log(AuditEvent::new("delete_issue", "issue")).is_none());
        assert!(logger.is_empty());
    }

    #[test]
    fn test_wrappers_fill_defaults() {
        let (logger, _) = logger();
        let started = logger
            .log_operation("get_issue", "issue", Some("PROJ-1"), Map::new())
            .unwrap();
        assert_eq!(started.metadata_value(PHASE_KEY), Some(&Value::from(PHASE_STARTED)));
        assert!(!started.is_outcome());

        let done = logger
            .log_success("get_issue", "issue", Some("PROJ-1"), Map::new())
            .unwrap();
        assert_eq!(done.metadata_value(PHASE_KEY), Some(&Value::from(PHASE_COMPLETED)));

        let failed = logger
            .log_failure("list_projects", "project", None, "timeout", Map::new())
            .unwrap();
        assert_eq!(failed.risk_level, RiskLevel::High);
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("timeout"));

        let security = logger
            .log_security_event("upload_attachment", "PATH_NOT_ALLOWED", Map::new(), None)
            .unwrap();
        assert_eq!(security.resource_type, SECURITY_RESOURCE);
        assert_eq!(security.risk_level, RiskLevel::High);

        let critical = logger
            .log_security_event("delete_issue", "CONFIRMATION_REQUIRED", Map::new(), Some(RiskLevel::Critical))
            .unwrap();
        assert_eq!(critical.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_views() {
        let (logger, clock) = logger();
        logger.log(AuditEvent::new("list_projects", "project"));
        clock.advance(Duration::from_secs(1));
        logger.log_failure("get_issue", "issue", Some("PROJ-2"), "404", Map::new());
        clock.advance(Duration::from_secs(1));
        logger.log(AuditEvent::new("delete_issue", "issue"));
        clock.advance(Duration::from_secs(1));
        logger.log_security_event("search_issues", "DANGEROUS_JQL_PATTERN", Map::new(), None);

        assert_eq!(logger.recent(2)[0].operation, "search_issues");
        assert_eq!(logger.security_events(10).len(), 1);
        assert_eq!(logger.failed_operations(10).len(), 2);

        let risky = logger.high_risk_operations(10);
        let ops: Vec<_> = risky.iter().map(|e| e.operation.as_str()).collect();
        assert_eq!(ops, ["search_issues", "delete_issue", "get_issue"]);

        let stats = logger.stats();
        assert_eq!(stats.total_entries, 4);
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.last_24h, 4);
    }

    #[test]
    fn test_retention_drops_old_entries() {
        let (logger, clock) = logger_with(AuditConfig {
            retention_days: 1,
            ..AuditConfig::default()
        });
        logger.log(AuditEvent::new("old", "x"));
        clock.advance(Duration::from_secs(2 * 24 * 3600));
        logger.log(AuditEvent::new("new", "x"));

        // the second log already crossed the cleanup interval
        let remaining: Vec<_> = logger.recent(10).into_iter().map(|e| e.operation).collect();
        assert_eq!(remaining, ["new"]);
    }

    #[test]
    fn test_unrepresentable_retention_keeps_entries() {
        let (logger, clock) = logger_with(AuditConfig {
            retention_days: u32::MAX,
            cleanup_interval_secs: 60,
            ..AuditConfig::default()
        });
        logger.log(AuditEvent::new("first", "x"));
        clock.advance(Duration::from_secs(2 * 3600));
        logger.log(AuditEvent::new("second", "x"));

        assert_eq!(logger.cleanup(), 0);
        assert_eq!(logger.len(), 2);
    }

    #[test]
    fn test_count_cap_keeps_newest() {
        let (logger, clock) = logger_with(AuditConfig {
            max_entries: 5,
            ..AuditConfig::default()
        });
        for i in 0..8 {
            logger.log(AuditEvent::new(format!("op{i}"), "x"));
            clock.advance(Duration::from_millis(10));
        }
        let ops: Vec<_> = logger.recent(10).into_iter().map(|e| e.operation).collect();
        assert_eq!(ops, ["op7", "op6", "op5", "op4", "op3"]);
    }

    #[test]
    fn test_memory_budget_evicts_down_to_floor() {
        let (logger, _) = logger_with(AuditConfig {
            max_memory_mb: 0.0,
            cleanup_interval_secs: 3600,
            ..AuditConfig::default()
        });
        for i in 0..350 {
            logger.log(AuditEvent::new(format!("op{i}"), "x").with_detail("payload", "y".repeat(64)));
        }
        assert_eq!(logger.len(), MIN_RETAINED_ENTRIES);
        assert_eq!(logger.recent(1)[0].operation, "op349");
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let (logger, clock) = logger_with(AuditConfig {
            retention_days: 1,
            max_entries: 50,
            cleanup_interval_secs: 86_400 * 10,
            ..AuditConfig::default()
        });
        for i in 0..30 {
            logger.log(AuditEvent::new(format!("old{i}"), "x"));
        }
        clock.advance(Duration::from_secs(36 * 3600));
        for i in 0..40 {
            logger.log(AuditEvent::new(format!("new{i}"), "x"));
        }

        logger.cleanup();
        let first = logger.query(&AuditQuery::new());
        assert_eq!(logger.cleanup(), 0);
        let second = logger.query(&AuditQuery::new());
        assert_eq!(first, second);
        assert!(first.iter().all(|e| e.operation.starts_with("new")));
    }

    #[test]
    fn test_concurrent_cleanup_is_noop() {
        let (logger, _) = logger();
        logger.cleaning.store(true, Ordering::SeqCst);
        assert_eq!(logger.cleanup(), 0);
        logger.cleaning.store(false, Ordering::SeqCst);
    }

    #[tokio::test]
    async fn test_destroy_stops_task_and_clears() {
        let logger = Arc::new(AuditLogger::new(AuditConfig::default()));
        logger.start_cleanup_task();
        logger.log(AuditEvent::new("list_projects", "project"));
        logger.destroy();
        assert!(logger.is_empty());
        assert!(!logger.cleanup_task.is_running());
    }
}
