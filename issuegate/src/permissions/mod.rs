//! Advisory capability checks before sensitive operations
//!
//! The validator looks up what an operation needs, fetches what the caller
//! holds (cached per project scope) and compares the two. It never blocks the
//! gateway because the capability lookup itself failed: a failed fetch is
//! logged and the operation is reported as unverified.

mod cache;
pub mod table;

pub use cache::PermissionCache;
pub use table::{holds, requirements, Requirement};

use crate::audit::{AuditEvent, AuditLogger, RiskLevel};
use crate::clock::{system_clock, Clock};
use crate::common::CleanupHandle;
use crate::config::PermissionConfig;
use crate::tracker::{CapabilitySet, IssueTrackerClient};
use crate::{GatewayError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Cache key used when no project applies
pub const GLOBAL_SCOPE: &str = "global";

/// Where a permission check applies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionScope {
    /// Project key, `None` for global checks
    pub project: Option<String>,
    /// Issue, attachment or board the operation targets
    pub resource_key: Option<String>,
}

impl PermissionScope {
    /// Global scope
    pub fn global() -> Self {
        Self::default()
    }

    /// Scope of a project
    pub fn project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            resource_key: None,
        }
    }

    /// Scope of an issue; the project is taken from a `PROJ-123` style key
    pub fn issue(key: &str) -> Self {
        let project = key
            .rsplit_once('-')
            .map(|(project, _)| project)
            .filter(|project| crate::validation::is_project_key(project))
            .map(str::to_string);
        Self {
            project,
            resource_key: Some(key.to_string()),
        }
    }

    /// Cache key: the project, or [`GLOBAL_SCOPE`]
    pub fn cache_key(&self) -> &str {
        self.project.as_deref().unwrap_or(GLOBAL_SCOPE)
    }
}

/// Result of a check that did not deny
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionCheck {
    /// Checks are disabled
    Skipped,
    /// Every capability is held
    Granted,
    /// Required capabilities held, some optional ones missing
    MissingOptional(Vec<String>),
    /// The operation has no entry in the requirement table
    Unlisted,
    /// Capabilities could not be fetched; the operation proceeds unverified
    Unverified {
        /// Why the fetch failed
        reason: String,
    },
}

/// Capability checker backed by the remote tracker
#[derive(Debug)]
pub struct PermissionValidator {
    config: PermissionConfig,
    tracker: Arc<dyn IssueTrackerClient>,
    audit: Arc<AuditLogger>,
    cache: PermissionCache,
    cleanup: CleanupHandle,
}

impl PermissionValidator {
    /// Create a validator using the system clock
    pub fn new(
        config: PermissionConfig,
        tracker: Arc<dyn IssueTrackerClient>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self::with_clock(config, tracker, audit, system_clock())
    }

    /// Create a validator whose cache reads time from `clock`
    pub fn with_clock(
        config: PermissionConfig,
        tracker: Arc<dyn IssueTrackerClient>,
        audit: Arc<AuditLogger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = PermissionCache::new(
            Duration::from_secs(config.cache_timeout_secs),
            config.max_cache_entries,
            clock,
        );
        Self {
            config,
            tracker,
            audit,
            cache,
            cleanup: CleanupHandle::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &PermissionConfig {
        &self.config
    }

    /// The capability cache
    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    /// Compare what `operation` needs with what the caller holds in `scope`
    ///
    /// Fails with [`GatewayError::PermissionDenied`] naming the first missing
    /// required capability. Every other outcome, including a failed
    /// capability fetch, is returned as `Ok`.
    pub async fn check_operation_permissions(
        &self,
        operation: &str,
        scope: &PermissionScope,
    ) -> Result<PermissionCheck> {
        if !self.config.enabled {
            return Ok(PermissionCheck::Skipped);
        }

        let Some(requirements) = table::requirements(operation) else {
            tracing::info!(operation, "no permission requirements registered");
            self.audit.log(
                AuditEvent::new(operation, "permission")
                    .with_optional_resource_id(scope.resource_key.as_deref())
                    .with_detail("outcome", "unlisted")
                    .with_risk(RiskLevel::Medium),
            );
            return Ok(PermissionCheck::Unlisted);
        };

        let granted = match self.capabilities(scope).await {
            Ok(granted) => granted,
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(
                    operation,
                    scope = scope.cache_key(),
                    "permission lookup failed, proceeding unverified: {reason}"
                );
                self.audit.log(
                    AuditEvent::new(operation, "permission")
                        .with_optional_resource_id(scope.resource_key.as_deref())
                        .with_detail("scope", scope.cache_key())
                        .with_error(format!("permission lookup failed: {reason}"))
                        .with_risk(RiskLevel::Medium),
                );
                return Ok(PermissionCheck::Unverified { reason });
            }
        };

        let outcome = evaluate(requirements, &granted, scope)?;
        if let PermissionCheck::MissingOptional(missing) = &outcome {
            tracing::warn!(operation, ?missing, "optional capabilities missing");
            self.audit.log(
                AuditEvent::new(operation, "permission")
                    .with_optional_resource_id(scope.resource_key.as_deref())
                    .with_detail("missing_optional", missing.clone())
                    .with_risk(RiskLevel::Low),
            );
        }
        Ok(outcome)
    }

    async fn capabilities(&self, scope: &PermissionScope) -> Result<CapabilitySet> {
        let key = scope.cache_key();
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached);
        }
        let fetched = self.tracker.my_permissions(scope.project.as_deref()).await?;
        self.cache.insert(key, fetched.clone());
        Ok(fetched)
    }

    /// Purge expired cache entries every configured interval until [`PermissionValidator::destroy`]
    pub fn start_cleanup_task(self: &Arc<Self>) {
        let period = Duration::from_secs(self.config.cleanup_interval_secs.max(1));
        self.cleanup.start(self, period, "permission cache", |validator| {
            let purged = validator.cache.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "permission cache cleanup");
            }
        });
    }

    /// Stop background cleanup and empty the cache
    pub fn destroy(&self) {
        self.cleanup.stop();
        self.cache.clear();
    }
}

/// Decide from requirements and held capabilities
fn evaluate(
    requirements: &[Requirement],
    granted: &CapabilitySet,
    scope: &PermissionScope,
) -> Result<PermissionCheck> {
    let (missing_required, missing_optional): (Vec<&Requirement>, Vec<&Requirement>) =
        requirements
            .iter()
            .filter(|req| !table::holds(granted, req.capability))
            .partition(|req| req.required);

    if let Some(first) = missing_required.first() {
        return Err(GatewayError::PermissionDenied {
            capability: first.capability.to_string(),
            scope: scope.cache_key().to_string(),
        });
    }
    if missing_optional.is_empty() {
        Ok(PermissionCheck::Granted)
    } else {
        Ok(PermissionCheck::MissingOptional(
            missing_optional
                .iter()
                .map(|req| req.capability.to_string())
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditQuery;
    use crate::clock::MockClock;
    use crate::config::AuditConfig;
    use crate::tracker::MockIssueTracker;

    struct Fixture {
        tracker: Arc<MockIssueTracker>,
        audit: Arc<AuditLogger>,
        clock: MockClock,
        validator: PermissionValidator,
    }

    fn fixture(tracker: MockIssueTracker) -> Fixture {
        let clock = MockClock::new();
        let tracker = Arc::new(tracker);
        let audit = Arc::new(AuditLogger::with_clock(
            AuditConfig::default(),
            Arc::new(clock.clone()),
        ));
        let validator = PermissionValidator::with_clock(
            PermissionConfig::default(),
            tracker.clone(),
            audit.clone(),
            Arc::new(clock.clone()),
        );
        Fixture {
            tracker,
            audit,
            clock,
            validator,
        }
    }

    #[test]
    fn test_issue_scope() {
        let scope = PermissionScope::issue("PROJ-42");
        assert_eq!(scope.project.as_deref(), Some("PROJ"));
        assert_eq!(scope.cache_key(), "PROJ");
        assert_eq!(PermissionScope::issue("10042").cache_key(), GLOBAL_SCOPE);
    }

    #[tokio::test]
    async fn test_granted() {
        let f = fixture(MockIssueTracker::new());
        let check = f
            .validator
            .check_operation_permissions("update_issue", &PermissionScope::issue("PROJ-1"))
            .await
            .unwrap();
        assert_eq!(check, PermissionCheck::Granted);
    }

    #[tokio::test]
    async fn test_missing_required_denies() {
        let f = fixture(MockIssueTracker::new().with_permissions(["BROWSE_PROJECTS"]));
        match f
            .validator
            .check_operation_permissions("delete_issue", &PermissionScope::issue("PROJ-1"))
            .await
        {
            Err(GatewayError::PermissionDenied { capability, scope }) => {
                assert_eq!(capability, "DELETE_ISSUES");
                assert_eq!(scope, "PROJ");
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_optional_warns() {
        let f = fixture(MockIssueTracker::new().with_permissions(["CREATE_ISSUES"]));
        let check = f
            .validator
            .check_operation_permissions("create_issue", &PermissionScope::project("PROJ"))
            .await
            .unwrap();
        assert_eq!(
            check,
            PermissionCheck::MissingOptional(vec!["ASSIGN_ISSUES".to_string()])
        );
        let logged = f.audit.query(&AuditQuery::new().with_risk(RiskLevel::Low));
        assert_eq!(logged.len(), 1);
    }

    #[tokio::test]
    async fn test_admin_capabilities_imply() {
        let f = fixture(MockIssueTracker::new().with_permissions(["ADMINISTER_PROJECTS"]));
        let check = f
            .validator
            .check_operation_permissions("delete_attachment", &PermissionScope::project("PROJ"))
            .await
            .unwrap();
        assert_eq!(check, PermissionCheck::Granted);
    }

    #[tokio::test]
    async fn test_unlisted_operation_proceeds() {
        let f = fixture(MockIssueTracker::new());
        let check = f
            .validator
            .check_operation_permissions("list_projects", &PermissionScope::global())
            .await
            .unwrap();
        assert_eq!(check, PermissionCheck::Unlisted);
        assert_eq!(f.tracker.calls("my_permissions"), 0);
        assert_eq!(f.audit.recent(1)[0].risk_level, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_open() {
        let f = fixture(MockIssueTracker::new());
        f.tracker.fail("my_permissions");

        let check = f
            .validator
            .check_operation_permissions("delete_issue", &PermissionScope::issue("PROJ-1"))
            .await
            .unwrap();
        assert!(matches!(check, PermissionCheck::Unverified { .. }));
        assert_eq!(f.audit.failed_operations(10).len(), 1);
        assert!(f.validator.cache().is_empty());
    }

    #[tokio::test]
    async fn test_capabilities_cached_per_scope() {
        let f = fixture(MockIssueTracker::new());
        let scope = PermissionScope::project("PROJ");
        for _ in 0..3 {
            f.validator
                .check_operation_permissions("get_issue", &scope)
                .await
                .unwrap();
        }
        assert_eq!(f.tracker.calls("my_permissions"), 1);

        f.validator
            .check_operation_permissions("get_issue", &PermissionScope::project("OTHER"))
            .await
            .unwrap();
        assert_eq!(f.tracker.calls("my_permissions"), 2);

        f.clock.advance(Duration::from_secs(301));
        f.validator
            .check_operation_permissions("get_issue", &scope)
            .await
            .unwrap();
        assert_eq!(f.tracker.calls("my_permissions"), 3);
    }

    #[tokio::test]
    async fn test_disabled_skips() {
        let tracker: Arc<dyn IssueTrackerClient> = Arc::new(MockIssueTracker::new());
        let validator = PermissionValidator::new(
            PermissionConfig {
                enabled: false,
                ..PermissionConfig::default()
            },
            tracker,
            Arc::new(AuditLogger::new(AuditConfig::default())),
        );
        let check = validator
            .check_operation_permissions("delete_issue", &PermissionScope::global())
            .await
            .unwrap();
        assert_eq!(check, PermissionCheck::Skipped);
    }
}
