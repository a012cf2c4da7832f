//! The governance components, built and torn down together

use crate::audit::AuditLogger;
use crate::clock::{system_clock, Clock};
use crate::common::RateLimiters;
use crate::config::GatewayConfig;
use crate::permissions::PermissionValidator;
use crate::tracker::IssueTrackerClient;
use std::sync::Arc;
use std::time::Duration;

/// Rate limiters, audit journal and permission validator sharing one config and clock
///
/// Components are plain instances owned by this bundle and handed to the
/// dispatcher; nothing is process-global.
#[derive(Debug, Clone)]
pub struct Governance {
    /// Validated configuration
    pub config: Arc<GatewayConfig>,
    /// Time source shared by every component
    pub clock: Arc<dyn Clock>,
    /// One limiter per operation class
    pub rate_limiters: Arc<RateLimiters>,
    /// Audit journal
    pub audit: Arc<AuditLogger>,
    /// Advisory capability checks
    pub permissions: Arc<PermissionValidator>,
    /// Remote tracker
    pub tracker: Arc<dyn IssueTrackerClient>,
}

impl Governance {
    /// Build every component with the system clock
    pub fn new(config: GatewayConfig, tracker: Arc<dyn IssueTrackerClient>) -> Self {
        Self::with_clock(config, tracker, system_clock())
    }

    /// Build every component reading time from `clock`
    pub fn with_clock(
        config: GatewayConfig,
        tracker: Arc<dyn IssueTrackerClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rate_limiters = Arc::new(RateLimiters::new(&config.rate_limits, clock.clone()));
        let audit = Arc::new(AuditLogger::with_clock(config.audit.clone(), clock.clone()));
        let permissions = Arc::new(PermissionValidator::with_clock(
            config.permissions.clone(),
            tracker.clone(),
            audit.clone(),
            clock.clone(),
        ));
        Self {
            config: Arc::new(config),
            clock,
            rate_limiters,
            audit,
            permissions,
            tracker,
        }
    }

    /// Spawn the periodic cleanup of every component
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_background_tasks(&self) {
        let period = Duration::from_secs(self.config.rate_limits.cleanup_interval_secs.max(1));
        self.rate_limiters.start_cleanup_tasks(period);
        self.audit.start_cleanup_task();
        self.permissions.start_cleanup_task();
        tracing::debug!("governance cleanup tasks started");
    }

    /// Stop every background task and drop all in-memory state
    pub fn destroy(&self) {
        self.rate_limiters.destroy();
        self.permissions.destroy();
        self.audit.destroy();
        tracing::debug!("governance components destroyed");
    }
}
