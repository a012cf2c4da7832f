//! Sliding-window rate limiting for governed operations
//!
//! Each [`RateLimiter`] enforces one policy over many keys. A key is an
//! operation class combined with a caller identifier (`"search:mcp"`), and
//! holds the timestamps of requests admitted within the trailing window.
//! Admission is blocking: callers are delayed in place for burst penalties and
//! steady-state pacing, and rejected outright when the window is full.

use crate::clock::{system_clock, Clock};
use crate::common::background::CleanupHandle;
use crate::{GatewayError, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default cap on the number of tracked keys per limiter
pub const DEFAULT_MAX_TRACKED_KEYS: usize = 1000;

/// Default period of the background cleanup task
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Rate-limit policy bucket an operation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationClass {
    /// Ordinary reads and writes
    Standard,
    /// Query-language searches
    Search,
    /// Attachment transfer
    File,
    /// Multi-issue updates
    Bulk,
}

impl OperationClass {
    /// All classes, in declaration order
    pub const ALL: [OperationClass; 4] = [
        OperationClass::Standard,
        OperationClass::Search,
        OperationClass::File,
        OperationClass::Bulk,
    ];

    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationClass::Standard => "standard",
            OperationClass::Search => "search",
            OperationClass::File => "file",
            OperationClass::Bulk => "bulk",
        }
    }

    /// Rate-limit key for a caller within this class
    pub fn key_for(&self, caller: &str) -> String {
        format!("{}:{}", self.as_str(), caller)
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy for one rate limiter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Requests admitted per window
    pub max_requests: usize,
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Requests within a tenth of the window that trigger the burst penalty
    pub burst_limit: usize,
    /// Pacing delay in milliseconds; the burst penalty is twice this
    pub delay_ms: u64,
}

impl RateLimiterConfig {
    /// 60 per minute, 15 burst, 50ms pacing
    pub fn standard() -> Self {
        Self {
            max_requests: 60,
            window_ms: 60_000,
            burst_limit: 15,
            delay_ms: 50,
        }
    }

    /// 30 per minute, 8 burst, 100ms pacing
    pub fn search() -> Self {
        Self {
            max_requests: 30,
            window_ms: 60_000,
            burst_limit: 8,
            delay_ms: 100,
        }
    }

    /// 5 per minute, 2 burst, 500ms pacing
    pub fn file() -> Self {
        Self {
            max_requests: 5,
            window_ms: 60_000,
            burst_limit: 2,
            delay_ms: 500,
        }
    }

    /// 10 per minute, 3 burst, 200ms pacing
    pub fn bulk() -> Self {
        Self {
            max_requests: 10,
            window_ms: 60_000,
            burst_limit: 3,
            delay_ms: 200,
        }
    }

    /// Built-in policy for a class
    pub fn for_class(class: OperationClass) -> Self {
        match class {
            OperationClass::Standard => Self::standard(),
            OperationClass::Search => Self::search(),
            OperationClass::File => Self::file(),
            OperationClass::Bulk => Self::bulk(),
        }
    }

    /// Full window as a duration
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Burst sub-window, one tenth of the full window
    pub fn burst_window(&self) -> Duration {
        self.window() / 10
    }

    /// Steady-state pacing delay
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Describe the first invalid setting, if any
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.max_requests == 0 {
            return Err("max_requests must be greater than zero".to_string());
        }
        if self.window_ms == 0 {
            return Err("window_ms must be greater than zero".to_string());
        }
        if self.burst_limit == 0 || self.burst_limit > self.max_requests {
            return Err(format!(
                "burst_limit must be between 1 and max_requests ({})",
                self.max_requests
            ));
        }
        Ok(())
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Delays applied while admitting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Admission {
    /// The burst penalty (twice the pacing delay) was applied
    pub burst_penalty: bool,
    /// The steady-state pacing delay was applied
    pub paced: bool,
    /// Total time the caller was suspended
    pub delayed: Duration,
}

/// Read-only view of one key's window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStats {
    /// Requests recorded in the current window
    pub used: usize,
    /// Requests still admissible in the current window
    pub remaining: usize,
    /// Configured maximum per window
    pub limit: usize,
    /// Window length
    pub window: Duration,
}

/// Sliding-window limiter for a single policy
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    windows: DashMap<String, VecDeque<Instant>>,
    clock: Arc<dyn Clock>,
    max_tracked_keys: usize,
    cleanup: CleanupHandle,
}

impl RateLimiter {
    /// Create a limiter using the system clock
    pub fn new(config: RateLimiterConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    /// Create a limiter reading time from `clock`
    pub fn with_clock(config: RateLimiterConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            clock,
            max_tracked_keys: DEFAULT_MAX_TRACKED_KEYS,
            cleanup: CleanupHandle::new(),
        }
    }

    /// Override the tracked-key cap enforced by [`RateLimiter::cleanup`]
    pub fn with_max_tracked_keys(mut self, max: usize) -> Self {
        self.max_tracked_keys = max;
        self
    }

    /// The policy this limiter enforces
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Admit a request for `key`, suspending for burst or pacing delays
    ///
    /// Fails with [`GatewayError::RateLimited`] when the window is full; the
    /// reported wait is derived from the oldest retained timestamp.
    pub async fn check_and_wait(&self, key: &str) -> Result<Admission> {
        let mut admission = Admission::default();

        let in_burst = {
            let now = self.clock.now();
            let mut window = self.windows.entry(key.to_string()).or_default();
            self.prune(&mut window, now);
            self.reject_if_full(key, &window, now)?;
            self.recent_count(&window, now) >= self.config.burst_limit
        };

        if in_burst {
            let penalty = self.config.delay() * 2;
            tracing::debug!(key, ?penalty, "burst limit reached, applying penalty");
            tokio::time::sleep(penalty).await;
            admission.burst_penalty = true;
            admission.delayed += penalty;
        }

        // state may have moved while suspended, so re-check before recording
        let recorded = {
            let now = self.clock.now();
            let mut window = self.windows.entry(key.to_string()).or_default();
            self.prune(&mut window, now);
            self.reject_if_full(key, &window, now)?;
            window.push_back(now);
            window.len()
        };

        if recorded > 1 {
            let delay = self.config.delay();
            tokio::time::sleep(delay).await;
            admission.paced = true;
            admission.delayed += delay;
        }

        Ok(admission)
    }

    /// Current usage for `key` without recording anything
    pub fn stats(&self, key: &str) -> RateLimitStats {
        let now = self.clock.now();
        let window = self.config.window();
        let used = self
            .windows
            .get(key)
            .map(|w| {
                w.iter()
                    .filter(|t| now.saturating_duration_since(**t) < window)
                    .count()
            })
            .unwrap_or(0);

        RateLimitStats {
            used,
            remaining: self.config.max_requests.saturating_sub(used),
            limit: self.config.max_requests,
            window,
        }
    }

    /// Record a request at `at` without admission checks
    ///
    /// Used to restore or seed window state.
    pub fn record(&self, key: &str, at: Instant) {
        let mut window = self.windows.entry(key.to_string()).or_default();
        let pos = window.partition_point(|t| *t <= at);
        window.insert(pos, at);
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Drop expired timestamps, empty keys and, above the key cap, the least recently active keys
    ///
    /// Returns the number of keys removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();

        self.windows.retain(|_, window| {
            self.prune(window, now);
            !window.is_empty()
        });

        let excess = self.windows.len().saturating_sub(self.max_tracked_keys);
        if excess > 0 {
            let mut activity: Vec<(String, Instant)> = self
                .windows
                .iter()
                .filter_map(|entry| entry.value().back().map(|t| (entry.key().clone(), *t)))
                .collect();
            activity.sort_by_key(|(_, last)| *last);
            for (key, _) in activity.into_iter().take(excess) {
                self.windows.remove(&key);
            }
        }

        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.windows.len(), "rate limiter cleanup");
        }
        removed
    }

    /// Run [`RateLimiter::cleanup`] periodically until [`RateLimiter::destroy`]
    pub fn start_cleanup_task(self: &Arc<Self>, period: Duration) {
        self.cleanup.start(self, period, "rate limiter", |limiter| {
            limiter.cleanup();
        });
    }

    /// Stop background cleanup and forget all windows
    pub fn destroy(&self) {
        self.cleanup.stop();
        self.windows.clear();
    }

    fn prune(&self, window: &mut VecDeque<Instant>, now: Instant) {
        let span = self.config.window();
        while let Some(oldest) = window.front() {
            if now.saturating_duration_since(*oldest) >= span {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    fn recent_count(&self, window: &VecDeque<Instant>, now: Instant) -> usize {
        let burst = self.config.burst_window();
        window
            .iter()
            .rev()
            .take_while(|t| now.saturating_duration_since(**t) < burst)
            .count()
    }

    fn reject_if_full(&self, key: &str, window: &VecDeque<Instant>, now: Instant) -> Result<()> {
        if window.len() < self.config.max_requests {
            return Ok(());
        }
        let wait = window
            .front()
            .map(|oldest| {
                self.config
                    .window()
                    .saturating_sub(now.saturating_duration_since(*oldest))
            })
            .unwrap_or_default();
        let retry_after_secs = wait.as_millis().div_ceil(1000) as u64;

        tracing::warn!(key, retry_after_secs, "rate limit exceeded");
        Err(GatewayError::RateLimited {
            key: key.to_string(),
            retry_after_secs,
        })
    }
}

/// One limiter per operation class
#[derive(Debug)]
pub struct RateLimiters {
    standard: Arc<RateLimiter>,
    search: Arc<RateLimiter>,
    file: Arc<RateLimiter>,
    bulk: Arc<RateLimiter>,
}

impl RateLimiters {
    /// Build limiters from per-class policies
    pub fn new(
        policies: &crate::config::RateLimitsConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let build = |config: &RateLimiterConfig| {
            Arc::new(
                RateLimiter::with_clock(config.clone(), clock.clone())
                    .with_max_tracked_keys(policies.max_tracked_keys),
            )
        };
        Self {
            standard: build(&policies.standard),
            search: build(&policies.search),
            file: build(&policies.file),
            bulk: build(&policies.bulk),
        }
    }

    /// Limiter for a class
    pub fn for_class(&self, class: OperationClass) -> &Arc<RateLimiter> {
        match class {
            OperationClass::Standard => &self.standard,
            OperationClass::Search => &self.search,
            OperationClass::File => &self.file,
            OperationClass::Bulk => &self.bulk,
        }
    }

    /// Start cleanup on every limiter
    pub fn start_cleanup_tasks(&self, period: Duration) {
        for class in OperationClass::ALL {
            self.for_class(class).start_cleanup_task(period);
        }
    }

    /// Tear down every limiter
    pub fn destroy(&self) {
        for class in OperationClass::ALL {
            self.for_class(class).destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use proptest::prelude::*;

    fn fast_config(max_requests: usize, burst_limit: usize) -> RateLimiterConfig {
        RateLimiterConfig {
            max_requests,
            window_ms: 60_000,
            burst_limit,
            delay_ms: 1,
        }
    }

    fn limiter(config: RateLimiterConfig) -> (RateLimiter, MockClock) {
        let clock = MockClock::new();
        let limiter = RateLimiter::with_clock(config, Arc::new(clock.clone()));
        (limiter, clock)
    }

    #[test]
    fn test_builtin_policies() {
        let search = RateLimiterConfig::for_class(OperationClass::Search);
        assert_eq!((search.max_requests, search.burst_limit, search.delay_ms), (30, 8, 100));
        let file = RateLimiterConfig::for_class(OperationClass::File);
        assert_eq!((file.max_requests, file.burst_limit, file.delay_ms), (5, 2, 500));
        let bulk = RateLimiterConfig::for_class(OperationClass::Bulk);
        assert_eq!((bulk.max_requests, bulk.burst_limit, bulk.delay_ms), (10, 3, 200));
        assert_eq!(RateLimiterConfig::default(), RateLimiterConfig::standard());
        assert_eq!(OperationClass::Search.key_for("mcp"), "search:mcp");
    }

    #[test]
    fn test_config_check() {
        assert!(RateLimiterConfig::standard().check().is_ok());
        let mut bad = RateLimiterConfig::standard();
        bad.burst_limit = bad.max_requests + 1;
        assert!(bad.check().is_err());
        bad = RateLimiterConfig::standard();
        bad.window_ms = 0;
        assert!(bad.check().is_err());
    }

    #[tokio::test]
    async fn test_first_request_is_not_delayed() {
        let (limiter, _clock) = limiter(fast_config(5, 5));
        let admission = limiter.check_and_wait("standard:a").await.unwrap();
        assert_eq!(admission, Admission::default());
        assert_eq!(limiter.stats("standard:a").used, 1);
    }

    #[tokio::test]
    async fn test_second_request_is_paced() {
        let (limiter, _clock) = limiter(fast_config(5, 5));
        limiter.check_and_wait("k").await.unwrap();
        let admission = limiter.check_and_wait("k").await.unwrap();
        assert!(admission.paced);
        assert!(!admission.burst_penalty);
    }

    #[tokio::test]
    async fn test_full_window_rejects_with_wait_time() {
        let (limiter, clock) = limiter(fast_config(3, 3));
        for _ in 0..3 {
            limiter.check_and_wait("k").await.unwrap();
        }
        clock.advance(Duration::from_secs(20));

        match limiter.check_and_wait("k").await {
            Err(GatewayError::RateLimited {
                key,
                retry_after_secs,
            }) => {
                assert_eq!(key, "k");
                assert_eq!(retry_after_secs, 40);
            }
            other => panic!("Expected RateLimited, got {other:?}"),
        }
        assert_eq!(limiter.stats("k").used, 3);
    }

    #[tokio::test]
    async fn test_window_slides() {
        let (limiter, clock) = limiter(fast_config(2, 2));
        limiter.check_and_wait("k").await.unwrap();
        limiter.check_and_wait("k").await.unwrap();
        assert!(limiter.check_and_wait("k").await.is_err());

        clock.advance(Duration::from_secs(61));
        assert!(limiter.check_and_wait("k").await.is_ok());
        assert_eq!(limiter.stats("k").used, 1);
    }

    #[tokio::test]
    async fn test_burst_penalty_applied() {
        let (limiter, _clock) = limiter(fast_config(10, 3));
        for _ in 0..3 {
            let admission = limiter.check_and_wait("k").await.unwrap();
            assert!(!admission.burst_penalty);
        }
        let admission = limiter.check_and_wait("k").await.unwrap();
        assert!(admission.burst_penalty);
        assert_eq!(admission.delayed, Duration::from_millis(3));
    }

    #[tokio::test]
    async fn test_burst_resets_after_sub_window() {
        let (limiter, clock) = limiter(fast_config(10, 2));
        limiter.check_and_wait("k").await.unwrap();
        limiter.check_and_wait("k").await.unwrap();
        clock.advance(Duration::from_secs(7));
        let admission = limiter.check_and_wait("k").await.unwrap();
        assert!(!admission.burst_penalty);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (limiter, _clock) = limiter(fast_config(1, 1));
        limiter.check_and_wait("search:a").await.unwrap();
        assert!(limiter.check_and_wait("search:a").await.is_err());
        assert!(limiter.check_and_wait("search:b").await.is_ok());
    }

    #[test]
    fn test_stats_for_unknown_key() {
        let (limiter, _clock) = limiter(fast_config(7, 2));
        let stats = limiter.stats("nobody");
        assert_eq!(stats.used, 0);
        assert_eq!(stats.remaining, 7);
        assert_eq!(stats.limit, 7);
        assert_eq!(stats.window, Duration::from_secs(60));
    }

    #[test]
    fn test_cleanup_removes_expired_and_empty_keys() {
        let (limiter, clock) = limiter(fast_config(5, 5));
        limiter.record("old", clock.now());
        clock.advance(Duration::from_secs(90));
        limiter.record("fresh", clock.now());

        assert_eq!(limiter.cleanup(), 1);
        assert_eq!(limiter.tracked_keys(), 1);
        assert_eq!(limiter.stats("fresh").used, 1);
    }

    #[test]
    fn test_cleanup_evicts_least_recently_active_keys() {
        let clock = MockClock::new();
        let limiter = RateLimiter::with_clock(fast_config(5, 5), Arc::new(clock.clone()))
            .with_max_tracked_keys(2);

        for key in ["a", "b", "c"] {
            limiter.record(key, clock.now());
            clock.advance(Duration::from_secs(1));
        }
        // "a" becomes active again, so "b" is now the stalest
        limiter.record("a", clock.now());

        limiter.cleanup();
        assert_eq!(limiter.tracked_keys(), 2);
        assert_eq!(limiter.stats("b").used, 0);
        assert_eq!(limiter.stats("a").used, 2);
        assert_eq!(limiter.stats("c").used, 1);
    }

    #[tokio::test]
    async fn test_destroy_clears_state_and_stops_task() {
        let limiter = Arc::new(RateLimiter::new(fast_config(5, 5)));
        limiter.start_cleanup_task(Duration::from_millis(10));
        limiter.check_and_wait("k").await.unwrap();
        limiter.destroy();
        assert_eq!(limiter.tracked_keys(), 0);
        assert!(!limiter.cleanup.is_running());
    }

    proptest! {
        #[test]
        fn prop_window_never_exceeds_max(
            max_requests in 1usize..12,
            steps in proptest::collection::vec(0u64..20_000, 1..60),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            let clock = MockClock::new();
            let config = RateLimiterConfig {
                max_requests,
                window_ms: 30_000,
                burst_limit: max_requests,
                delay_ms: 0,
            };
            let limiter = RateLimiter::with_clock(config, Arc::new(clock.clone()));

            for step in steps {
                clock.advance(Duration::from_millis(step));
                let result = rt.block_on(limiter.check_and_wait("k"));
                let stats = limiter.stats("k");
                prop_assert!(stats.used <= max_requests);
                if let Err(GatewayError::RateLimited { retry_after_secs, .. }) = result {
                    prop_assert!(retry_after_secs <= 30);
                    prop_assert_eq!(stats.used, max_requests);
                }
            }
        }
    }
}
