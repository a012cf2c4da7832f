//! Test utilities for IssueGate tests
//!
//! [`TestGateway`] wires the governance components to a [`MockIssueTracker`]
//! and a [`MockClock`], so unit and integration tests can drive tools end to
//! end without a network or real waiting.
//!
//! ```no_run
//! use issuegate::test_utils::TestGateway;
//! use serde_json::json;
//!
//! # async fn example() {
//! let gateway = TestGateway::new();
//! let result = gateway
//!     .call("search_issues", json!({"jql": "project = PROJ"}))
//!     .await;
//! assert!(result.is_ok());
//! # }
//! ```

use crate::audit::AuditLogger;
use crate::clock::MockClock;
use crate::common::{OperationClass, RateLimiter};
use crate::config::GatewayConfig;
use crate::governance::Governance;
use crate::mcp::dispatcher::{Dispatcher, DEFAULT_CALLER};
use crate::mcp::tool_registry::{ToolContext, ToolRegistry};
use crate::mcp::tools::register_all_tools;
use crate::tracker::MockIssueTracker;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;
use serde_json::Value;
use std::sync::Arc;

/// Base URL used by test configurations
pub const TEST_BASE_URL: &str = "https://example.atlassian.net";

/// Configuration for tests: dummy credentials and 1ms pacing for every class
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.connection.base_url = TEST_BASE_URL.to_string();
    config.connection.email = "bot@example.com".to_string();
    config.connection.api_token = "test-token".to_string();

    let limits = &mut config.rate_limits;
    for policy in [
        &mut limits.standard,
        &mut limits.search,
        &mut limits.file,
        &mut limits.bulk,
    ] {
        policy.delay_ms = 1;
    }
    config
}

/// Governance components over an in-memory tracker and a manual clock
pub struct TestGateway {
    tracker: Arc<MockIssueTracker>,
    clock: MockClock,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<ToolRegistry>,
}

impl Default for TestGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl TestGateway {
    /// Gateway with [`test_config`] and a tracker granting every capability
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start customising a gateway
    pub fn builder() -> TestGatewayBuilder {
        TestGatewayBuilder::default()
    }

    /// The in-memory tracker
    pub fn tracker(&self) -> &Arc<MockIssueTracker> {
        &self.tracker
    }

    /// The manual clock shared by every component
    pub fn clock(&self) -> &MockClock {
        &self.clock
    }

    /// Dispatcher over the test components
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Audit journal
    pub fn audit(&self) -> &Arc<AuditLogger> {
        self.dispatcher.audit()
    }

    /// Registry holding every gateway tool
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Tool context for direct `execute` calls
    pub fn context(&self) -> ToolContext {
        ToolContext::new(self.dispatcher.clone())
    }

    /// Limiter for an operation class
    pub fn rate_limiter(&self, class: OperationClass) -> &Arc<RateLimiter> {
        self.dispatcher.governance().rate_limiters.for_class(class)
    }

    /// Record `count` requests for the default caller at the current instant
    pub fn fill_rate_window(&self, class: OperationClass, count: usize) {
        let key = class.key_for(DEFAULT_CALLER);
        let now = crate::clock::Clock::now(&self.clock);
        let limiter = self.rate_limiter(class);
        for _ in 0..count {
            limiter.record(&key, now);
        }
    }

    /// Execute a tool by name, as the MCP server would
    pub async fn call(&self, tool: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(McpError::invalid_params(
                    format!("arguments must be an object, got {other}"),
                    None,
                ))
            }
        };
        match self.registry.get_tool(tool) {
            Some(tool) => tool.execute(arguments, &self.context()).await,
            None => Err(McpError::invalid_request(
                format!("Unknown tool: {tool}"),
                None,
            )),
        }
    }
}

/// Builder for [`TestGateway`]
pub struct TestGatewayBuilder {
    config: GatewayConfig,
    tracker: MockIssueTracker,
}

impl Default for TestGatewayBuilder {
    fn default() -> Self {
        Self {
            config: test_config(),
            tracker: MockIssueTracker::new(),
        }
    }
}

impl TestGatewayBuilder {
    /// Adjust the configuration
    pub fn configure(mut self, configure: impl FnOnce(&mut GatewayConfig)) -> Self {
        configure(&mut self.config);
        self
    }

    /// Capabilities the tracker grants
    pub fn permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tracker = self.tracker.with_permissions(permissions);
        self
    }

    /// Use a pre-seeded tracker
    pub fn tracker(mut self, tracker: MockIssueTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Build the gateway; background tasks are not started
    pub fn build(self) -> TestGateway {
        let tracker = Arc::new(self.tracker);
        let clock = MockClock::new();
        let governance =
            Governance::with_clock(self.config, tracker.clone(), Arc::new(clock.clone()));
        let dispatcher = Arc::new(Dispatcher::new(governance));

        let mut registry = ToolRegistry::new();
        register_all_tools(&mut registry);

        TestGateway {
            tracker,
            clock,
            dispatcher,
            registry: Arc::new(registry),
        }
    }
}
