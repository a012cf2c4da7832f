//! MCP server implementation for the governed tracker tools

use super::dispatcher::Dispatcher;
use super::tool_registry::{ToolContext, ToolRegistry};
use super::tools::register_all_tools;
use crate::config::GatewayConfig;
use crate::governance::Governance;
use crate::tracker::{IssueTrackerClient, JiraRestClient};
use crate::Result;
use rmcp::model::*;
use rmcp::service::RequestContext;
use rmcp::{Error as McpError, RoleServer, ServerHandler};
use std::sync::Arc;

const INSTRUCTIONS: &str = "A governed gateway to the Jira issue tracker. Every remote call is \
rate limited, validated and recorded in an in-memory audit journal. Use search_issues and \
get_issue to read, the create/update/transition/comment tools to edit, and get_audit_log or \
get_audit_stats to review what was done. Destructive tools require the configured \
confirmation phrase in `confirm`.";

/// MCP server exposing the gateway tools
#[derive(Clone)]
pub struct McpServer {
    tool_registry: Arc<ToolRegistry>,
    dispatcher: Arc<Dispatcher>,
    /// Tool context for MCP operations
    pub tool_context: Arc<ToolContext>,
}

impl McpServer {
    /// Create a server over already built governance components
    pub fn new(governance: Governance) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(governance));

        let mut tool_registry = ToolRegistry::new();
        register_all_tools(&mut tool_registry);

        let tool_context = Arc::new(ToolContext::new(dispatcher.clone()));

        Self {
            tool_registry: Arc::new(tool_registry),
            dispatcher,
            tool_context,
        }
    }

    /// Create a server talking to `tracker` and start the cleanup tasks
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_tracker(config: GatewayConfig, tracker: Arc<dyn IssueTrackerClient>) -> Self {
        let governance = Governance::new(config, tracker);
        governance.start_background_tasks();
        Self::new(governance)
    }

    /// Create a server for the configured remote tracker
    pub fn from_config(config: GatewayConfig) -> Result<Self> {
        config.require_connection()?;
        let tracker = JiraRestClient::new(&config.connection)?;
        tracing::info!(
            base_url = %tracker.base_url(),
            "connecting to remote tracker"
        );
        Ok(Self::with_tracker(config, Arc::new(tracker)))
    }

    /// The dispatcher every tool runs through
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Names of the tools currently offered, honouring the operation switches
    pub fn enabled_tool_names(&self) -> Vec<String> {
        self.enabled_tools().into_iter().map(|t| t.name.to_string()).collect()
    }

    fn enabled_tools(&self) -> Vec<Tool> {
        let dispatcher = &self.dispatcher;
        self.tool_registry
            .list_tools_where(|name| dispatcher.is_enabled(name))
    }

    /// Stop background tasks and drop all governance state
    pub fn shutdown(&self) {
        tracing::info!("shutting down governance components");
        self.dispatcher.governance().destroy();
    }

    fn capabilities() -> ServerCapabilities {
        ServerCapabilities {
            prompts: None,
            tools: Some(ToolsCapability {
                list_changed: Some(true),
            }),
            resources: None,
            logging: None,
            completions: None,
            experimental: None,
        }
    }

    fn implementation() -> Implementation {
        Implementation {
            name: "issuegate".into(),
            version: crate::VERSION.into(),
        }
    }
}

impl ServerHandler for McpServer {
    async fn initialize(
        &self,
        request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<InitializeResult, McpError> {
        tracing::info!(
            "MCP client connecting: {} v{}",
            request.client_info.name,
            request.client_info.version
        );

        Ok(self.get_info())
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.enabled_tools(),
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> std::result::Result<CallToolResult, McpError> {
        if let Some(tool) = self.tool_registry.get_tool(&request.name) {
            tool.execute(request.arguments.unwrap_or_default(), &self.tool_context)
                .await
        } else {
            Err(McpError::invalid_request(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        }
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: Self::capabilities(),
            server_info: Self::implementation(),
            instructions: Some(INSTRUCTIONS.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::test_utils::test_config;
    use crate::tracker::MockIssueTracker;

    fn server_with(configure: impl FnOnce(&mut GatewayConfig)) -> McpServer {
        let mut config = test_config();
        configure(&mut config);
        let governance = Governance::with_clock(
            config,
            Arc::new(MockIssueTracker::new()),
            Arc::new(MockClock::new()),
        );
        McpServer::new(governance)
    }

    #[test]
    fn test_server_info() {
        let server = server_with(|_| {});
        let info = server.get_info();
        assert_eq!(info.server_info.name, "issuegate");
        assert_eq!(info.server_info.version, crate::VERSION);
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.prompts.is_none());
        assert!(info.instructions.unwrap().contains("confirm"));
    }

    #[test]
    fn test_all_tools_listed_by_default() {
        let server = server_with(|_| {});
        let names = server.enabled_tool_names();
        assert_eq!(names.len(), 17);
        assert!(names.contains(&"delete_issue".to_string()));
        assert!(names.contains(&"get_audit_log".to_string()));
    }

    #[test]
    fn test_disabled_operations_not_listed() {
        let server = server_with(|config| {
            config.operations.enable_delete = false;
            config.operations.enable_attachments = false;
        });
        let names = server.enabled_tool_names();
        assert_eq!(names.len(), 13);
        for hidden in [
            "delete_issue",
            "upload_attachment",
            "download_attachment",
            "delete_attachment",
        ] {
            assert!(!names.iter().any(|n| n == hidden), "{hidden} listed");
        }
        assert!(names.contains(&"search_issues".to_string()));
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let err = McpServer::from_config(GatewayConfig::default()).err().unwrap();
        assert!(err.to_string().contains("connection.base_url"));
    }
}
