//! Issue retrieval tool for MCP operations

use crate::common::OperationClass;
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::types::GetIssueRequest;
use crate::mcp::utils::tool_schema;
use crate::permissions::PermissionScope;
use crate::validation::validate_issue_key;
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;

/// Tool for reading a single issue
#[derive(Default)]
pub struct GetIssueTool;

impl GetIssueTool {
    /// Creates a new instance of the GetIssueTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for GetIssueTool {
    fn name(&self) -> &'static str {
        "get_issue"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<GetIssueRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: GetIssueRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();
        let fields = request.fields.unwrap_or_default();

        let operation = GovernedOperation::new(self.name(), "issue", OperationClass::Standard)
            .with_resource_id(request.issue_key.trim())
            .with_scope(PermissionScope::issue(request.issue_key.trim()));

        let outcome = dispatcher
            .run(
                operation,
                || validate_issue_key("issue_key", &request.issue_key),
                |key| async move { tracker.get_issue(&key, &fields).await },
            )
            .await;
        respond(self.name(), outcome)
    }
}
