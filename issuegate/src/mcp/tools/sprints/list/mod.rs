//! Sprint listing tool for MCP operations

use crate::common::OperationClass;
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::types::ListSprintsRequest;
use crate::mcp::utils::tool_schema;
use crate::validation::validate_numeric_id;
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;

/// Tool for listing the sprints of a board
#[derive(Default)]
pub struct ListSprintsTool;

impl ListSprintsTool {
    /// Creates a new instance of the ListSprintsTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for ListSprintsTool {
    fn name(&self) -> &'static str {
        "list_sprints"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<ListSprintsRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: ListSprintsRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();
        let state = request.state.map(|s| s.as_str());

        let operation = GovernedOperation::new(self.name(), "sprint", OperationClass::Standard)
            .with_resource_id(request.board_id.trim());

        let outcome = dispatcher
            .run(
                operation,
                || validate_numeric_id("board_id", &request.board_id),
                |board| async move { tracker.list_sprints(&board, state).await },
            )
            .await;
        respond(self.name(), outcome)
    }
}
