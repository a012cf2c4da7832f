//! Board listing tool for MCP operations

use crate::common::OperationClass;
use crate::error::Result;
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::tools::page_size;
use crate::mcp::types::{ListBoardsRequest, DEFAULT_LIST_RESULTS};
use crate::mcp::utils::tool_schema;
use crate::permissions::PermissionScope;
use crate::validation::validate_project_key;
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;

/// Tool for listing agile boards
#[derive(Default)]
pub struct ListBoardsTool;

impl ListBoardsTool {
    /// Creates a new instance of the ListBoardsTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for ListBoardsTool {
    fn name(&self) -> &'static str {
        "list_boards"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<ListBoardsRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: ListBoardsRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();

        let scope = match request.project_key.as_deref() {
            Some(project) => PermissionScope::project(project.trim()),
            None => PermissionScope::global(),
        };
        let operation = GovernedOperation::new(self.name(), "board", OperationClass::Standard)
            .with_scope(scope);

        let outcome = dispatcher
            .run(
                operation,
                || -> Result<(Option<String>, u32)> {
                    let project = request
                        .project_key
                        .as_deref()
                        .map(|p| validate_project_key("project_key", p))
                        .transpose()?;
                    let max = page_size("max_results", request.max_results, DEFAULT_LIST_RESULTS)?;
                    Ok((project, max))
                },
                |(project, max)| async move { tracker.list_boards(project.as_deref(), max).await },
            )
            .await;
        respond(self.name(), outcome)
    }
}
