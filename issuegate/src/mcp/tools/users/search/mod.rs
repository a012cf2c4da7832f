//! User search tool for MCP operations

use crate::common::OperationClass;
use crate::error::Result;
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::tools::page_size;
use crate::mcp::types::{SearchUsersRequest, DEFAULT_LIST_RESULTS};
use crate::mcp::utils::tool_schema;
use crate::validation::{validate_text, FieldValidationOptions};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;

/// Tool for finding users by name or email
#[derive(Default)]
pub struct SearchUsersTool;

impl SearchUsersTool {
    /// Creates a new instance of the SearchUsersTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for SearchUsersTool {
    fn name(&self) -> &'static str {
        "search_users"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<SearchUsersRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: SearchUsersRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();
        let options = FieldValidationOptions::from(&dispatcher.config().security);

        let operation = GovernedOperation::new(self.name(), "user", OperationClass::Standard);

        let outcome = dispatcher
            .run(
                operation,
                || -> Result<(String, u32)> {
                    let query = validate_text("query", &request.query, &options)?;
                    let max = page_size("max_results", request.max_results, DEFAULT_LIST_RESULTS)?;
                    Ok((query, max))
                },
                |(query, max)| async move { tracker.search_users(&query, max).await },
            )
            .await;
        respond(self.name(), outcome)
    }
}
