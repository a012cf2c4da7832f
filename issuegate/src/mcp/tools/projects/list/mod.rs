//! Project listing tool for MCP operations

use crate::common::OperationClass;
use crate::error::Result;
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::tools::page_size;
use crate::mcp::types::{ListProjectsRequest, DEFAULT_LIST_RESULTS};
use crate::mcp::utils::tool_schema;
use crate::validation::{validate_text, FieldValidationOptions};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;

/// Tool for listing visible projects
#[derive(Default)]
pub struct ListProjectsTool;

impl ListProjectsTool {
    /// Creates a new instance of the ListProjectsTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for ListProjectsTool {
    fn name(&self) -> &'static str {
        "list_projects"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<ListProjectsRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: ListProjectsRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();
        let options = FieldValidationOptions::from(&dispatcher.config().security);

        let operation = GovernedOperation::new(self.name(), "project", OperationClass::Standard);

        let outcome = dispatcher
            .run(
                operation,
                || -> Result<(Option<String>, u32)> {
                    let query = request
                        .query
                        .as_deref()
                        .map(|q| validate_text("query", q, &options))
                        .transpose()?;
                    let max = page_size("max_results", request.max_results, DEFAULT_LIST_RESULTS)?;
                    Ok((query, max))
                },
                |(query, max)| async move { tracker.list_projects(query.as_deref(), max).await },
            )
            .await;
        respond(self.name(), outcome)
    }
}
