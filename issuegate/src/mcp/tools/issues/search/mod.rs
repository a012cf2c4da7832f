//! Issue search tool for MCP operations

use crate::common::OperationClass;
use crate::error::{GatewayError, Result};
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::tools::page_size;
use crate::mcp::types::{SearchIssuesRequest, DEFAULT_SEARCH_RESULTS};
use crate::mcp::utils::tool_schema;
use crate::security::sanitize_jql;
use crate::tracker::SearchRequest;
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;

/// Tool for running JQL searches
#[derive(Default)]
pub struct SearchIssuesTool;

impl SearchIssuesTool {
    /// Creates a new instance of the SearchIssuesTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for SearchIssuesTool {
    fn name(&self) -> &'static str {
        "search_issues"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<SearchIssuesRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: SearchIssuesRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();

        let operation = GovernedOperation::new(self.name(), "search", OperationClass::Search)
            .with_detail("jql_length", request.jql.chars().count())
            .with_detail(
                "max_results",
                request.max_results.unwrap_or(DEFAULT_SEARCH_RESULTS),
            );

        let outcome = dispatcher
            .run(
                operation,
                || search_request(&request),
                |search| async move { tracker.search_issues(&search).await },
            )
            .await;
        respond(self.name(), outcome)
    }
}

fn search_request(request: &SearchIssuesRequest) -> Result<SearchRequest> {
    let jql = sanitize_jql(&request.jql)?;
    if jql.is_empty() {
        return Err(GatewayError::validation("jql", "cannot be empty"));
    }
    let max_results = page_size("max_results", request.max_results, DEFAULT_SEARCH_RESULTS)?;
    let fields = request
        .fields
        .iter()
        .flatten()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();

    Ok(SearchRequest {
        jql,
        start_at: request.start_at.unwrap_or(0),
        max_results,
        fields,
    })
}
