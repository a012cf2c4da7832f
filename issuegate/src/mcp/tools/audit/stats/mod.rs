//! Audit statistics tool for MCP operations

use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::types::GetAuditStatsRequest;
use crate::mcp::utils::tool_schema;
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;

/// Tool for aggregate audit counts
#[derive(Default)]
pub struct GetAuditStatsTool;

impl GetAuditStatsTool {
    /// Creates a new instance of the GetAuditStatsTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for GetAuditStatsTool {
    fn name(&self) -> &'static str {
        "get_audit_stats"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<GetAuditStatsRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let _request: GetAuditStatsRequest = BaseToolImpl::parse_arguments(arguments)?;
        let audit = context.dispatcher.audit();
        let outcome = serde_json::to_value(audit.stats())
            .map(|mut stats| {
                stats["estimated_memory_mb"] = audit.estimated_memory_mb().into();
                stats
            })
            .map_err(Into::into);
        respond(self.name(), outcome)
    }
}
