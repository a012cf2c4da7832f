//! Audit log query tool for MCP operations

use crate::audit::{AuditEntry, AuditLogger, AuditQuery};
use crate::error::{GatewayError, Result};
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::types::{AuditView, GetAuditLogRequest, DEFAULT_AUDIT_LIMIT, MAX_AUDIT_LIMIT};
use crate::mcp::utils::tool_schema;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;
use serde_json::{json, Value};

/// Tool for reading recent audit entries
#[derive(Default)]
pub struct GetAuditLogTool;

impl GetAuditLogTool {
    /// Creates a new instance of the GetAuditLogTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for GetAuditLogTool {
    fn name(&self) -> &'static str {
        "get_audit_log"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<GetAuditLogRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: GetAuditLogRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let now = dispatcher.governance().clock.wall_now();
        respond(self.name(), read_log(dispatcher.audit(), &request, now))
    }
}

fn read_log(
    audit: &AuditLogger,
    request: &GetAuditLogRequest,
    now: DateTime<Utc>,
) -> Result<Value> {
    let limit = request.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    if !(1..=MAX_AUDIT_LIMIT).contains(&limit) {
        return Err(GatewayError::validation(
            "limit",
            format!("{limit} is outside 1..={MAX_AUDIT_LIMIT}"),
        ));
    }

    let entries: Vec<AuditEntry> = match request.view {
        AuditView::Security => audit.security_events(limit),
        AuditView::Failed => audit.failed_operations(limit),
        AuditView::HighRisk => audit.high_risk_operations(limit),
        AuditView::All => audit.query(&build_query(request, limit, now)),
    };

    Ok(json!({
        "count": entries.len(),
        "total_entries": audit.len(),
        "entries": entries,
    }))
}

fn build_query(request: &GetAuditLogRequest, limit: usize, now: DateTime<Utc>) -> AuditQuery {
    let mut query = AuditQuery::new().with_limit(limit);
    if let Some(operation) = &request.operation {
        query = query.with_operation(operation.trim());
    }
    if let Some(resource) = &request.resource_type {
        query = query.with_resource_type(resource.trim());
    }
    if let Some(risk) = request.risk_level {
        query = query.with_risk(risk);
    }
    if let Some(success) = request.success {
        query = query.with_success(success);
    }
    if let Some(hours) = request.since_hours {
        query = query.since(now - Duration::hours(i64::from(hours)));
    }
    query
}
