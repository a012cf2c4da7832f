//! Issue update tool for MCP operations

use crate::common::OperationClass;
use crate::error::{GatewayError, Result};
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::types::UpdateIssueRequest;
use crate::mcp::utils::tool_schema;
use crate::permissions::PermissionScope;
use crate::validation::{
    validate_issue_fields, validate_issue_key, FieldTier, FieldValidationOptions,
};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;
use serde_json::{json, Map, Value};

/// Tool for editing issue fields
#[derive(Default)]
pub struct UpdateIssueTool;

impl UpdateIssueTool {
    /// Creates a new instance of the UpdateIssueTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for UpdateIssueTool {
    fn name(&self) -> &'static str {
        "update_issue"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<UpdateIssueRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: UpdateIssueRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();
        let options = FieldValidationOptions::for_tier(
            FieldTier::Extended,
            &dispatcher.config().security,
        );

        let key = request.issue_key.trim();
        let field_names: Vec<Value> = request.fields.keys().map(|k| json!(k)).collect();
        let operation = GovernedOperation::new(self.name(), "issue", OperationClass::Standard)
            .with_resource_id(key)
            .with_scope(PermissionScope::issue(key))
            .with_detail("fields", field_names);

        let outcome = dispatcher
            .run(
                operation,
                || validate_update(&request, &options),
                |(key, fields)| async move {
                    tracker.update_issue(&key, &fields).await.map(|()| {
                        json!({ "key": key, "updated": fields.keys().collect::<Vec<_>>() })
                    })
                },
            )
            .await;
        respond(self.name(), outcome)
    }
}

fn validate_update(
    request: &UpdateIssueRequest,
    options: &FieldValidationOptions,
) -> Result<(String, Map<String, Value>)> {
    let key = validate_issue_key("issue_key", &request.issue_key)?;
    if request.fields.is_empty() {
        return Err(GatewayError::validation("fields", "at least one field is required"));
    }
    let fields = validate_issue_fields(&request.fields, options)?;
    Ok((key, fields))
}
