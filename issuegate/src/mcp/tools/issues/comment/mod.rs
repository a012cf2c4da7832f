//! Issue comment tool for MCP operations

use crate::common::OperationClass;
use crate::error::Result;
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::types::AddCommentRequest;
use crate::mcp::utils::tool_schema;
use crate::permissions::PermissionScope;
use crate::validation::{validate_issue_key, validate_text, FieldValidationOptions};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;

/// Tool for commenting on an issue
#[derive(Default)]
pub struct AddCommentTool;

impl AddCommentTool {
    /// Creates a new instance of the AddCommentTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for AddCommentTool {
    fn name(&self) -> &'static str {
        "add_comment"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<AddCommentRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: AddCommentRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();
        let options = FieldValidationOptions::from(&dispatcher.config().security);

        let key = request.issue_key.trim();
        let operation = GovernedOperation::new(self.name(), "comment", OperationClass::Standard)
            .with_resource_id(key)
            .with_scope(PermissionScope::issue(key))
            .with_detail("length", request.body.chars().count());

        let outcome = dispatcher
            .run(
                operation,
                || -> Result<(String, String)> {
                    let key = validate_issue_key("issue_key", &request.issue_key)?;
                    let body = validate_text("body", &request.body, &options)?;
                    Ok((key, body))
                },
                |(key, body)| async move { tracker.add_comment(&key, &body).await },
            )
            .await;
        respond(self.name(), outcome)
    }
}
