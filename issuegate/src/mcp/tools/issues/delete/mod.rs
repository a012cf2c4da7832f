//! Issue deletion tool for MCP operations

use crate::common::OperationClass;
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::types::DeleteIssueRequest;
use crate::mcp::utils::tool_schema;
use crate::permissions::PermissionScope;
use crate::security::{validate_destructive_operation, ConfirmationOptions, DestructiveKind};
use crate::validation::validate_issue_key;
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;
use serde_json::json;

/// Tool for permanently deleting an issue
#[derive(Default)]
pub struct DeleteIssueTool;

impl DeleteIssueTool {
    /// Creates a new instance of the DeleteIssueTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for DeleteIssueTool {
    fn name(&self) -> &'static str {
        "delete_issue"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<DeleteIssueRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: DeleteIssueRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();
        let confirmation = ConfirmationOptions::for_kind(
            &dispatcher.config().security.confirmation,
            DestructiveKind::IssueDelete,
        );

        let key = request.issue_key.trim();
        let delete_subtasks = request.delete_subtasks;
        let operation = GovernedOperation::new(self.name(), "issue", OperationClass::Standard)
            .with_resource_id(key)
            .with_scope(PermissionScope::issue(key))
            .with_detail("delete_subtasks", delete_subtasks);

        let outcome = dispatcher
            .run(
                operation,
                || {
                    let key = validate_issue_key("issue_key", &request.issue_key)?;
                    validate_destructive_operation(
                        self.name(),
                        request.confirm.as_deref(),
                        &confirmation,
                    )?;
                    Ok(key)
                },
                |key| async move {
                    tracker
                        .delete_issue(&key, delete_subtasks)
                        .await
                        .map(|()| json!({ "key": key, "deleted": true }))
                },
            )
            .await;
        respond(self.name(), outcome)
    }
}
