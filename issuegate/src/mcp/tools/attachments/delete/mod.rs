//! Attachment deletion tool for MCP operations

use crate::common::OperationClass;
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::types::DeleteAttachmentRequest;
use crate::mcp::utils::tool_schema;
use crate::security::{validate_destructive_operation, ConfirmationOptions, DestructiveKind};
use crate::validation::validate_numeric_id;
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;
use serde_json::json;

/// Tool for permanently deleting an attachment
#[derive(Default)]
pub struct DeleteAttachmentTool;

impl DeleteAttachmentTool {
    /// Creates a new instance of the DeleteAttachmentTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for DeleteAttachmentTool {
    fn name(&self) -> &'static str {
        "delete_attachment"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<DeleteAttachmentRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: DeleteAttachmentRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();
        let confirmation = ConfirmationOptions::for_kind(
            &dispatcher.config().security.confirmation,
            DestructiveKind::AttachmentDelete,
        );

        let operation = GovernedOperation::new(self.name(), "attachment", OperationClass::File)
            .with_resource_id(request.attachment_id.trim());

        let outcome = dispatcher
            .run(
                operation,
                || {
                    let id = validate_numeric_id("attachment_id", &request.attachment_id)?;
                    validate_destructive_operation(
                        self.name(),
                        request.confirm.as_deref(),
                        &confirmation,
                    )?;
                    Ok(id)
                },
                |id| async move {
                    tracker
                        .delete_attachment(&id)
                        .await
                        .map(|()| json!({ "attachment_id": id, "deleted": true }))
                },
            )
            .await;
        respond(self.name(), outcome)
    }
}
