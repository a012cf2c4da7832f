//! Attachment upload tool for MCP operations

use crate::common::OperationClass;
use crate::error::{GatewayError, Result};
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::types::UploadAttachmentRequest;
use crate::mcp::utils::tool_schema;
use crate::permissions::PermissionScope;
use crate::security::{validate_file_path, FilePathOptions};
use crate::tracker::IssueTrackerClient;
use crate::validation::validate_issue_key;
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;
use serde_json::{json, Value};
use std::path::PathBuf;

/// Tool for attaching a local file to an issue
#[derive(Default)]
pub struct UploadAttachmentTool;

impl UploadAttachmentTool {
    /// Creates a new instance of the UploadAttachmentTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for UploadAttachmentTool {
    fn name(&self) -> &'static str {
        "upload_attachment"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<UploadAttachmentRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: UploadAttachmentRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();
        let options = FilePathOptions::from(&dispatcher.config().security);

        let key = request.issue_key.trim();
        let operation = GovernedOperation::new(self.name(), "attachment", OperationClass::File)
            .with_resource_id(key)
            .with_scope(PermissionScope::issue(key));

        let outcome = dispatcher
            .run(
                operation,
                || -> Result<(String, PathBuf)> {
                    let key = validate_issue_key("issue_key", &request.issue_key)?;
                    let path = validate_file_path(&request.file_path, &options)?;
                    Ok((key, path))
                },
                |(key, path)| upload(tracker.as_ref(), key, path),
            )
            .await;
        respond(self.name(), outcome)
    }
}

async fn upload(tracker: &dyn IssueTrackerClient, key: String, path: PathBuf) -> Result<Value> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| GatewayError::validation("file_path", "path has no file name"))?;
    let content = tokio::fs::read(&path).await?;
    let size = content.len();

    let attachments = tracker.upload_attachment(&key, &file_name, content).await?;
    tracing::info!(issue = %key, file = %file_name, size, "attachment uploaded");
    Ok(json!({ "key": key, "attachments": attachments }))
}
