//! Attachment download tool for MCP operations
//!
//! Fetches the attachment's binary content and writes it to a validated path.

use crate::common::OperationClass;
use crate::error::Result;
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::types::DownloadAttachmentRequest;
use crate::mcp::utils::tool_schema;
use crate::security::{validate_save_path, SavePathOptions};
use crate::tracker::{attachment_too_large, IssueTrackerClient};
use crate::validation::validate_numeric_id;
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;
use serde_json::{json, Value};
use std::path::PathBuf;

/// Tool for saving an attachment to the local filesystem
#[derive(Default)]
pub struct DownloadAttachmentTool;

impl DownloadAttachmentTool {
    /// Creates a new instance of the DownloadAttachmentTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for DownloadAttachmentTool {
    fn name(&self) -> &'static str {
        "download_attachment"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<DownloadAttachmentRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: DownloadAttachmentRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();
        let security = &dispatcher.config().security;
        let options = SavePathOptions::from(security);
        let max_file_size = security.max_file_size;

        let operation = GovernedOperation::new(self.name(), "attachment", OperationClass::File)
            .with_resource_id(request.attachment_id.trim());

        let outcome = dispatcher
            .run(
                operation,
                || -> Result<(String, PathBuf)> {
                    let id = validate_numeric_id("attachment_id", &request.attachment_id)?;
                    let target = validate_save_path(&request.save_path, &options)?;
                    Ok((id, target))
                },
                |(id, target)| download(tracker.as_ref(), id, target, max_file_size),
            )
            .await;
        respond(self.name(), outcome)
    }
}

async fn download(
    tracker: &dyn IssueTrackerClient,
    id: String,
    target: PathBuf,
    max_file_size: u64,
) -> Result<Value> {
    let attachment = tracker.get_attachment(&id).await?;
    if attachment.size > max_file_size {
        return Err(attachment_too_large(attachment.size, max_file_size));
    }

    let content = tracker
        .download_attachment(&attachment, max_file_size)
        .await?;
    let written = content.len() as u64;
    tokio::fs::write(&target, &content).await?;

    tracing::info!(attachment = %id, path = %target.display(), bytes = written, "attachment saved");
    Ok(json!({
        "attachment": attachment,
        "saved_to": target.display().to_string(),
        "bytes": written,
    }))
}
