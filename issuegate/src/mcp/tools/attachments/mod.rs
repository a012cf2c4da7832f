//! Attachment tools for MCP operations
//!
//! Uploads read from and downloads write to the local filesystem, so every
//! path goes through the security validator and must resolve inside one of the
//! configured allowed directories.

pub mod delete;
pub mod download;
pub mod upload;

use crate::mcp::tool_registry::ToolRegistry;

/// Register all attachment-related tools with the registry
pub fn register_attachment_tools(registry: &mut ToolRegistry) {
    registry.register(upload::UploadAttachmentTool::new());
    registry.register(download::DownloadAttachmentTool::new());
    registry.register(delete::DeleteAttachmentTool::new());
}
