//! Issue tools for MCP operations
//!
//! Searching, reading, creating, editing, transitioning, commenting on and
//! deleting issues, plus bulk field updates. Each tool is in its own submodule
//! with dedicated implementation and description.

pub mod bulk_update;
pub mod comment;
pub mod create;
pub mod delete;
pub mod get;
pub mod search;
pub mod transition;
pub mod update;

use crate::mcp::tool_registry::ToolRegistry;

/// Register all issue-related tools with the registry
pub fn register_issue_tools(registry: &mut ToolRegistry) {
    registry.register(search::SearchIssuesTool::new());
    registry.register(get::GetIssueTool::new());
    registry.register(create::CreateIssueTool::new());
    registry.register(update::UpdateIssueTool::new());
    registry.register(delete::DeleteIssueTool::new());
    registry.register(transition::TransitionIssueTool::new());
    registry.register(comment::AddCommentTool::new());
    registry.register(bulk_update::BulkUpdateIssuesTool::new());
}
