//! User lookup tools for MCP operations

pub mod search;

use crate::mcp::tool_registry::ToolRegistry;

/// Register all user-related tools with the registry
pub fn register_user_tools(registry: &mut ToolRegistry) {
    registry.register(search::SearchUsersTool::new());
}
