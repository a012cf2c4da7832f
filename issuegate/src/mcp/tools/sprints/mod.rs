//! Sprint tools for MCP operations

pub mod list;

use crate::mcp::tool_registry::ToolRegistry;

/// Register all sprint-related tools with the registry
pub fn register_sprint_tools(registry: &mut ToolRegistry) {
    registry.register(list::ListSprintsTool::new());
}
