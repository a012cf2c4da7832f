//! Agile board tools for MCP operations

pub mod list;

use crate::mcp::tool_registry::ToolRegistry;

/// Register all board-related tools with the registry
pub fn register_board_tools(registry: &mut ToolRegistry) {
    registry.register(list::ListBoardsTool::new());
}
