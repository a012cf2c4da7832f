//! Audit journal tools for MCP operations
//!
//! These read the in-process journal only; they make no remote calls and are
//! not themselves audited or rate limited.

pub mod log;
pub mod stats;

use crate::mcp::tool_registry::ToolRegistry;

/// Register all audit-related tools with the registry
pub fn register_audit_tools(registry: &mut ToolRegistry) {
    registry.register(log::GetAuditLogTool::new());
    registry.register(stats::GetAuditStatsTool::new());
}
