//! MCP tools exposed by the gateway
//!
//! Each tool lives in `<noun>/<verb>/mod.rs` next to its `description.md`.
//! Remote-backed tools run through the dispatcher; the audit tools read the
//! local journal directly.

pub mod attachments;
pub mod audit;
pub mod boards;
pub mod issues;
pub mod projects;
pub mod sprints;
pub mod users;

use crate::error::{GatewayError, Result};
use crate::mcp::tool_registry::ToolRegistry;
use crate::mcp::types::MAX_SEARCH_RESULTS;

/// Register every gateway tool
pub fn register_all_tools(registry: &mut ToolRegistry) {
    issues::register_issue_tools(registry);
    projects::register_project_tools(registry);
    boards::register_board_tools(registry);
    sprints::register_sprint_tools(registry);
    users::register_user_tools(registry);
    attachments::register_attachment_tools(registry);
    audit::register_audit_tools(registry);
}

/// Page size between 1 and [`MAX_SEARCH_RESULTS`], `default` when absent
pub(crate) fn page_size(field: &str, requested: Option<u32>, default: u32) -> Result<u32> {
    let size = requested.unwrap_or(default);
    if (1..=MAX_SEARCH_RESULTS).contains(&size) {
        Ok(size)
    } else {
        Err(GatewayError::validation(
            field,
            format!("{size} is outside 1..={MAX_SEARCH_RESULTS}"),
        ))
    }
}
