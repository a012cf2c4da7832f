//! Response shaping for MCP tool calls

use super::error_handling::McpErrorHandler;
use super::tool_registry::BaseToolImpl;
use crate::error::Result;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;
use serde_json::{json, Value};

/// Normalized success envelope
///
/// `{"success": true, "operation": <tool>, "data": <payload>}` rendered as
/// pretty JSON text.
pub fn success_envelope(operation: &str, data: Value) -> CallToolResult {
    let envelope = json!({
        "success": true,
        "operation": operation,
        "data": data,
    });
    let text = serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| envelope.to_string());
    BaseToolImpl::create_success_response(text)
}

/// Turn a governed outcome into the tool result handed to the transport
pub fn respond(
    operation: &str,
    outcome: Result<Value>,
) -> std::result::Result<CallToolResult, McpError> {
    outcome
        .map(|data| success_envelope(operation, data))
        .map_err(|e| McpErrorHandler::handle_error(e, operation))
}

/// Text of the first content block
pub fn response_text(result: &CallToolResult) -> Option<&str> {
    result.content.first().and_then(|content| match &content.raw {
        rmcp::model::RawContent::Text(text) => Some(text.text.as_str()),
        _ => None,
    })
}

/// Parse the JSON envelope of a success response
pub fn envelope_json(result: &CallToolResult) -> Option<Value> {
    response_text(result).and_then(|text| serde_json::from_str(text).ok())
}
