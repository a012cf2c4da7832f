//! Mapping gateway failures onto MCP errors

use crate::error::GatewayError;
use rmcp::Error as McpError;
use serde_json::json;

/// Common error handling patterns for MCP operations
pub struct McpErrorHandler;

impl McpErrorHandler {
    /// Convert a [`GatewayError`] to the MCP error returned to the caller
    ///
    /// - Security rejections -> invalid_params tagged `"security": true` with their code
    /// - Rate limit, validation, permission and disabled operations -> invalid_params
    /// - Remote and internal faults -> internal_error with the message only
    pub fn handle_error(error: GatewayError, operation: &str) -> McpError {
        if error.is_user_error() {
            tracing::warn!("MCP operation '{}' rejected: {}", operation, error);
        } else {
            tracing::error!("MCP operation '{}' failed: {}", operation, error);
        }

        let message = error.to_string();
        match error {
            GatewayError::Security { code, .. } => McpError::invalid_params(
                message,
                Some(json!({ "code": code.as_str(), "security": true })),
            ),
            GatewayError::RateLimited {
                retry_after_secs, ..
            } => McpError::invalid_params(
                message,
                Some(json!({ "security": false, "retry_after_secs": retry_after_secs })),
            ),
            GatewayError::Validation { field, .. } => McpError::invalid_params(
                message,
                Some(json!({ "security": false, "field": field })),
            ),
            GatewayError::PermissionDenied { capability, scope } => McpError::invalid_params(
                message,
                Some(json!({ "security": false, "capability": capability, "scope": scope })),
            ),
            GatewayError::OperationDisabled(_) => {
                McpError::invalid_params(message, Some(json!({ "security": false })))
            }
            _ => McpError::internal_error(message, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SecurityCode;
    use rmcp::model::ErrorCode;

    #[test]
    fn test_security_errors_are_tagged() {
        let err = McpErrorHandler::handle_error(
            GatewayError::security(SecurityCode::JqlTooLong, "too long"),
            "search_issues",
        );
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        let data = err.data.unwrap();
        assert_eq!(data["security"], true);
        assert_eq!(data["code"], "JQL_TOO_LONG");
    }

    #[test]
    fn test_rate_limit_carries_wait_time() {
        let err = McpErrorHandler::handle_error(
            GatewayError::RateLimited {
                key: "search:mcp".to_string(),
                retry_after_secs: 42,
            },
            "search_issues",
        );
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("42 seconds"));
        let data = err.data.unwrap();
        assert_eq!(data["security"], false);
        assert_eq!(data["retry_after_secs"], 42);
    }

    #[test]
    fn test_remote_errors_are_internal() {
        let err = McpErrorHandler::handle_error(
            GatewayError::Remote {
                status: Some(500),
                message: "boom".to_string(),
            },
            "get_issue",
        );
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert!(err.message.contains("boom"));
        assert!(err.data.is_none());
    }

    #[test]
    fn test_validation_names_field() {
        let err = McpErrorHandler::handle_error(
            GatewayError::validation("summary", "too long"),
            "create_issue",
        );
        assert_eq!(err.data.unwrap()["field"], "summary");
    }
}
