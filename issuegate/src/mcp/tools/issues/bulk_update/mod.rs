//! Bulk issue update tool for MCP operations
//!
//! Applies one field map to several issues. Updates run one at a time and a
//! failure on one issue does not stop the rest; the response reports each
//! issue's outcome.

use crate::common::OperationClass;
use crate::error::{GatewayError, Result};
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::types::BulkUpdateIssuesRequest;
use crate::mcp::utils::tool_schema;
use crate::security::{validate_destructive_operation, ConfirmationOptions, DestructiveKind};
use crate::tracker::IssueTrackerClient;
use crate::validation::{
    validate_issue_fields, validate_issue_key, FieldTier, FieldValidationOptions,
};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;
use serde_json::{json, Map, Value};

/// Tool for updating many issues with the same fields
#[derive(Default)]
pub struct BulkUpdateIssuesTool;

impl BulkUpdateIssuesTool {
    /// Creates a new instance of the BulkUpdateIssuesTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for BulkUpdateIssuesTool {
    fn name(&self) -> &'static str {
        "bulk_update_issues"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<BulkUpdateIssuesRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: BulkUpdateIssuesRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();
        let config = dispatcher.config();
        let options = FieldValidationOptions::for_tier(FieldTier::Basic, &config.security);
        let confirmation = ConfirmationOptions::for_kind(
            &config.security.confirmation,
            DestructiveKind::BulkUpdate,
        );
        let max_bulk_size = config.operations.max_bulk_size;

        let operation = GovernedOperation::new(self.name(), "issue", OperationClass::Bulk)
            .with_detail("issue_count", request.issue_keys.len());

        let outcome = dispatcher
            .run(
                operation,
                || {
                    validate_destructive_operation(
                        self.name(),
                        request.confirm.as_deref(),
                        &confirmation,
                    )?;
                    validate_bulk(&request, &options, max_bulk_size)
                },
                |(keys, fields)| update_all(tracker.as_ref(), keys, fields),
            )
            .await;
        respond(self.name(), outcome)
    }
}

fn validate_bulk(
    request: &BulkUpdateIssuesRequest,
    options: &FieldValidationOptions,
    max_bulk_size: usize,
) -> Result<(Vec<String>, Map<String, Value>)> {
    if request.issue_keys.is_empty() {
        return Err(GatewayError::validation("issue_keys", "at least one issue key is required"));
    }
    if request.issue_keys.len() > max_bulk_size {
        return Err(GatewayError::validation(
            "issue_keys",
            format!(
                "{} issues exceeds the bulk limit of {max_bulk_size}",
                request.issue_keys.len()
            ),
        ));
    }

    let mut keys: Vec<String> = Vec::with_capacity(request.issue_keys.len());
    for key in &request.issue_keys {
        let key = validate_issue_key("issue_keys", key)?;
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    if request.fields.is_empty() {
        return Err(GatewayError::validation("fields", "at least one field is required"));
    }
    let fields = validate_issue_fields(&request.fields, options)?;
    Ok((keys, fields))
}

async fn update_all(
    tracker: &dyn IssueTrackerClient,
    keys: Vec<String>,
    fields: Map<String, Value>,
) -> Result<Value> {
    let mut results = Vec::with_capacity(keys.len());
    let mut failed = 0usize;
    let mut first_error = None;

    for key in &keys {
        match tracker.update_issue(key, &fields).await {
            Ok(()) => results.push(json!({ "key": key, "success": true })),
            Err(e) => {
                tracing::warn!(issue = %key, "bulk update failed: {e}");
                failed += 1;
                results.push(json!({ "key": key, "success": false, "error": e.to_string() }));
                first_error.get_or_insert(e);
            }
        }
    }

    if failed == keys.len() {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    Ok(json!({
        "updated": keys.len() - failed,
        "failed": failed,
        "results": results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::tracker::MockIssueTracker;

    fn request(keys: &[&str]) -> BulkUpdateIssuesRequest {
        BulkUpdateIssuesRequest {
            issue_keys: keys.iter().map(|k| k.to_string()).collect(),
            fields: json!({"labels": ["triaged"]}).as_object().cloned().unwrap(),
            confirm: None,
        }
    }

    fn options() -> FieldValidationOptions {
        FieldValidationOptions::for_tier(FieldTier::Basic, &SecurityConfig::default())
    }

    #[test]
    fn test_bulk_size_limit() {
        assert!(validate_bulk(&request(&["PROJ-1", "PROJ-2"]), &options(), 2).is_ok());
        let err = validate_bulk(&request(&["PROJ-1", "PROJ-2", "PROJ-3"]), &options(), 2)
            .unwrap_err();
        assert!(err.to_string().contains("bulk limit"));
        assert!(validate_bulk(&request(&[]), &options(), 2).is_err());
    }

    #[test]
    fn test_duplicate_keys_collapse() {
        let (keys, _) = validate_bulk(&request(&["PROJ-1", "PROJ-1"]), &options(), 5).unwrap();
        assert_eq!(keys, vec!["PROJ-1"]);
    }

    #[tokio::test]
    async fn test_partial_failure_reported_per_issue() {
        let tracker = MockIssueTracker::new().with_issue("PROJ-1", json!({}));
        let fields = json!({"labels": ["triaged"]}).as_object().cloned().unwrap();

        let summary = update_all(
            &tracker,
            vec!["PROJ-1".to_string(), "PROJ-2".to_string()],
            fields.clone(),
        )
        .await
        .unwrap();
        assert_eq!(summary["updated"], 1);
        assert_eq!(summary["failed"], 1);
        assert_eq!(summary["results"][1]["success"], false);

        let err = update_all(&tracker, vec!["PROJ-9".to_string()], fields)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Remote { status: Some(404), .. }));
    }
}
