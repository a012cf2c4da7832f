//! Issue creation tool for MCP operations

use crate::common::OperationClass;
use crate::error::Result;
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::types::CreateIssueRequest;
use crate::mcp::utils::tool_schema;
use crate::permissions::PermissionScope;
use crate::validation::{
    validate_issue_fields, validate_project_key, FieldTier, FieldValidationOptions,
};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;
use serde_json::{json, Map, Value};

/// Issue type used when the request names none
pub const DEFAULT_ISSUE_TYPE: &str = "Task";

/// Tool for creating issues
#[derive(Default)]
pub struct CreateIssueTool;

impl CreateIssueTool {
    /// Creates a new instance of the CreateIssueTool
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl McpTool for CreateIssueTool {
    fn name(&self) -> &'static str {
        "create_issue"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<CreateIssueRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: CreateIssueRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();
        let options = FieldValidationOptions::for_tier(
            FieldTier::Extended,
            &dispatcher.config().security,
        );

        let project = request.project_key.trim().to_string();
        let operation = GovernedOperation::new(self.name(), "issue", OperationClass::Standard)
            .with_scope(PermissionScope::project(project.clone()))
            .with_detail("project", project);

        let outcome = dispatcher
            .run(
                operation,
                || issue_payload(&request, &options),
                |payload| async move { tracker.create_issue(&payload).await },
            )
            .await;
        respond(self.name(), outcome)
    }
}

/// Validated create payload with the project reference added last
fn issue_payload(
    request: &CreateIssueRequest,
    options: &FieldValidationOptions,
) -> Result<Map<String, Value>> {
    let project = validate_project_key("project_key", &request.project_key)?;

    let mut fields = request.fields.clone();
    fields.insert("summary".to_string(), json!(request.summary));
    if let Some(description) = &request.description {
        fields.insert("description".to_string(), json!(description));
    }
    let issue_type = request.issue_type.as_deref().unwrap_or(DEFAULT_ISSUE_TYPE);
    fields
        .entry("issuetype")
        .or_insert_with(|| json!(issue_type));

    let mut payload = validate_issue_fields(&fields, options)?;
    payload.insert("project".to_string(), json!({ "key": project }));
    Ok(payload)
}
