//! Issue workflow transition tool for MCP operations
//!
//! Without a transition id the tool lists the transitions available to the
//! issue, so a caller can pick one and call again.

use crate::common::OperationClass;
use crate::error::Result;
use crate::mcp::dispatcher::GovernedOperation;
use crate::mcp::responses::respond;
use crate::mcp::tool_registry::{BaseToolImpl, McpTool, ToolContext};
use crate::mcp::types::TransitionIssueRequest;
use crate::mcp::utils::tool_schema;
use crate::permissions::PermissionScope;
use crate::validation::{
    validate_issue_fields, validate_issue_key, validate_numeric_id, validate_text, FieldTier,
    FieldValidationOptions,
};
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use rmcp::Error as McpError;
use serde_json::{json, Map, Value};

/// Tool for moving an issue through its workflow
#[derive(Default)]
pub struct TransitionIssueTool;

impl TransitionIssueTool {
    /// Creates a new instance of the TransitionIssueTool
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug)]
enum Transition {
    List {
        key: String,
    },
    Perform {
        key: String,
        transition_id: String,
        fields: Map<String, Value>,
        comment: Option<String>,
    },
}

#[async_trait]
impl McpTool for TransitionIssueTool {
    fn name(&self) -> &'static str {
        "transition_issue"
    }

    fn description(&self) -> &'static str {
        include_str!("description.md")
    }

    fn schema(&self) -> serde_json::Value {
        tool_schema::<TransitionIssueRequest>()
    }

    async fn execute(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
        context: &ToolContext,
    ) -> std::result::Result<CallToolResult, McpError> {
        let request: TransitionIssueRequest = BaseToolImpl::parse_arguments(arguments)?;
        let dispatcher = &context.dispatcher;
        let tracker = dispatcher.tracker();
        let options =
            FieldValidationOptions::for_tier(FieldTier::Basic, &dispatcher.config().security);

        let key = request.issue_key.trim();
        let mut operation = GovernedOperation::new(self.name(), "issue", OperationClass::Standard)
            .with_resource_id(key)
            .with_scope(PermissionScope::issue(key));
        if let Some(id) = &request.transition_id {
            operation = operation.with_detail("transition_id", id.trim());
        }

        let outcome = dispatcher
            .run(
                operation,
                || validate_transition(&request, &options),
                |transition| async move {
                    match transition {
                        Transition::List { key } => tracker.get_transitions(&key).await,
                        Transition::Perform {
                            key,
                            transition_id,
                            fields,
                            comment,
                        } => tracker
                            .transition_issue(&key, &transition_id, &fields, comment.as_deref())
                            .await
                            .map(|()| json!({ "key": key, "transition_id": transition_id })),
                    }
                },
            )
            .await;
        respond(self.name(), outcome)
    }
}

fn validate_transition(
    request: &TransitionIssueRequest,
    options: &FieldValidationOptions,
) -> Result<Transition> {
    let key = validate_issue_key("issue_key", &request.issue_key)?;
    let Some(transition_id) = &request.transition_id else {
        return Ok(Transition::List { key });
    };

    let transition_id = validate_numeric_id("transition_id", transition_id)?;
    let fields = validate_issue_fields(&request.fields, options)?;
    let comment = request
        .comment
        .as_deref()
        .map(|c| validate_text("comment", c, options))
        .transpose()?;

    Ok(Transition::Perform {
        key,
        transition_id,
        fields,
        comment,
    })
}
