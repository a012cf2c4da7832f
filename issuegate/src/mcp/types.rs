//! Request types for MCP tools

use crate::audit::RiskLevel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Page size used when a search does not ask for one
pub const DEFAULT_SEARCH_RESULTS: u32 = 50;

/// Largest page a search may request
pub const MAX_SEARCH_RESULTS: u32 = 100;

/// Page size for project, board and user listings
pub const DEFAULT_LIST_RESULTS: u32 = 50;

/// Entries returned by the audit log tool when no limit is given
pub const DEFAULT_AUDIT_LIMIT: usize = 50;

/// Upper bound on entries returned by the audit log tool
pub const MAX_AUDIT_LIMIT: usize = 500;

/// Request to search issues with a query
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SearchIssuesRequest {
    /// JQL query, e.g. `project = PROJ AND status = Open`
    pub jql: String,
    /// Index of the first result (default 0)
    #[serde(default)]
    pub start_at: Option<u32>,
    /// Page size between 1 and 100 (default 50)
    #[serde(default)]
    pub max_results: Option<u32>,
    /// Fields to include in each issue
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

/// Request to fetch one issue
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct GetIssueRequest {
    /// Issue key such as `PROJ-123`
    pub issue_key: String,
    /// Fields to include; all fields when omitted
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

/// Request to create an issue
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct CreateIssueRequest {
    /// Project key such as `PROJ`
    pub project_key: String,
    /// One-line summary
    pub summary: String,
    /// Issue type name (default `Task`)
    #[serde(default)]
    pub issue_type: Option<String>,
    /// Plain-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Additional fields such as priority, labels or custom fields
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Request to update fields of an issue
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct UpdateIssueRequest {
    /// Issue key such as `PROJ-123`
    pub issue_key: String,
    /// Fields to set
    pub fields: Map<String, Value>,
}

/// Request to delete an issue
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct DeleteIssueRequest {
    /// Issue key such as `PROJ-123`
    pub issue_key: String,
    /// Also delete subtasks
    #[serde(default)]
    pub delete_subtasks: bool,
    /// Confirmation phrase, required when configured
    #[serde(default)]
    pub confirm: Option<String>,
}

/// Request to move an issue through its workflow
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct TransitionIssueRequest {
    /// Issue key such as `PROJ-123`
    pub issue_key: String,
    /// Transition to perform; when omitted the available transitions are listed
    #[serde(default)]
    pub transition_id: Option<String>,
    /// Fields to set during the transition
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// Comment to add with the transition
    #[serde(default)]
    pub comment: Option<String>,
}

/// Request to comment on an issue
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct AddCommentRequest {
    /// Issue key such as `PROJ-123`
    pub issue_key: String,
    /// Plain-text comment body
    pub body: String,
}

/// Request to list projects
#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ListProjectsRequest {
    /// Filter on project key or name
    #[serde(default)]
    pub query: Option<String>,
    /// Page size (default 50)
    #[serde(default)]
    pub max_results: Option<u32>,
}

/// Request to list agile boards
#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ListBoardsRequest {
    /// Only boards of this project
    #[serde(default)]
    pub project_key: Option<String>,
    /// Page size (default 50)
    #[serde(default)]
    pub max_results: Option<u32>,
}

/// Sprint lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SprintState {
    /// In progress
    Active,
    /// Planned
    Future,
    /// Finished
    Closed,
}

impl SprintState {
    /// Query value understood by the tracker
    pub fn as_str(&self) -> &'static str {
        match self {
            SprintState::Active => "active",
            SprintState::Future => "future",
            SprintState::Closed => "closed",
        }
    }
}

/// Request to list the sprints of a board
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct ListSprintsRequest {
    /// Numeric board id
    pub board_id: String,
    /// Only sprints in this state
    #[serde(default)]
    pub state: Option<SprintState>,
}

/// Request to find users
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct SearchUsersRequest {
    /// Name or email fragment
    pub query: String,
    /// Page size (default 50)
    #[serde(default)]
    pub max_results: Option<u32>,
}

/// Request to attach a local file to an issue
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct UploadAttachmentRequest {
    /// Issue key such as `PROJ-123`
    pub issue_key: String,
    /// Path of the file to upload, inside an allowed directory
    pub file_path: String,
}

/// Request to save an attachment locally
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct DownloadAttachmentRequest {
    /// Numeric attachment id
    pub attachment_id: String,
    /// Destination path, inside an allowed directory
    pub save_path: String,
}

/// Request to delete an attachment
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct DeleteAttachmentRequest {
    /// Numeric attachment id
    pub attachment_id: String,
    /// Confirmation phrase, required when configured
    #[serde(default)]
    pub confirm: Option<String>,
}

/// Request to apply the same fields to many issues
#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema)]
pub struct BulkUpdateIssuesRequest {
    /// Issue keys to update
    pub issue_keys: Vec<String>,
    /// Fields to set on every issue
    pub fields: Map<String, Value>,
    /// Confirmation phrase, required when configured
    #[serde(default)]
    pub confirm: Option<String>,
}

/// Preset audit views
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditView {
    /// Filtered by the request's other fields
    #[default]
    All,
    /// Security events only
    Security,
    /// Failed operations only
    Failed,
    /// High and critical risk entries
    HighRisk,
}

/// Request to read the audit journal
#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct GetAuditLogRequest {
    /// Preset view (default `all`)
    #[serde(default)]
    pub view: AuditView,
    /// Operation name substring
    #[serde(default)]
    pub operation: Option<String>,
    /// Resource type substring
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Exact risk level
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    /// Only successes or only failures
    #[serde(default)]
    pub success: Option<bool>,
    /// Only entries from the last N hours
    #[serde(default)]
    pub since_hours: Option<u32>,
    /// Entries to return, 1 to 500 (default 50)
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Request for aggregate audit statistics
#[derive(Debug, Default, Deserialize, Serialize, schemars::JsonSchema)]
pub struct GetAuditStatsRequest {}
