//! Port to the remote issue tracker
//!
//! The gateway only talks to the tracker through [`IssueTrackerClient`]. The
//! REST adapter lives in [`jira`]; [`mock`] provides an in-memory stand-in
//! used by the test suites.

pub mod jira;
#[doc(hidden)]
pub mod mock;

use crate::error::{GatewayError, SecurityCode};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

pub use jira::JiraRestClient;
pub use mock::MockIssueTracker;

/// Parameters for a query-language search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Sanitized query
    pub jql: String,
    /// Offset of the first result
    pub start_at: u32,
    /// Page size
    pub max_results: u32,
    /// Fields to return; empty means the tracker default
    pub fields: Vec<String>,
}

/// Attachment metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Attachment id
    pub id: String,
    /// Original file name
    pub filename: String,
    /// Size in bytes
    pub size: u64,
    /// MIME type reported by the tracker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// URL of the binary content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Capability names the tracker grants the current caller
pub type CapabilitySet = BTreeSet<String>;

/// Rejection for attachment content over `limit` bytes
pub fn attachment_too_large(size: u64, limit: u64) -> GatewayError {
    GatewayError::security(
        SecurityCode::FileTooLarge,
        format!("Attachment is {size} bytes, larger than the {limit} byte limit"),
    )
}

/// Operations the gateway performs against the remote tracker
///
/// Implementations report failures as [`crate::GatewayError::Remote`] or
/// [`crate::GatewayError::Http`]; the gateway never retries them.
#[async_trait]
pub trait IssueTrackerClient: Send + Sync + std::fmt::Debug {
    /// Run a query-language search
    async fn search_issues(&self, request: &SearchRequest) -> Result<Value>;

    /// Fetch one issue
    async fn get_issue(&self, key: &str, fields: &[String]) -> Result<Value>;

    /// Create an issue from validated fields
    async fn create_issue(&self, fields: &Map<String, Value>) -> Result<Value>;

    /// Update an issue with validated fields
    async fn update_issue(&self, key: &str, fields: &Map<String, Value>) -> Result<()>;

    /// Delete an issue
    async fn delete_issue(&self, key: &str, delete_subtasks: bool) -> Result<()>;

    /// Transitions currently available on an issue
    async fn get_transitions(&self, key: &str) -> Result<Value>;

    /// Move an issue through a workflow transition
    async fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        fields: &Map<String, Value>,
        comment: Option<&str>,
    ) -> Result<()>;

    /// Add a plain-text comment
    async fn add_comment(&self, key: &str, body: &str) -> Result<Value>;

    /// Projects visible to the caller
    async fn list_projects(&self, query: Option<&str>, max_results: u32) -> Result<Value>;

    /// Agile boards, optionally restricted to a project
    async fn list_boards(&self, project_key: Option<&str>, max_results: u32) -> Result<Value>;

    /// Sprints of a board, optionally filtered by state
    async fn list_sprints(&self, board_id: &str, state: Option<&str>) -> Result<Value>;

    /// Users matching a name or email fragment
    async fn search_users(&self, query: &str, max_results: u32) -> Result<Value>;

    /// Attach a file to an issue
    async fn upload_attachment(
        &self,
        key: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<Vec<Attachment>>;

    /// Attachment metadata
    async fn get_attachment(&self, id: &str) -> Result<Attachment>;

    /// Binary content of an attachment
    ///
    /// Fails with [`attachment_too_large`] as soon as more than `max_bytes`
    /// have been received, whatever size the metadata declares.
    async fn download_attachment(
        &self,
        attachment: &Attachment,
        max_bytes: u64,
    ) -> Result<Vec<u8>>;

    /// Delete an attachment
    async fn delete_attachment(&self, id: &str) -> Result<()>;

    /// Capabilities the caller holds, globally or within `project_key`
    async fn my_permissions(&self, project_key: Option<&str>) -> Result<CapabilitySet>;
}
