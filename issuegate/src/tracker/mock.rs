//! In-memory tracker used by tests
//!
//! Keeps issues and attachments in memory, counts calls per operation and can
//! be told to fail any operation with a simulated remote error.

use super::jira::KNOWN_PERMISSIONS;
use super::{attachment_too_large, Attachment, CapabilitySet, IssueTrackerClient, SearchRequest};
use crate::{GatewayError, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

const TRANSITIONS: &[(&str, &str)] = &[("11", "To Do"), ("21", "In Progress"), ("31", "Done")];

/// Stand-in for the remote tracker
#[derive(Debug)]
pub struct MockIssueTracker {
    issues: Mutex<BTreeMap<String, Map<String, Value>>>,
    comments: Mutex<HashMap<String, Vec<String>>>,
    attachments: Mutex<HashMap<String, (Attachment, Vec<u8>)>>,
    permissions: Mutex<CapabilitySet>,
    calls: Mutex<BTreeMap<String, usize>>,
    failures: Mutex<HashMap<String, u16>>,
    next_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn not_found(what: &str) -> GatewayError {
    GatewayError::Remote {
        status: Some(404),
        message: format!("{what} does not exist"),
    }
}

impl Default for MockIssueTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIssueTracker {
    /// Empty tracker granting every known capability
    pub fn new() -> Self {
        Self {
            issues: Mutex::new(BTreeMap::new()),
            comments: Mutex::new(HashMap::new()),
            attachments: Mutex::new(HashMap::new()),
            permissions: Mutex::new(KNOWN_PERMISSIONS.iter().map(|p| p.to_string()).collect()),
            calls: Mutex::new(BTreeMap::new()),
            failures: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(10_000),
        }
    }

    /// Replace the granted capabilities
    pub fn with_permissions<I, S>(self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *lock(&self.permissions) = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Seed an issue
    pub fn with_issue(self, key: &str, fields: Value) -> Self {
        self.insert_issue(key, fields);
        self
    }

    /// Insert or replace an issue
    pub fn insert_issue(&self, key: &str, fields: Value) {
        let fields = fields.as_object().cloned().unwrap_or_default();
        lock(&self.issues).insert(key.to_string(), fields);
    }

    /// Seed an attachment with content
    pub fn insert_attachment(&self, id: &str, filename: &str, content: &[u8]) {
        let attachment = Attachment {
            id: id.to_string(),
            filename: filename.to_string(),
            size: content.len() as u64,
            mime_type: Some("application/octet-stream".to_string()),
            content: None,
        };
        lock(&self.attachments).insert(id.to_string(), (attachment, content.to_vec()));
    }

    /// Store an attachment whose metadata declares `declared_size` bytes
    pub fn insert_attachment_declaring(
        &self,
        id: &str,
        filename: &str,
        content: &[u8],
        declared_size: u64,
    ) {
        self.insert_attachment(id, filename, content);
        if let Some((attachment, _)) = lock(&self.attachments).get_mut(id) {
            attachment.size = declared_size;
        }
    }

    /// Make `operation` fail with a 500 until [`MockIssueTracker::recover`]
    pub fn fail(&self, operation: &str) {
        self.fail_with(operation, 500);
    }

    /// Make `operation` fail with `status`
    pub fn fail_with(&self, operation: &str, status: u16) {
        lock(&self.failures).insert(operation.to_string(), status);
    }

    /// Stop failing `operation`
    pub fn recover(&self, operation: &str) {
        lock(&self.failures).remove(operation);
    }

    /// Calls made to `operation`, including failed ones
    pub fn calls(&self, operation: &str) -> usize {
        lock(&self.calls).get(operation).copied().unwrap_or(0)
    }

    /// Calls made to any operation
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    /// Current fields of an issue
    pub fn issue(&self, key: &str) -> Option<Map<String, Value>> {
        lock(&self.issues).get(key).cloned()
    }

    /// Comments added to an issue
    pub fn comments(&self, key: &str) -> Vec<String> {
        lock(&self.comments).get(key).cloned().unwrap_or_default()
    }

    /// True when the attachment exists
    pub fn has_attachment(&self, id: &str) -> bool {
        lock(&self.attachments).contains_key(id)
    }

    fn record(&self, operation: &str) -> Result<()> {
        *lock(&self.calls).entry(operation.to_string()).or_default() += 1;
        match lock(&self.failures).get(operation) {
            Some(status) => Err(GatewayError::Remote {
                status: Some(*status),
                message: format!("simulated {operation} failure"),
            }),
            None => Ok(()),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn issue_json(key: &str, fields: &Map<String, Value>) -> Value {
        json!({ "key": key, "fields": fields })
    }
}

#[async_trait]
impl IssueTrackerClient for MockIssueTracker {
    async fn search_issues(&self, request: &SearchRequest) -> Result<Value> {
        self.record("search_issues")?;
        let issues = lock(&self.issues);
        let page: Vec<Value> = issues
            .iter()
            .skip(request.start_at as usize)
            .take(request.max_results as usize)
            .map(|(key, fields)| Self::issue_json(key, fields))
            .collect();
        Ok(json!({
            "startAt": request.start_at,
            "maxResults": request.max_results,
            "total": issues.len(),
            "issues": page,
        }))
    }

    async fn get_issue(&self, key: &str, _fields: &[String]) -> Result<Value> {
        self.record("get_issue")?;
        lock(&self.issues)
            .get(key)
            .map(|fields| Self::issue_json(key, fields))
            .ok_or_else(|| not_found(&format!("Issue {key}")))
    }

    async fn create_issue(&self, fields: &Map<String, Value>) -> Result<Value> {
        self.record("create_issue")?;
        let project = fields
            .get("project")
            .and_then(|p| p.get("key"))
            .and_then(Value::as_str)
            .unwrap_or("TEST")
            .to_string();
        let id = self.next_id();
        let key = format!("{project}-{}", lock(&self.issues).len() + 1);
        lock(&self.issues).insert(key.clone(), fields.clone());
        Ok(json!({ "id": id.to_string(), "key": key }))
    }

    async fn update_issue(&self, key: &str, fields: &Map<String, Value>) -> Result<()> {
        self.record("update_issue")?;
        let mut issues = lock(&self.issues);
        let existing = issues
            .get_mut(key)
            .ok_or_else(|| not_found(&format!("Issue {key}")))?;
        existing.extend(fields.clone());
        Ok(())
    }

    async fn delete_issue(&self, key: &str, _delete_subtasks: bool) -> Result<()> {
        self.record("delete_issue")?;
        lock(&self.issues)
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| not_found(&format!("Issue {key}")))
    }

    async fn get_transitions(&self, key: &str) -> Result<Value> {
        self.record("get_transitions")?;
        if !lock(&self.issues).contains_key(key) {
            return Err(not_found(&format!("Issue {key}")));
        }
        let transitions: Vec<Value> = TRANSITIONS
            .iter()
            .map(|(id, name)| json!({ "id": id, "name": name }))
            .collect();
        Ok(json!({ "transitions": transitions }))
    }

    async fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        fields: &Map<String, Value>,
        comment: Option<&str>,
    ) -> Result<()> {
        self.record("transition_issue")?;
        let Some((_, status)) = TRANSITIONS.iter().find(|(id, _)| *id == transition_id) else {
            return Err(GatewayError::Remote {
                status: Some(400),
                message: format!("Transition id '{transition_id}' is not valid for this issue"),
            });
        };
        {
            let mut issues = lock(&self.issues);
            let existing = issues
                .get_mut(key)
                .ok_or_else(|| not_found(&format!("Issue {key}")))?;
            existing.extend(fields.clone());
            existing.insert("status".into(), json!({ "name": status }));
        }
        if let Some(comment) = comment {
            lock(&self.comments)
                .entry(key.to_string())
                .or_default()
                .push(comment.to_string());
        }
        Ok(())
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<Value> {
        self.record("add_comment")?;
        if !lock(&self.issues).contains_key(key) {
            return Err(not_found(&format!("Issue {key}")));
        }
        lock(&self.comments)
            .entry(key.to_string())
            .or_default()
            .push(body.to_string());
        Ok(json!({ "id": self.next_id().to_string(), "body": body }))
    }

    async fn list_projects(&self, _query: Option<&str>, _max_results: u32) -> Result<Value> {
        self.record("list_projects")?;
        Ok(json!({ "values": [{ "id": "10000", "key": "PROJ", "name": "Project" }], "total": 1 }))
    }

    async fn list_boards(&self, project_key: Option<&str>, _max_results: u32) -> Result<Value> {
        self.record("list_boards")?;
        let project = project_key.unwrap_or("PROJ");
        Ok(json!({ "values": [{ "id": 1, "name": format!("{project} board"), "type": "scrum" }] }))
    }

    async fn list_sprints(&self, board_id: &str, state: Option<&str>) -> Result<Value> {
        self.record("list_sprints")?;
        Ok(json!({
            "values": [{
                "id": 1,
                "originBoardId": board_id,
                "name": "Sprint 1",
                "state": state.unwrap_or("active"),
            }]
        }))
    }

    async fn search_users(&self, query: &str, _max_results: u32) -> Result<Value> {
        self.record("search_users")?;
        Ok(json!([{ "accountId": "5b10ac8d82e05b22cc7d4ef5", "displayName": query }]))
    }

    async fn upload_attachment(
        &self,
        key: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<Vec<Attachment>> {
        self.record("upload_attachment")?;
        if !lock(&self.issues).contains_key(key) {
            return Err(not_found(&format!("Issue {key}")));
        }
        let attachment = Attachment {
            id: self.next_id().to_string(),
            filename: file_name.to_string(),
            size: content.len() as u64,
            mime_type: None,
            content: None,
        };
        lock(&self.attachments).insert(attachment.id.clone(), (attachment.clone(), content));
        Ok(vec![attachment])
    }

    async fn get_attachment(&self, id: &str) -> Result<Attachment> {
        self.record("get_attachment")?;
        lock(&self.attachments)
            .get(id)
            .map(|(attachment, _)| attachment.clone())
            .ok_or_else(|| not_found(&format!("Attachment {id}")))
    }

    async fn download_attachment(
        &self,
        attachment: &Attachment,
        max_bytes: u64,
    ) -> Result<Vec<u8>> {
        self.record("download_attachment")?;
        let content = lock(&self.attachments)
            .get(&attachment.id)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| not_found(&format!("Attachment {}", attachment.id)))?;
        if content.len() as u64 > max_bytes {
            return Err(attachment_too_large(content.len() as u64, max_bytes));
        }
        Ok(content)
    }

    async fn delete_attachment(&self, id: &str) -> Result<()> {
        self.record("delete_attachment")?;
        lock(&self.attachments)
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(&format!("Attachment {id}")))
    }

    async fn my_permissions(&self, _project_key: Option<&str>) -> Result<CapabilitySet> {
        self.record("my_permissions")?;
        Ok(lock(&self.permissions).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_lifecycle() {
        let tracker = MockIssueTracker::new();
        let mut fields = Map::new();
        fields.insert("summary".into(), json!("First"));
        fields.insert("project".into(), json!({ "key": "ABC" }));

        let created = tracker.create_issue(&fields).await.unwrap();
        assert_eq!(created["key"], "ABC-1");

        let mut update = Map::new();
        update.insert("summary".into(), json!("Renamed"));
        tracker.update_issue("ABC-1", &update).await.unwrap();
        assert_eq!(tracker.issue("ABC-1").unwrap()["summary"], "Renamed");

        tracker.delete_issue("ABC-1", false).await.unwrap();
        assert!(tracker.get_issue("ABC-1", &[]).await.is_err());
        assert_eq!(tracker.calls("get_issue"), 1);
        assert_eq!(tracker.total_calls(), 4);
    }

    #[tokio::test]
    async fn test_simulated_failures() {
        let tracker = MockIssueTracker::new();
        tracker.fail_with("my_permissions", 503);
        match tracker.my_permissions(None).await {
            Err(GatewayError::Remote { status, .. }) => assert_eq!(status, Some(503)),
            other => panic!("unexpected {other:?}"),
        }
        tracker.recover("my_permissions");
        assert!(tracker.my_permissions(None).await.unwrap().contains("BROWSE_PROJECTS"));
        assert_eq!(tracker.calls("my_permissions"), 2);
    }

    #[tokio::test]
    async fn test_transition_updates_status() {
        let tracker = MockIssueTracker::new().with_issue("PROJ-1", json!({ "summary": "x" }));
        tracker
            .transition_issue("PROJ-1", "31", &Map::new(), Some("done"))
            .await
            .unwrap();
        assert_eq!(tracker.issue("PROJ-1").unwrap()["status"]["name"], "Done");
        assert_eq!(tracker.comments("PROJ-1"), ["done"]);
        assert!(tracker
            .transition_issue("PROJ-1", "99", &Map::new(), None)
            .await
            .is_err());
    }
}
