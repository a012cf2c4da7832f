//! REST adapter for Jira Cloud
//!
//! Talks to the platform API (`/rest/api/3`) and the agile API
//! (`/rest/agile/1.0`) with basic authentication. Non-success responses are
//! mapped to [`GatewayError::Remote`] carrying the status and the tracker's own
//! error messages.

use super::{attachment_too_large, Attachment, CapabilitySet, IssueTrackerClient, SearchRequest};
use crate::config::ConnectionConfig;
use crate::error::ErrorContext;
use crate::{GatewayError, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

const API: &str = "rest/api/3";
const AGILE_API: &str = "rest/agile/1.0";

/// Largest up-front buffer reservation for a download
const DOWNLOAD_CAPACITY_HINT: u64 = 1024 * 1024;

/// Capability keys requested from the permissions endpoint
pub const KNOWN_PERMISSIONS: &[&str] = &[
    "ADMINISTER",
    "ADMINISTER_PROJECTS",
    "BROWSE_PROJECTS",
    "BROWSE_USERS",
    "CREATE_ISSUES",
    "EDIT_ISSUES",
    "ASSIGN_ISSUES",
    "RESOLVE_ISSUES",
    "TRANSITION_ISSUES",
    "DELETE_ISSUES",
    "ADD_COMMENTS",
    "CREATE_ATTACHMENTS",
    "DELETE_OWN_ATTACHMENTS",
    "DELETE_ALL_ATTACHMENTS",
    "BULK_CHANGE",
    "MANAGE_SPRINTS_PERMISSION",
];

/// Rich-text fields the v3 API only accepts as documents
const DOCUMENT_FIELDS: &[&str] = &["description", "environment"];

/// Jira Cloud REST client
#[derive(Clone)]
pub struct JiraRestClient {
    client: Client,
    base: Url,
    email: String,
    api_token: String,
}

impl std::fmt::Debug for JiraRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraRestClient")
            .field("base", &self.base.as_str())
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl JiraRestClient {
    /// Build a client from connection settings
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let mut base = Url::parse(&config.base_url).map_err(|e| {
            GatewayError::Other(format!("Invalid tracker URL '{}': {e}", config.base_url))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("issuegate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base,
            email: config.email.clone(),
            api_token: config.api_token.clone(),
        })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| GatewayError::Other(format!("Invalid request path '{path}': {e}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.email, Some(&self.api_token))
            .header(ACCEPT, HeaderValue::from_static("application/json"))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(remote_error(status, &body))
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<Value> {
        let response = self.send(builder).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        let url = response.url().clone();
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).with_context(|| format!("Malformed JSON from {url}"))
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.endpoint(path)?;
        self.send_json(self.request(Method::GET, url).query(query))
            .await
    }
}

#[async_trait]
impl IssueTrackerClient for JiraRestClient {
    async fn search_issues(&self, request: &SearchRequest) -> Result<Value> {
        let mut body = json!({
            "jql": request.jql,
            "startAt": request.start_at,
            "maxResults": request.max_results,
        });
        if !request.fields.is_empty() {
            body["fields"] = json!(request.fields);
        }
        let url = self.endpoint(&format!("{API}/search"))?;
        self.send_json(self.request(Method::POST, url).json(&body))
            .await
    }

    async fn get_issue(&self, key: &str, fields: &[String]) -> Result<Value> {
        let mut query = Vec::new();
        if !fields.is_empty() {
            query.push(("fields", fields.join(",")));
        }
        self.get_json(&format!("{API}/issue/{key}"), &query).await
    }

    async fn create_issue(&self, fields: &Map<String, Value>) -> Result<Value> {
        let url = self.endpoint(&format!("{API}/issue"))?;
        let body = json!({ "fields": with_documents(fields) });
        self.send_json(self.request(Method::POST, url).json(&body))
            .await
    }

    async fn update_issue(&self, key: &str, fields: &Map<String, Value>) -> Result<()> {
        let url = self.endpoint(&format!("{API}/issue/{key}"))?;
        let body = json!({ "fields": with_documents(fields) });
        self.send(self.request(Method::PUT, url).json(&body)).await?;
        Ok(())
    }

    async fn delete_issue(&self, key: &str, delete_subtasks: bool) -> Result<()> {
        let url = self.endpoint(&format!("{API}/issue/{key}"))?;
        let builder = self
            .request(Method::DELETE, url)
            .query(&[("deleteSubtasks", delete_subtasks.to_string())]);
        self.send(builder).await?;
        Ok(())
    }

    async fn get_transitions(&self, key: &str) -> Result<Value> {
        self.get_json(&format!("{API}/issue/{key}/transitions"), &[])
            .await
    }

    async fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        fields: &Map<String, Value>,
        comment: Option<&str>,
    ) -> Result<()> {
        let mut body = json!({ "transition": { "id": transition_id } });
        if !fields.is_empty() {
            body["fields"] = Value::Object(with_documents(fields));
        }
        if let Some(comment) = comment {
            body["update"] = json!({ "comment": [{ "add": { "body": document(comment) } }] });
        }
        let url = self.endpoint(&format!("{API}/issue/{key}/transitions"))?;
        self.send(self.request(Method::POST, url).json(&body)).await?;
        Ok(())
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<Value> {
        let url = self.endpoint(&format!("{API}/issue/{key}/comment"))?;
        let payload = json!({ "body": document(body) });
        self.send_json(self.request(Method::POST, url).json(&payload))
            .await
    }

    async fn list_projects(&self, query: Option<&str>, max_results: u32) -> Result<Value> {
        let mut params = vec![("maxResults", max_results.to_string())];
        if let Some(query) = query {
            params.push(("query", query.to_string()));
        }
        self.get_json(&format!("{API}/project/search"), &params)
            .await
    }

    async fn list_boards(&self, project_key: Option<&str>, max_results: u32) -> Result<Value> {
        let mut params = vec![("maxResults", max_results.to_string())];
        if let Some(project) = project_key {
            params.push(("projectKeyOrId", project.to_string()));
        }
        self.get_json(&format!("{AGILE_API}/board"), &params).await
    }

    async fn list_sprints(&self, board_id: &str, state: Option<&str>) -> Result<Value> {
        let params: Vec<(&str, String)> = state
            .map(|s| ("state", s.to_string()))
            .into_iter()
            .collect();
        self.get_json(&format!("{AGILE_API}/board/{board_id}/sprint"), &params)
            .await
    }

    async fn search_users(&self, query: &str, max_results: u32) -> Result<Value> {
        let params = [
            ("query", query.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        self.get_json(&format!("{API}/user/search"), &params).await
    }

    async fn upload_attachment(
        &self,
        key: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<Vec<Attachment>> {
        let part = reqwest::multipart::Part::bytes(content).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let url = self.endpoint(&format!("{API}/issue/{key}/attachments"))?;
        let builder = self
            .request(Method::POST, url)
            .header("X-Atlassian-Token", HeaderValue::from_static("no-check"))
            .multipart(form);
        let value = self.send_json(builder).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn get_attachment(&self, id: &str) -> Result<Attachment> {
        let value = self.get_json(&format!("{API}/attachment/{id}"), &[]).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn download_attachment(
        &self,
        attachment: &Attachment,
        max_bytes: u64,
    ) -> Result<Vec<u8>> {
        let url = match &attachment.content {
            Some(content) => Url::parse(content).map_err(|e| {
                GatewayError::Other(format!("Invalid attachment content URL '{content}': {e}"))
            })?,
            None => self.endpoint(&format!("{API}/attachment/content/{}", attachment.id))?,
        };
        if url.host_str() != self.base.host_str() {
            return Err(GatewayError::remote(format!(
                "Attachment {} is served from an unexpected host",
                attachment.id
            )));
        }

        let response = self
            .send(
                self.client
                    .get(url)
                    .basic_auth(&self.email, Some(&self.api_token)),
            )
            .await?;

        let capacity = attachment.size.min(max_bytes).min(DOWNLOAD_CAPACITY_HINT);
        let mut content = Vec::with_capacity(capacity as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let received = content.len() as u64 + chunk.len() as u64;
            if received > max_bytes {
                return Err(attachment_too_large(received, max_bytes));
            }
            content.extend_from_slice(&chunk);
        }
        Ok(content)
    }

    async fn delete_attachment(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&format!("{API}/attachment/{id}"))?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn my_permissions(&self, project_key: Option<&str>) -> Result<CapabilitySet> {
        let mut params = vec![("permissions", KNOWN_PERMISSIONS.join(","))];
        if let Some(project) = project_key {
            params.push(("projectKey", project.to_string()));
        }
        let value = self
            .get_json(&format!("{API}/mypermissions"), &params)
            .await?;
        Ok(granted_permissions(&value))
    }
}

/// Minimal document wrapping a single paragraph of plain text
pub fn document(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{
            "type": "paragraph",
            "content": [{ "type": "text", "text": text }],
        }],
    })
}

/// Convert plain-text rich-text fields into documents
fn with_documents(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| match value {
            Value::String(text) if DOCUMENT_FIELDS.contains(&name.as_str()) => {
                (name.clone(), document(text))
            }
            _ => (name.clone(), value.clone()),
        })
        .collect()
}

/// Capability keys with `havePermission: true`
fn granted_permissions(body: &Value) -> CapabilitySet {
    body.get("permissions")
        .and_then(Value::as_object)
        .map(|permissions| {
            permissions
                .iter()
                .filter(|(_, p)| p.get("havePermission").and_then(Value::as_bool) == Some(true))
                .map(|(key, _)| key.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Build a remote error from a failed response body
fn remote_error(status: StatusCode, body: &str) -> GatewayError {
    let mut messages = Vec::new();
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(list) = value.get("errorMessages").and_then(Value::as_array) {
            messages.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
        }
        if let Some(errors) = value.get("errors").and_then(Value::as_object) {
            messages.extend(
                errors
                    .iter()
                    .map(|(field, msg)| format!("{field}: {}", msg.as_str().unwrap_or_default())),
            );
        }
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            messages.push(message.to_string());
        }
    }

    let message = if messages.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        messages.join("; ")
    };

    GatewayError::Remote {
        status: Some(status.as_u16()),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(base_url: &str) -> ConnectionConfig {
        ConnectionConfig {
            base_url: base_url.to_string(),
            email: "bot@example.com".to_string(),
            api_token: "secret".to_string(),
            ..ConnectionConfig::default()
        }
    }

    #[test]
    fn test_endpoints_resolve_under_base_path() {
        let client = JiraRestClient::new(&connection("https://example.atlassian.net/jira")).unwrap();
        let url = client.endpoint("rest/api/3/issue/PROJ-1").unwrap();
        assert_eq!(url.as_str(), "https://example.atlassian.net/jira/rest/api/3/issue/PROJ-1");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(JiraRestClient::new(&connection("not a url")).is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let client = JiraRestClient::new(&connection("https://example.atlassian.net")).unwrap();
        assert!(!format!("{client:?}").contains("secret"));
    }

    #[test]
    fn test_remote_error_joins_messages() {
        let body = r#"{"errorMessages":["Issue does not exist"],"errors":{"summary":"required"}}"#;
        match remote_error(StatusCode::NOT_FOUND, body) {
            GatewayError::Remote { status, message } => {
                assert_eq!(status, Some(404));
                assert_eq!(message, "Issue does not exist; summary: required");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    /// Serve one HTTP response carrying `body` on a local port
    async fn serve_once(body: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&body).await;
        });
        format!("http://{addr}")
    }

    fn declared(size: u64) -> Attachment {
        Attachment {
            id: "10001".to_string(),
            filename: "report.bin".to_string(),
            size,
            mime_type: None,
            content: None,
        }
    }

    #[tokio::test]
    async fn test_download_stops_past_byte_cap() {
        let base = serve_once(vec![1u8; 4096]).await;
        let client = JiraRestClient::new(&connection(&base)).unwrap();

        let err = client
            .download_attachment(&declared(10), 1024)
            .await
            .unwrap_err();
        assert_eq!(err.security_code(), Some(crate::error::SecurityCode::FileTooLarge));
    }

    #[tokio::test]
    async fn test_download_within_cap() {
        let base = serve_once(b"attachment body".to_vec()).await;
        let client = JiraRestClient::new(&connection(&base)).unwrap();

        let content = client
            .download_attachment(&declared(15), 1024)
            .await
            .unwrap();
        assert_eq!(content, b"attachment body");
    }

    #[test]
    fn test_remote_error_without_body() {
        let err = remote_error(StatusCode::BAD_GATEWAY, "<html>");
        assert_eq!(err.to_string(), "Remote service error (502): Bad Gateway");
    }

    #[test]
    fn test_plain_descriptions_become_documents() {
        let mut fields = Map::new();
        fields.insert("summary".into(), json!("Title"));
        fields.insert("description".into(), json!("Body text"));
        let converted = with_documents(&fields);
        assert_eq!(converted["summary"], "Title");
        assert_eq!(converted["description"]["type"], "doc");
        assert_eq!(
            converted["description"]["content"][0]["content"][0]["text"],
            "Body text"
        );
    }

    #[test]
    fn test_granted_permissions() {
        let body = json!({
            "permissions": {
                "BROWSE_PROJECTS": { "havePermission": true },
                "DELETE_ISSUES": { "havePermission": false },
                "EDIT_ISSUES": { "havePermission": true },
            }
        });
        let granted = granted_permissions(&body);
        assert_eq!(
            granted.into_iter().collect::<Vec<_>>(),
            ["BROWSE_PROJECTS", "EDIT_ISSUES"]
        );
        assert!(granted_permissions(&json!({})).is_empty());
    }
}
