//! End-to-end tests driving the MCP tools through the governance pipeline

use issuegate::audit::{AuditQuery, RiskLevel};
use issuegate::common::OperationClass;
use issuegate::mcp::responses::envelope_json;
use issuegate::test_utils::TestGateway;
use issuegate::tracker::MockIssueTracker;
use rmcp::model::ErrorCode;
use serde_json::{json, Value};

fn seeded_tracker() -> MockIssueTracker {
    MockIssueTracker::new()
        .with_issue("PROJ-1", json!({"summary": "First", "status": {"name": "To Do"}}))
        .with_issue("PROJ-2", json!({"summary": "Second", "status": {"name": "To Do"}}))
}

#[tokio::test]
async fn test_search_then_rate_limit_rejection() {
    let gateway = TestGateway::builder().tracker(seeded_tracker()).build();
    let search = json!({"jql": "project = PROJ AND status = Open", "max_results": 50});

    for _ in 0..3 {
        let result = gateway.call("search_issues", search.clone()).await.unwrap();
        let envelope = envelope_json(&result).unwrap();
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["data"]["total"], 2);
        assert_eq!(envelope["data"]["maxResults"], 50);
    }

    let successes = gateway
        .audit()
        .query(&AuditQuery::new().with_resource_type("search").with_success(true));
    assert_eq!(successes.len(), 3);
    assert!(successes.iter().all(|e| e.operation == "search_issues"));

    let stats = gateway.audit().stats();
    assert_eq!(stats.successes, 3);
    assert_eq!(stats.failures, 0);
    assert_eq!(gateway.tracker().calls("search_issues"), 3);

    gateway.fill_rate_window(OperationClass::Search, 30);

    let err = gateway
        .call("search_issues", search.clone())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    assert!(err.message.contains("Try again in"));
    let data = err.data.unwrap();
    assert_eq!(data["security"], false);
    assert!(data["retry_after_secs"].as_u64().unwrap() >= 1);
    assert_eq!(gateway.tracker().calls("search_issues"), 3);

    let successes = gateway
        .audit()
        .query(&AuditQuery::new().with_resource_type("search").with_success(true));
    assert_eq!(successes.len(), 3);
}

#[tokio::test]
async fn test_dangerous_jql_never_reaches_tracker() {
    let gateway = TestGateway::new();

    let err = gateway
        .call(
            "search_issues",
            json!({"jql": "project = PROJ<script>alert(1)</script>"}),
        )
        .await
        .unwrap_err();

    let data = err.data.unwrap();
    assert_eq!(data["security"], true);
    assert_eq!(data["code"], "DANGEROUS_JQL_PATTERN");
    assert_eq!(gateway.tracker().calls("search_issues"), 0);

    let security = gateway.audit().security_events(10);
    assert_eq!(security.len(), 1);
    assert!(security[0].risk_level >= RiskLevel::High);
}

#[tokio::test]
async fn test_delete_requires_confirmation_phrase() {
    let gateway = TestGateway::builder().tracker(seeded_tracker()).build();

    for confirm in [Value::Null, json!("yes")] {
        let err = gateway
            .call("delete_issue", json!({"issue_key": "PROJ-1", "confirm": confirm}))
            .await
            .unwrap_err();
        assert_eq!(err.data.unwrap()["code"], "CONFIRMATION_REQUIRED");
    }
    assert_eq!(gateway.tracker().calls("delete_issue"), 0);
    assert!(gateway.tracker().issue("PROJ-1").is_some());

    let result = gateway
        .call(
            "delete_issue",
            json!({"issue_key": "PROJ-1", "confirm": "CONFIRM_DELETE"}),
        )
        .await
        .unwrap();
    assert_eq!(envelope_json(&result).unwrap()["data"]["deleted"], true);
    assert!(gateway.tracker().issue("PROJ-1").is_none());

    let deletes = gateway
        .audit()
        .query(&AuditQuery::new().with_operation("delete_issue").with_success(true));
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].risk_level, RiskLevel::Critical);
    assert_eq!(deletes[0].resource_id.as_deref(), Some("PROJ-1"));
}

#[tokio::test]
async fn test_permission_fetch_failure_fails_open() {
    let gateway = TestGateway::builder().tracker(seeded_tracker()).build();
    gateway.tracker().fail("my_permissions");

    let result = gateway
        .call("add_comment", json!({"issue_key": "PROJ-2", "body": "Looks good"}))
        .await
        .unwrap();
    assert_eq!(envelope_json(&result).unwrap()["success"], true);
    assert_eq!(gateway.tracker().comments("PROJ-2"), vec!["Looks good"]);
    assert_eq!(gateway.tracker().calls("my_permissions"), 1);
}

#[tokio::test]
async fn test_disabled_operation_rejected() {
    let gateway = TestGateway::builder()
        .tracker(seeded_tracker())
        .configure(|config| config.operations.enable_create = false)
        .build();

    let err = gateway
        .call(
            "create_issue",
            json!({"project_key": "PROJ", "summary": "New"}),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    assert!(err.message.contains("disabled"));
    assert_eq!(gateway.tracker().calls("create_issue"), 0);
    assert!(!gateway.dispatcher().is_enabled("create_issue"));
}

#[tokio::test]
async fn test_issue_lifecycle() {
    let gateway = TestGateway::builder().tracker(seeded_tracker()).build();

    let created = gateway
        .call(
            "create_issue",
            json!({
                "project_key": "PROJ",
                "summary": "Login page times out",
                "issue_type": "Bug",
                "fields": {"labels": ["auth"]}
            }),
        )
        .await
        .unwrap();
    let key = envelope_json(&created).unwrap()["data"]["key"]
        .as_str()
        .unwrap()
        .to_string();

    gateway
        .call(
            "update_issue",
            json!({"issue_key": key, "fields": {"summary": "Login page times out on Safari"}}),
        )
        .await
        .unwrap();
    assert_eq!(
        gateway.tracker().issue(&key).unwrap()["summary"],
        "Login page times out on Safari"
    );

    let transitions = gateway
        .call("transition_issue", json!({"issue_key": key}))
        .await
        .unwrap();
    let listed = envelope_json(&transitions).unwrap();
    assert_eq!(listed["data"]["transitions"].as_array().unwrap().len(), 3);

    gateway
        .call(
            "transition_issue",
            json!({"issue_key": key, "transition_id": "31", "comment": "Fixed in 2.4"}),
        )
        .await
        .unwrap();
    assert_eq!(gateway.tracker().issue(&key).unwrap()["status"]["name"], "Done");
    assert_eq!(gateway.tracker().comments(&key), vec!["Fixed in 2.4"]);

    let stats = gateway.call("get_audit_stats", json!({})).await.unwrap();
    let stats = envelope_json(&stats).unwrap();
    assert_eq!(stats["data"]["failures"], 0);
    assert!(stats["data"]["total_entries"].as_u64().unwrap() >= 8);
}

#[tokio::test]
async fn test_remote_failure_is_internal_error_and_audited() {
    let gateway = TestGateway::builder().tracker(seeded_tracker()).build();
    gateway.tracker().fail_with("get_issue", 503);

    let err = gateway
        .call("get_issue", json!({"issue_key": "PROJ-1"}))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
    assert!(err.message.contains("503"));

    let log = gateway
        .call("get_audit_log", json!({"view": "failed"}))
        .await
        .unwrap();
    let log = envelope_json(&log).unwrap();
    assert_eq!(log["data"]["count"], 1);
    assert_eq!(log["data"]["entries"][0]["operation"], "get_issue");
    assert_eq!(log["data"]["entries"][0]["risk_level"], "high");
}

#[tokio::test]
async fn test_bulk_update_reports_partial_failures() {
    let gateway = TestGateway::builder().tracker(seeded_tracker()).build();

    let result = gateway
        .call(
            "bulk_update_issues",
            json!({
                "issue_keys": ["PROJ-1", "PROJ-2", "PROJ-99"],
                "fields": {"labels": ["triaged"]},
                "confirm": "CONFIRM_DELETE"
            }),
        )
        .await
        .unwrap();
    let data = envelope_json(&result).unwrap()["data"].clone();
    assert_eq!(data["updated"], 2);
    assert_eq!(data["failed"], 1);
    assert_eq!(gateway.tracker().issue("PROJ-2").unwrap()["labels"], json!(["triaged"]));
}

#[tokio::test]
async fn test_unknown_tool() {
    let gateway = TestGateway::new();
    let err = gateway.call("drop_database", json!({})).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
}

#[tokio::test]
async fn test_concurrent_calls_share_one_window() {
    let gateway = TestGateway::new();

    let calls = (0..5).map(|_| gateway.call("list_projects", json!({})));
    let results = futures::future::join_all(calls).await;
    assert!(results.iter().all(Result::is_ok));

    let key = OperationClass::Standard.key_for(issuegate::mcp::DEFAULT_CALLER);
    let stats = gateway.rate_limiter(OperationClass::Standard).stats(&key);
    assert_eq!(stats.used, 5);
    assert_eq!(stats.remaining, 55);
    assert_eq!(gateway.tracker().calls("list_projects"), 5);
}
