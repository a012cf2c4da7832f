//! Attachment tools against real files in temporary directories

use issuegate::mcp::responses::envelope_json;
use issuegate::test_utils::TestGateway;
use issuegate::tracker::MockIssueTracker;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn gateway_in(dir: &TempDir) -> TestGateway {
    let root = dir.path().canonicalize().unwrap();
    TestGateway::builder()
        .tracker(MockIssueTracker::new().with_issue("PROJ-1", json!({"summary": "First"})))
        .configure(move |config| config.security.allowed_directories = vec![root])
        .build()
}

#[tokio::test]
async fn test_upload_from_allowed_directory() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("report.txt");
    fs::write(&file, "all green\n").unwrap();
    let gateway = gateway_in(&dir);

    let result = gateway
        .call(
            "upload_attachment",
            json!({"issue_key": "PROJ-1", "file_path": file.to_string_lossy()}),
        )
        .await
        .unwrap();
    let data = envelope_json(&result).unwrap()["data"].clone();
    assert_eq!(data["key"], "PROJ-1");
    assert_eq!(data["attachments"][0]["filename"], "report.txt");
    assert_eq!(data["attachments"][0]["size"], 10);
    assert_eq!(gateway.tracker().calls("upload_attachment"), 1);
}

#[tokio::test]
async fn test_upload_path_traversal_rejected() {
    let dir = TempDir::new().unwrap();
    let gateway = gateway_in(&dir);
    let sneaky = format!("{}/../../etc/passwd", dir.path().display());

    let err = gateway
        .call(
            "upload_attachment",
            json!({"issue_key": "PROJ-1", "file_path": sneaky}),
        )
        .await
        .unwrap_err();
    let data = err.data.unwrap();
    assert_eq!(data["security"], true);
    assert_eq!(data["code"], "DANGEROUS_PATH_PATTERN");
    assert_eq!(gateway.tracker().calls("upload_attachment"), 0);
}

#[tokio::test]
async fn test_upload_outside_allowed_directory_rejected() {
    let allowed = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    let file = elsewhere.path().join("notes.md");
    fs::write(&file, "# notes").unwrap();
    let gateway = gateway_in(&allowed);

    let err = gateway
        .call(
            "upload_attachment",
            json!({"issue_key": "PROJ-1", "file_path": file.to_string_lossy()}),
        )
        .await
        .unwrap_err();
    assert_eq!(err.data.unwrap()["code"], "PATH_NOT_ALLOWED");
}

#[tokio::test]
async fn test_download_writes_attachment_content() {
    let dir = TempDir::new().unwrap();
    let gateway = gateway_in(&dir);
    gateway
        .tracker()
        .insert_attachment("10500", "trace.log", b"frame 1\nframe 2\n");
    let target = dir.path().join("trace.log");

    let result = gateway
        .call(
            "download_attachment",
            json!({"attachment_id": "10500", "save_path": target.to_string_lossy()}),
        )
        .await
        .unwrap();
    let data = envelope_json(&result).unwrap()["data"].clone();
    assert_eq!(data["bytes"], 16);
    assert_eq!(fs::read(&target).unwrap(), b"frame 1\nframe 2\n");
}

#[tokio::test]
async fn test_delete_attachment_needs_confirmation() {
    let dir = TempDir::new().unwrap();
    let gateway = gateway_in(&dir);
    gateway.tracker().insert_attachment("10600", "old.txt", b"stale");

    let err = gateway
        .call("delete_attachment", json!({"attachment_id": "10600"}))
        .await
        .unwrap_err();
    assert_eq!(err.data.unwrap()["code"], "CONFIRMATION_REQUIRED");
    assert!(gateway.tracker().has_attachment("10600"));

    gateway
        .call(
            "delete_attachment",
            json!({"attachment_id": "10600", "confirm": "CONFIRM_DELETE"}),
        )
        .await
        .unwrap();
    assert!(!gateway.tracker().has_attachment("10600"));
}

#[tokio::test]
async fn test_attachments_disabled() {
    let dir = TempDir::new().unwrap();
    let gateway = TestGateway::builder()
        .configure(|config| config.operations.enable_attachments = false)
        .build();
    let file = dir.path().join("report.txt");
    fs::write(&file, "x").unwrap();

    let err = gateway
        .call(
            "upload_attachment",
            json!({"issue_key": "PROJ-1", "file_path": file.to_string_lossy()}),
        )
        .await
        .unwrap_err();
    assert!(err.message.contains("disabled"));
    assert_eq!(gateway.tracker().total_calls(), 0);
}
