// Tests for the JSON-lines audit log

use chrono::Utc;
use tempfile::tempdir;

use outflow::sync::{AuditSink, FileAuditLog, RunResult};

fn sample_result(errored: usize) -> RunResult {
    let errors = (0..errored)
        .map(|i| format!("OBJECT ID {i}: remote write rejected"))
        .collect::<Vec<_>>();
    RunResult {
        server: "Main Shop".to_string(),
        class: "product".to_string(),
        started: Utc::now(),
        finished: Utc::now(),
        total: 3,
        synced: 3 - errored,
        errored,
        errors,
        note: None,
        duration_ms: 42,
    }
}

fn read_lines(path: &std::path::Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_run_records_are_valid_json_lines() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sync-objects.log");
    let log = FileAuditLog::new(&path).unwrap();

    log.record_run(&sample_result(0)).await.unwrap();
    log.record_run(&sample_result(1)).await.unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["kind"], "run");
    assert_eq!(lines[0]["server"], "Main Shop");
    assert_eq!(lines[0]["class"], "PRODUCT");
    assert_eq!(lines[0]["success"], true);
    assert_eq!(lines[1]["success"], false);
    assert_eq!(lines[1]["result"]["errored"], 1);
}

#[tokio::test]
async fn test_error_records_carry_object_and_message() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sync-objects.log");
    let log = FileAuditLog::new(&path).unwrap();

    log.record_error("Main Shop", 42, "OBJECT ID 42: remote write rejected")
        .await
        .unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["kind"], "error");
    assert_eq!(lines[0]["object_id"], 42);
    assert_eq!(lines[0]["message"], "OBJECT ID 42: remote write rejected");
    assert!(lines[0]["timestamp"].is_string());
}

#[tokio::test]
async fn test_log_appends_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sync-objects.log");

    {
        let log = FileAuditLog::new(&path).unwrap();
        log.record_run(&sample_result(0)).await.unwrap();
    }
    {
        let log = FileAuditLog::new(&path).unwrap();
        log.record_error("Main Shop", 7, "OBJECT ID 7: timeout")
            .await
            .unwrap();
    }

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["kind"], "run");
    assert_eq!(lines[1]["kind"], "error");
}

#[tokio::test]
async fn test_missing_parent_directories_are_created() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/logs/sync-objects.log");
    let log = FileAuditLog::new(&path).unwrap();
    assert_eq!(log.path(), path);

    log.record_error("Main Shop", 1, "OBJECT ID 1: boom")
        .await
        .unwrap();
    assert_eq!(read_lines(&path).len(), 1);
}
