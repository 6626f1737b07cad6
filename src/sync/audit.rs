//! Append-only audit record of run outcomes and per-object errors.
//!
//! The sink is constructed once and injected into the runner; callers treat
//! writes as best-effort and must never let an audit failure mask the run
//! result. The file sink persists JSON lines so records survive restarts.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::catalog::ObjectId;
use crate::sync::runner::RunResult;

/// Durable audit sink for synchronization outcomes.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append the structured result of a completed run.
    async fn record_run(&self, result: &RunResult) -> Result<()>;

    /// Append one per-object export error, before the run moves on.
    async fn record_error(&self, server: &str, object_id: ObjectId, message: &str) -> Result<()>;
}

/// JSON-lines audit log on the local filesystem.
///
/// The file is opened once in append mode; each record is one line keyed by
/// timestamp, server and kind.
pub struct FileAuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open audit log {}", path.display()))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: serde_json::Value) -> Result<()> {
        let line = serde_json::to_string(&entry).context("failed to serialize audit entry")?;
        let mut file = self.file.lock().await;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl AuditSink for FileAuditLog {
    async fn record_run(&self, result: &RunResult) -> Result<()> {
        self.append(serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "kind": "run",
            "server": result.server,
            "class": result.class.to_uppercase(),
            "success": result.errored == 0,
            "duration_ms": result.duration_ms,
            "result": result,
        }))
        .await
    }

    async fn record_error(&self, server: &str, object_id: ObjectId, message: &str) -> Result<()> {
        self.append(serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "kind": "error",
            "server": server,
            "object_id": object_id,
            "message": message,
        }))
        .await
    }
}

/// Audit sink held in memory, for tests and dry runs.
#[derive(Default)]
pub struct MemoryAudit {
    runs: Mutex<Vec<RunResult>>,
    errors: Mutex<Vec<(String, ObjectId, String)>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn runs(&self) -> Vec<RunResult> {
        self.runs.lock().await.clone()
    }

    pub async fn errors(&self) -> Vec<(String, ObjectId, String)> {
        self.errors.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAudit {
    async fn record_run(&self, result: &RunResult) -> Result<()> {
        self.runs.lock().await.push(result.clone());
        Ok(())
    }

    async fn record_error(&self, server: &str, object_id: ObjectId, message: &str) -> Result<()> {
        self.errors
            .lock()
            .await
            .push((server.to_string(), object_id, message.to_string()));
        Ok(())
    }
}
