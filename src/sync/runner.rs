//! Batch run orchestration.
//!
//! Pulls candidates, iterates with a soft time guard, isolates per-object
//! failures, aggregates a structured result and invalidates downstream read
//! caches afterward. Per-object errors never escape this boundary; only
//! selection-phase configuration errors and unresolvable servers do.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::CatalogStore;
use crate::error::{Result, SyncError};
use crate::sync::audit::AuditSink;
use crate::sync::exporter::SyncExporter;
use crate::sync::select::{CandidateSelector, TimeBudget};

/// Aggregated outcome of one synchronization run. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub server: String,
    pub class: String,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    /// Candidates attempted, successes and failures included.
    pub total: usize,
    pub synced: usize,
    pub errored: usize,
    /// Per-object error lines, in processing order.
    pub errors: Vec<String>,
    /// Human-readable remark for normal non-error outcomes such as an empty
    /// candidate set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub duration_ms: u64,
}

/// Coarse classification of a run for callers deciding presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing was eligible; not an error.
    Empty,
    /// Every attempted object synchronized.
    Success,
    /// At least one object failed; the rest were still attempted.
    PartialSuccess,
}

impl RunResult {
    pub fn outcome(&self) -> RunOutcome {
        if self.total == 0 {
            RunOutcome::Empty
        } else if self.errored == 0 {
            RunOutcome::Success
        } else {
            RunOutcome::PartialSuccess
        }
    }
}

/// Downstream read cache invalidated after each run. Best-effort: failures
/// are logged, never fatal.
#[async_trait]
pub trait ReadCache: Send + Sync {
    async fn invalidate_all(&self) -> AnyResult<()>;
}

/// Cache stand-in for deployments without a read cache.
pub struct NoopCache;

#[async_trait]
impl ReadCache for NoopCache {
    async fn invalidate_all(&self) -> AnyResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Upper bound on a single in-flight export. The soft deadline is only
    /// checked between items, so this bound keeps one hung remote call from
    /// stalling the run.
    pub export_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            export_timeout: Duration::from_secs(30),
        }
    }
}

/// Orchestrates one synchronization run end to end.
pub struct BatchRunner {
    store: Arc<dyn CatalogStore>,
    exporter: Arc<dyn SyncExporter>,
    audit: Arc<dyn AuditSink>,
    cache: Arc<dyn ReadCache>,
    config: RunnerConfig,
}

impl BatchRunner {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        exporter: Arc<dyn SyncExporter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            exporter,
            audit,
            cache: Arc::new(NoopCache),
            config: RunnerConfig::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn ReadCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Trigger interface: resolve the server among enabled servers, then run.
    pub async fn run_sync(
        &self,
        server_key: &str,
        class: &str,
        limit: usize,
        budget: Option<TimeBudget>,
    ) -> Result<RunResult> {
        let servers = self.store.enabled_servers().await?;
        if servers.is_empty() {
            return Err(SyncError::NoEnabledServers);
        }
        let server = servers
            .into_iter()
            .find(|s| s.key == server_key)
            .ok_or_else(|| SyncError::ServerNotFound(server_key.to_string()))?;

        let selector = CandidateSelector::new(self.store.clone());
        let candidates = selector.select(&server, class, limit, budget.as_ref()).await?;

        let started = Utc::now();
        let clock = Instant::now();

        if candidates.is_empty() {
            let note = format!("there are no {class} to sync for '{}' server", server.name);
            info!(server = %server.key, class, "{note}");
            return Ok(RunResult {
                server: server.name,
                class: class.to_string(),
                started,
                finished: Utc::now(),
                total: 0,
                synced: 0,
                errored: 0,
                errors: Vec::new(),
                note: Some(note),
                duration_ms: clock.elapsed().as_millis() as u64,
            });
        }

        info!(
            server = %server.key,
            class,
            candidates = candidates.len(),
            "starting synchronization run"
        );

        let deadline_ms = budget.map(|b| b.deadline_ms());
        let mut total = 0usize;
        let mut synced = 0usize;
        let mut errors: Vec<String> = Vec::new();

        for candidate in candidates {
            let object_id = candidate.id;
            // Soft deadline: checked between items only; an in-flight export
            // is never preempted, so the run can overrun by one item.
            if let Some(deadline) = deadline_ms {
                let elapsed = clock.elapsed().as_millis() as i64;
                if elapsed >= deadline {
                    debug!(
                        elapsed_ms = elapsed,
                        deadline_ms = deadline,
                        "time budget exhausted, leaving remaining candidates for the next run"
                    );
                    break;
                }
            }

            let attempt = tokio::time::timeout(
                self.config.export_timeout,
                self.exporter.export(object_id, &server),
            )
            .await;

            match attempt {
                Ok(Ok(())) => synced += 1,
                Ok(Err(err)) => {
                    self.capture_error(&server.name, object_id, err.to_string(), &mut errors)
                        .await;
                }
                Err(_) => {
                    let message = format!(
                        "OBJECT ID {object_id}: export timed out after {:?}",
                        self.config.export_timeout
                    );
                    self.capture_error(&server.name, object_id, message, &mut errors)
                        .await;
                }
            }
            total += 1;
        }

        if let Err(err) = self.cache.invalidate_all().await {
            warn!("read cache invalidation failed: {err:#}");
        }

        let result = RunResult {
            server: server.name.clone(),
            class: class.to_string(),
            started,
            finished: Utc::now(),
            total,
            synced,
            errored: errors.len(),
            errors,
            note: None,
            duration_ms: clock.elapsed().as_millis() as u64,
        };

        if let Err(err) = self.audit.record_run(&result).await {
            warn!("audit write failed for run result: {err:#}");
        }

        info!(
            server = %server.key,
            class,
            total = result.total,
            synced = result.synced,
            errored = result.errored,
            duration_ms = result.duration_ms,
            "synchronization run finished"
        );
        Ok(result)
    }

    /// Record a per-object failure durably before moving on.
    async fn capture_error(
        &self,
        server_name: &str,
        object_id: u64,
        message: String,
        errors: &mut Vec<String>,
    ) {
        warn!(object = object_id, server = server_name, "{message}");
        if let Err(err) = self
            .audit
            .record_error(server_name, object_id, &message)
            .await
        {
            warn!("audit write failed for object {object_id}: {err:#}");
        }
        errors.push(message);
    }
}
