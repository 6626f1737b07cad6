//! Candidate selection.
//!
//! Joins three sources: published objects of the class, per-server export
//! records in a pending state, and the dependency edge declaring the server
//! as an export destination. Results are ordered ascending by object id so
//! repeated runs paginate deterministically.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{CatalogStore, SyncCandidate, TargetServer};
use crate::error::{Result, SyncError};

/// Flat batch size used when no time budget is supplied.
pub const DEFAULT_SYNC_LIMIT: usize = 10;

/// Soft wall-clock ceiling for a run, expressed as total time, reserved
/// tail time and a per-item estimate. All three fields must be known for a
/// budget to exist at all; a partially specified budget is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBudget {
    /// Total wall-clock time available to the run, in seconds.
    pub exec_time_secs: u64,
    /// Safety tail reserved at the end of the window, in seconds.
    pub max_sync_time_secs: u64,
    /// Expected duration of a single object export, in seconds.
    pub typical_sync_time_secs: u64,
}

impl TimeBudget {
    pub fn new(exec_time_secs: u64, max_sync_time_secs: u64, typical_sync_time_secs: u64) -> Self {
        Self {
            exec_time_secs,
            max_sync_time_secs,
            typical_sync_time_secs,
        }
    }

    /// Batch size that fits the window: `floor((exec - tail) / typical)`,
    /// clamped to zero.
    pub fn batch_limit(&self) -> usize {
        if self.typical_sync_time_secs == 0 {
            return 0;
        }
        (self.exec_time_secs.saturating_sub(self.max_sync_time_secs) / self.typical_sync_time_secs)
            as usize
    }

    /// Point past which no further item may start, in milliseconds from the
    /// run start. Integer math avoids floating-point budget drift.
    pub fn deadline_ms(&self) -> i64 {
        self.exec_time_secs as i64 * 1000 - self.max_sync_time_secs as i64 * 1000
    }
}

/// Selects the objects eligible for export to a given server.
pub struct CandidateSelector {
    store: Arc<dyn CatalogStore>,
}

impl CandidateSelector {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Ordered candidate views of the objects to synchronize, capped at
    /// `limit` or, when a budget is supplied, at the budget-derived batch
    /// size.
    pub async fn select(
        &self,
        server: &TargetServer,
        class: &str,
        limit: usize,
        budget: Option<&TimeBudget>,
    ) -> Result<Vec<SyncCandidate>> {
        if !self.store.class_declares_export_servers(class).await? {
            return Err(SyncError::Configuration(format!(
                "class '{class}' does not declare an export-servers field"
            )));
        }

        let effective_limit = match budget {
            Some(budget) => budget.batch_limit(),
            None => limit,
        };

        let mut published = self.store.published_objects(class).await?;
        published.sort_unstable();

        let mut candidates = Vec::new();
        for id in published {
            if candidates.len() >= effective_limit {
                break;
            }
            let Some(record) = self.store.export_record(id, &server.key).await? else {
                continue;
            };
            if !record.is_candidate() {
                continue;
            }
            if !self.store.has_server_edge(id, &server.key).await? {
                continue;
            }
            candidates.push(SyncCandidate {
                id,
                class: class.to_string(),
            });
        }

        debug!(
            server = %server.key,
            class,
            limit = effective_limit,
            selected = candidates.len(),
            "candidate selection complete"
        );
        Ok(candidates)
    }
}
