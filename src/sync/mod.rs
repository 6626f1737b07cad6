//! Batch synchronization engine.
//!
//! Candidate selection, time-budgeted batch execution with per-item
//! isolation, image reconciliation against the remote cache, audit logging
//! and editing-workflow hooks.

pub mod audit;
pub mod exporter;
pub mod hooks;
pub mod reconcile;
pub mod runner;
pub mod select;

pub use audit::{AuditSink, FileAuditLog, MemoryAudit};
pub use exporter::{ProductExporter, SyncExporter};
pub use hooks::{HookRegistry, NoopHooks, ObjectHooks, SyncFlagHooks};
pub use reconcile::{reconcile, ImageOperation, ReconcilePolicy};
pub use runner::{BatchRunner, NoopCache, ReadCache, RunOutcome, RunResult, RunnerConfig};
pub use select::{CandidateSelector, TimeBudget, DEFAULT_SYNC_LIMIT};
