//! Source-of-truth store interface consumed by the engine.
//!
//! The hosting platform owns object storage; the engine only needs the
//! queries below. Implementations must keep per-object record mutation
//! serialized so a run never loses a sync-flag update.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::catalog::types::{ExportRecord, ObjectId, ObjectRecord, TargetServer};

/// Query and mutation capability over the catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // ========== Target servers ==========

    /// Look up a server by key, enabled or not.
    async fn server(&self, key: &str) -> Result<Option<TargetServer>>;

    /// All servers currently enabled for synchronization.
    async fn enabled_servers(&self) -> Result<Vec<TargetServer>>;

    // ========== Class metadata ==========

    /// Whether the class declares a server-association field. Selection is
    /// impossible without it and fails with a configuration error.
    async fn class_declares_export_servers(&self, class: &str) -> Result<bool>;

    // ========== Objects ==========

    /// Identifiers of published objects of the class.
    async fn published_objects(&self, class: &str) -> Result<Vec<ObjectId>>;

    /// Same filter contract, restricted to objects modified at or after the
    /// given instant. Used by incremental bulk exports.
    async fn published_objects_since(
        &self,
        class: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ObjectId>>;

    /// Full object record, if it exists.
    async fn object(&self, id: ObjectId) -> Result<Option<ObjectRecord>>;

    // ========== Sync state ==========

    /// Per-server export record of an object, if one was ever created.
    async fn export_record(&self, id: ObjectId, server_key: &str) -> Result<Option<ExportRecord>>;

    /// Whether the object declares the server as one of its export
    /// destinations (dependency edge object -> server).
    async fn has_server_edge(&self, id: ObjectId, server_key: &str) -> Result<bool>;

    /// Record a successful export: `sync = true` for this server.
    async fn mark_synced(&self, id: ObjectId, server_key: &str) -> Result<()>;

    /// Editing workflow hook: clear the `sync` flag for every server record
    /// of the object so it becomes a candidate again everywhere.
    async fn reset_sync(&self, id: ObjectId) -> Result<()>;
}
