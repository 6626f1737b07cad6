//! Per-class, per-server export of a single object.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tracing::debug;

use crate::catalog::{CatalogStore, ObjectId, TargetServer};
use crate::error::ExportError;
use crate::remote::RemotePlatform;
use crate::sync::reconcile::{reconcile, ReconcilePolicy};

/// Transforms one object into the target server's wire representation and
/// performs the remote write. Must be idempotent: re-invocation after a
/// prior failure upserts by stable external key instead of inserting blind.
#[async_trait]
pub trait SyncExporter: Send + Sync {
    async fn export(&self, object_id: ObjectId, server: &TargetServer)
        -> Result<(), ExportError>;
}

/// Exporter for product-like objects carrying an image list.
pub struct ProductExporter {
    store: Arc<dyn CatalogStore>,
    platform: Arc<dyn RemotePlatform>,
}

impl ProductExporter {
    pub fn new(store: Arc<dyn CatalogStore>, platform: Arc<dyn RemotePlatform>) -> Self {
        Self { store, platform }
    }
}

#[async_trait]
impl SyncExporter for ProductExporter {
    async fn export(
        &self,
        object_id: ObjectId,
        server: &TargetServer,
    ) -> Result<(), ExportError> {
        let object = self
            .store
            .object(object_id)
            .await
            .map_err(|e| ExportError::new(object_id, e))?
            .ok_or_else(|| ExportError::new(object_id, anyhow!("object not found in store")))?;

        let key = object.external_key();

        // Read the last-known remote image state as the reconciliation
        // baseline, then compute the minimal operation set.
        let remote_state = self
            .platform
            .read_cached_state(&key)
            .await
            .with_context(|| format!("failed to read cached image state for '{key}'"))
            .map_err(|e| ExportError::new(object_id, e))?;

        let policy = ReconcilePolicy {
            force_full_sync: server.image_full_sync,
            owner_variant_id: remote_state.variant_id.clone(),
        };
        let operations = reconcile(&object.images, &remote_state.images, &policy);

        let payload = serde_json::json!({
            "key": key,
            "class": object.class,
            "published": object.published,
            "fields": object.fields,
            "images": &operations,
        });

        let remote_id = self
            .platform
            .upsert(&key, &payload)
            .await
            .with_context(|| format!("remote write of '{key}' failed"))
            .map_err(|e| ExportError::new(object_id, e))?;

        self.store
            .mark_synced(object_id, &server.key)
            .await
            .map_err(|e| ExportError::new(object_id, e))?;

        debug!(
            object = object_id,
            server = %server.key,
            remote_id = %remote_id,
            images = operations.len(),
            "object exported"
        );
        Ok(())
    }
}
