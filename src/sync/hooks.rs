//! Editing-workflow hooks.
//!
//! The hosting platform raises object lifecycle events; a registry maps the
//! object's class tag to a handler implementing the capability set below.
//! Unknown tags resolve to a silent no-op, so unmanaged classes are ignored.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::catalog::{CatalogStore, ObjectRecord};
use crate::remote::RemotePlatform;

/// Lifecycle capability set for one object class.
#[async_trait]
pub trait ObjectHooks: Send + Sync {
    async fn pre_add(&self, _object: &ObjectRecord) -> Result<()> {
        Ok(())
    }

    async fn pre_update(&self, _object: &ObjectRecord) -> Result<()> {
        Ok(())
    }

    async fn post_update(&self, _object: &ObjectRecord) -> Result<()> {
        Ok(())
    }

    async fn post_delete(&self, _object: &ObjectRecord) -> Result<()> {
        Ok(())
    }
}

/// Handler that does nothing, used for unmanaged classes.
pub struct NoopHooks;

#[async_trait]
impl ObjectHooks for NoopHooks {}

/// Registry mapping a class tag to its handler. Tags are matched
/// case-insensitively.
pub struct HookRegistry {
    handlers: HashMap<String, Arc<dyn ObjectHooks>>,
    fallback: Arc<dyn ObjectHooks>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Arc::new(NoopHooks),
        }
    }

    pub fn register(&mut self, class: &str, handler: Arc<dyn ObjectHooks>) {
        self.handlers.insert(class.to_lowercase(), handler);
    }

    /// Resolve the handler for a class tag, falling back to the no-op.
    pub fn handler_for(&self, class: &str) -> Arc<dyn ObjectHooks> {
        match self.handlers.get(&class.to_lowercase()) {
            Some(handler) => handler.clone(),
            None => {
                debug!(class, "class is not managed, ignoring event");
                self.fallback.clone()
            }
        }
    }

    pub async fn pre_add(&self, object: &ObjectRecord) -> Result<()> {
        self.handler_for(&object.class).pre_add(object).await
    }

    pub async fn pre_update(&self, object: &ObjectRecord) -> Result<()> {
        self.handler_for(&object.class).pre_update(object).await
    }

    pub async fn post_update(&self, object: &ObjectRecord) -> Result<()> {
        self.handler_for(&object.class).post_update(object).await
    }

    pub async fn post_delete(&self, object: &ObjectRecord) -> Result<()> {
        self.handler_for(&object.class).post_delete(object).await
    }
}

/// Keeps sync state honest across edits and deletions: an edited object
/// becomes a candidate again on every server, a deleted object is removed
/// from the remote platform when it exists there.
pub struct SyncFlagHooks {
    store: Arc<dyn CatalogStore>,
    platform: Arc<dyn RemotePlatform>,
}

impl SyncFlagHooks {
    pub fn new(store: Arc<dyn CatalogStore>, platform: Arc<dyn RemotePlatform>) -> Self {
        Self { store, platform }
    }
}

#[async_trait]
impl ObjectHooks for SyncFlagHooks {
    async fn post_update(&self, object: &ObjectRecord) -> Result<()> {
        self.store.reset_sync(object.id).await
    }

    async fn post_delete(&self, object: &ObjectRecord) -> Result<()> {
        let key = object.external_key();
        if let Some(remote_id) = self.platform.lookup(&key).await? {
            self.platform.delete(&remote_id).await?;
            debug!(object = object.id, remote_id = %remote_id, "deleted remote object");
        }
        Ok(())
    }
}
