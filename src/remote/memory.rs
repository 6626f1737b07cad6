//! In-memory platform used for dry runs and tests.
//!
//! Applies the image operations carried in each upsert payload to its own
//! cached image state, so repeated exports of an unchanged object converge
//! to reference-only operations just like a real platform would.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::catalog::CachedImage;
use crate::remote::platform::{RemoteImageState, RemotePlatform};

#[derive(Debug, Clone, Default)]
struct RemoteObject {
    id: String,
    variant_id: Option<String>,
    images: Vec<CachedImage>,
    upserts: u64,
    last_payload: serde_json::Value,
}

/// Remote platform held entirely in memory.
#[derive(Default)]
pub struct MemoryPlatform {
    objects: RwLock<HashMap<String, RemoteObject>>,
    counter: AtomicU64,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.counter.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Preload cached image state, as if the object had been exported before.
    pub async fn seed(&self, key: &str, variant_id: Option<String>, images: Vec<CachedImage>) {
        let id = self.next_id("rmt");
        self.objects.write().await.insert(
            key.to_string(),
            RemoteObject {
                id,
                variant_id,
                images,
                upserts: 0,
                last_payload: serde_json::Value::Null,
            },
        );
    }

    /// Number of upserts received for the object.
    pub async fn upsert_count(&self, key: &str) -> u64 {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.upserts)
            .unwrap_or(0)
    }

    /// Last payload received for the object.
    pub async fn last_payload(&self, key: &str) -> Option<serde_json::Value> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.last_payload.clone())
    }

    /// Current cached images of the object.
    pub async fn cached_images(&self, key: &str) -> Vec<CachedImage> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.images.clone())
            .unwrap_or_default()
    }

    /// Apply one serialized image operation to the previous cached state.
    fn apply_operation(
        &self,
        op: &serde_json::Value,
        previous: &[CachedImage],
    ) -> Option<CachedImage> {
        let kind = op.get("op")?.as_str()?;
        let name = op.get("name")?.as_str()?.to_string();
        let hash = op.get("hash")?.as_str()?.to_string();
        let local_position = op.get("local_position")?.as_u64()? as u32;
        let prior = previous.iter().find(|c| c.name == name);

        let variant_ids = op
            .get("variant_ids")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect::<Vec<_>>()
            })
            .or_else(|| prior.map(|c| c.variant_ids.clone()))
            .unwrap_or_default();

        let (id, position) = match kind {
            "upload" => (self.next_id("img"), local_position + 1),
            "reference" | "forced_reference" => {
                let id = op.get("id")?.as_str()?.to_string();
                let position = op
                    .get("position")
                    .and_then(|v| v.as_u64())
                    .map(|p| p as u32)
                    .or_else(|| prior.map(|c| c.position))
                    .unwrap_or(local_position + 1);
                (id, position)
            }
            _ => return None,
        };

        Some(CachedImage {
            name,
            id,
            position,
            hash,
            variant_ids,
        })
    }
}

#[async_trait]
impl RemotePlatform for MemoryPlatform {
    async fn upsert(&self, key: &str, payload: &serde_json::Value) -> Result<String> {
        let mut objects = self.objects.write().await;
        let is_new = !objects.contains_key(key);
        let remote_id = if is_new {
            self.next_id("rmt")
        } else {
            objects[key].id.clone()
        };

        let previous = objects.get(key).map(|o| o.images.clone()).unwrap_or_default();
        let images = payload
            .get("images")
            .and_then(|v| v.as_array())
            .map(|ops| {
                ops.iter()
                    .filter_map(|op| self.apply_operation(op, &previous))
                    .collect::<Vec<_>>()
            })
            .unwrap_or(previous);

        let variant_id = objects
            .get(key)
            .and_then(|o| o.variant_id.clone())
            .or_else(|| Some(format!("var-{remote_id}")));

        let upserts = objects.get(key).map(|o| o.upserts).unwrap_or(0) + 1;
        objects.insert(
            key.to_string(),
            RemoteObject {
                id: remote_id.clone(),
                variant_id,
                images,
                upserts,
                last_payload: payload.clone(),
            },
        );
        Ok(remote_id)
    }

    async fn lookup(&self, key: &str) -> Result<Option<String>> {
        Ok(self.objects.read().await.get(key).map(|o| o.id.clone()))
    }

    async fn delete(&self, remote_id: &str) -> Result<()> {
        let mut objects = self.objects.write().await;
        let key = objects
            .iter()
            .find(|(_, o)| o.id == remote_id)
            .map(|(k, _)| k.clone());
        match key {
            Some(key) => {
                objects.remove(&key);
                Ok(())
            }
            None => bail!("unknown remote id '{remote_id}'"),
        }
    }

    async fn read_cached_state(&self, key: &str) -> Result<RemoteImageState> {
        Ok(self
            .objects
            .read()
            .await
            .get(key)
            .map(|o| RemoteImageState {
                variant_id: o.variant_id.clone(),
                images: o.images.clone(),
            })
            .unwrap_or_default())
    }
}
