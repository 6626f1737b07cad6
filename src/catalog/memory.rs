//! In-memory catalog store.
//!
//! Backs tests and the CLI dry-run path, and doubles as the reference for
//! the store contract: all record mutation goes through one `RwLock`, so a
//! single run never loses a sync-flag update. Cross-run read-then-write
//! races on the `sync` flag are intentionally kept (see DESIGN.md).

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::catalog::store::CatalogStore;
use crate::catalog::types::{ExportRecord, ObjectId, ObjectRecord, TargetServer};

#[derive(Default)]
struct Inner {
    /// class name -> declares an export-servers field
    classes: HashMap<String, bool>,
    servers: HashMap<String, TargetServer>,
    objects: BTreeMap<ObjectId, ObjectRecord>,
    export_records: HashMap<(ObjectId, String), ExportRecord>,
    edges: HashSet<(ObjectId, String)>,
}

/// Catalog store held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class that declares the server-association field.
    pub async fn insert_class(&self, name: &str) {
        self.inner.write().await.classes.insert(name.to_string(), true);
    }

    /// Register a class without the server-association field; selection
    /// against it fails with a configuration error.
    pub async fn insert_class_without_export_field(&self, name: &str) {
        self.inner.write().await.classes.insert(name.to_string(), false);
    }

    pub async fn insert_server(&self, server: TargetServer) {
        self.inner
            .write()
            .await
            .servers
            .insert(server.key.clone(), server);
    }

    pub async fn insert_object(&self, object: ObjectRecord) {
        let mut inner = self.inner.write().await;
        inner.classes.entry(object.class.clone()).or_insert(true);
        inner.objects.insert(object.id, object);
    }

    pub async fn set_export_record(&self, id: ObjectId, server_key: &str, record: ExportRecord) {
        self.inner
            .write()
            .await
            .export_records
            .insert((id, server_key.to_string()), record);
    }

    /// Declare the server as an export destination of the object.
    pub async fn add_server_edge(&self, id: ObjectId, server_key: &str) {
        self.inner
            .write()
            .await
            .edges
            .insert((id, server_key.to_string()));
    }

    /// Build a store from a serialized catalog snapshot.
    pub async fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.write().await;
            for class in snapshot.classes {
                inner.classes.insert(class, true);
            }
            for server in snapshot.servers {
                inner.servers.insert(server.key.clone(), server);
            }
            for entry in snapshot.objects {
                let id = entry.record.id;
                inner.classes.entry(entry.record.class.clone()).or_insert(true);
                for (server_key, record) in entry.export {
                    inner.export_records.insert((id, server_key), record);
                }
                for server_key in entry.servers {
                    inner.edges.insert((id, server_key));
                }
                inner.objects.insert(id, entry.record);
            }
        }
        store
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn server(&self, key: &str) -> Result<Option<TargetServer>> {
        Ok(self.inner.read().await.servers.get(key).cloned())
    }

    async fn enabled_servers(&self) -> Result<Vec<TargetServer>> {
        let inner = self.inner.read().await;
        let mut servers: Vec<TargetServer> =
            inner.servers.values().filter(|s| s.enabled).cloned().collect();
        servers.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(servers)
    }

    async fn class_declares_export_servers(&self, class: &str) -> Result<bool> {
        Ok(self
            .inner
            .read()
            .await
            .classes
            .get(class)
            .copied()
            .unwrap_or(false))
    }

    async fn published_objects(&self, class: &str) -> Result<Vec<ObjectId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .objects
            .values()
            .filter(|o| o.published && o.class == class)
            .map(|o| o.id)
            .collect())
    }

    async fn published_objects_since(
        &self,
        class: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ObjectId>> {
        let inner = self.inner.read().await;
        Ok(inner
            .objects
            .values()
            .filter(|o| o.published && o.class == class && o.modified >= since)
            .map(|o| o.id)
            .collect())
    }

    async fn object(&self, id: ObjectId) -> Result<Option<ObjectRecord>> {
        Ok(self.inner.read().await.objects.get(&id).cloned())
    }

    async fn export_record(&self, id: ObjectId, server_key: &str) -> Result<Option<ExportRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .export_records
            .get(&(id, server_key.to_string()))
            .copied())
    }

    async fn has_server_edge(&self, id: ObjectId, server_key: &str) -> Result<bool> {
        Ok(self
            .inner
            .read()
            .await
            .edges
            .contains(&(id, server_key.to_string())))
    }

    async fn mark_synced(&self, id: ObjectId, server_key: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.export_records.get_mut(&(id, server_key.to_string())) {
            Some(record) => {
                record.sync = Some(true);
                Ok(())
            }
            None => bail!("no export record for object {id} on server '{server_key}'"),
        }
    }

    async fn reset_sync(&self, id: ObjectId) -> Result<()> {
        let mut inner = self.inner.write().await;
        for ((record_id, _), record) in inner.export_records.iter_mut() {
            if *record_id == id {
                record.sync = None;
            }
        }
        Ok(())
    }
}

/// Serialized form of a catalog, loadable from a JSON file by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub servers: Vec<TargetServer>,
    #[serde(default)]
    pub objects: Vec<SnapshotObject>,
}

/// One object plus its per-server sync state and export destinations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotObject {
    #[serde(flatten)]
    pub record: ObjectRecord,
    /// server key -> export record
    #[serde(default)]
    pub export: HashMap<String, ExportRecord>,
    /// server keys this object declares as export destinations
    #[serde(default)]
    pub servers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_published_objects_since_filters_on_modified() {
        let store = MemoryStore::new();
        let cutoff = Utc::now();

        let mut stale = ObjectRecord::new(1, "product");
        stale.modified = cutoff - Duration::hours(1);
        store.insert_object(stale).await;

        let mut fresh = ObjectRecord::new(2, "product");
        fresh.modified = cutoff + Duration::hours(1);
        store.insert_object(fresh).await;

        let mut unpublished = ObjectRecord::new(3, "product").unpublished();
        unpublished.modified = cutoff + Duration::hours(1);
        store.insert_object(unpublished).await;

        let recent = store.published_objects_since("product", cutoff).await.unwrap();
        assert_eq!(recent, vec![2]);

        let all = store.published_objects("product").await.unwrap();
        assert_eq!(all, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_snapshot_round_trips_into_a_store() {
        let raw = serde_json::json!({
            "servers": [
                { "key": "shop", "name": "Main Shop" }
            ],
            "objects": [
                {
                    "id": 1,
                    "class": "product",
                    "published": true,
                    "modified": Utc::now(),
                    "export": { "shop": { "export": true, "complete": true } },
                    "servers": ["shop"]
                }
            ]
        });
        let snapshot: CatalogSnapshot = serde_json::from_value(raw).unwrap();
        let store = MemoryStore::from_snapshot(snapshot).await;

        assert_eq!(store.enabled_servers().await.unwrap().len(), 1);
        assert!(store.class_declares_export_servers("product").await.unwrap());
        assert!(store.has_server_edge(1, "shop").await.unwrap());
        let record = store.export_record(1, "shop").await.unwrap().unwrap();
        assert!(record.is_candidate());
    }
}
