//! Unified interface to a target platform, implemented once per
//! server family (storefront API, marketplace, ...).

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::CachedImage;

/// Image state read back from the platform before an export, used as the
/// reconciliation baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteImageState {
    /// Remote identifier of the owning variant, once the object has been
    /// created on the server. Seeds first-image variant associations.
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub images: Vec<CachedImage>,
}

/// Remote write/read capability of one target platform.
///
/// `upsert` must be idempotent keyed by the stable external identifier:
/// re-invocation after a prior failure may not corrupt remote state.
#[async_trait]
pub trait RemotePlatform: Send + Sync {
    /// Create or update the object identified by `key`; returns the remote
    /// identifier assigned by the platform.
    async fn upsert(&self, key: &str, payload: &serde_json::Value) -> Result<String>;

    /// Resolve the remote identifier of an object, if it exists remotely.
    async fn lookup(&self, key: &str) -> Result<Option<String>>;

    /// Delete a remote object by its remote identifier.
    async fn delete(&self, remote_id: &str) -> Result<()>;

    /// Last-known image state for the object; empty when the object has
    /// never been exported.
    async fn read_cached_state(&self, key: &str) -> Result<RemoteImageState>;
}
