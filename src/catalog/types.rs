//! Core records shared between the store, the selector and the exporters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identifier of a catalog object in the source-of-truth store.
pub type ObjectId = u64;

/// An external server that objects are exported to.
///
/// Created and edited by an administrator; read-only to the engine.
/// Connection parameters are opaque to the core and only interpreted by the
/// remote platform implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetServer {
    pub key: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Opaque connection parameters (endpoint, credentials, shop handle...).
    #[serde(default)]
    pub connection: serde_json::Value,
    /// When set, image reconciliation runs in forced full-sync mode for this
    /// server: reference data is re-sent for every cached image regardless of
    /// content hashes.
    #[serde(default)]
    pub image_full_sync: bool,
}

fn default_enabled() -> bool {
    true
}

impl TargetServer {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            enabled: true,
            connection: serde_json::Value::Null,
            image_full_sync: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_image_full_sync(mut self) -> Self {
        self.image_full_sync = true;
        self
    }
}

/// Per-object, per-server sync state.
///
/// An object is a candidate for a server iff it is published, `export` and
/// `complete` are set, and `sync` is false or unset. This record is the only
/// coordination primitive between runs; it is not a lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Should this object ever be sent to this server.
    pub export: bool,
    /// Object data is ready for export.
    pub complete: bool,
    /// Has it already been successfully sent. Tri-state: unset / false / true.
    pub sync: Option<bool>,
}

impl ExportRecord {
    /// A record ready to be picked up by the selector.
    pub fn pending() -> Self {
        Self {
            export: true,
            complete: true,
            sync: None,
        }
    }

    /// Eligibility part of the candidate invariant (the published check lives
    /// on the object itself).
    pub fn is_candidate(&self) -> bool {
        self.export && self.complete && !self.sync.unwrap_or(false)
    }
}

/// A transient view over the store: one object eligible for export to a
/// given server in the current run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCandidate {
    pub id: ObjectId,
    pub class: String,
}

/// An image attached to a catalog object, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceImage {
    pub filename: String,
    /// Publicly reachable URL of the image bytes, used as the upload source.
    pub url: String,
    /// Content hash at the current state of the object.
    pub hash: String,
    /// First image of the owning variant; seeds the variant association when
    /// the image has never been uploaded to the server.
    #[serde(default)]
    pub first_of_variant: bool,
}

impl SourceImage {
    pub fn new(filename: impl Into<String>, url: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            url: url.into(),
            hash: hash.into(),
            first_of_variant: false,
        }
    }

    /// Build an image entry from raw bytes, computing the content hash.
    pub fn from_bytes(
        filename: impl Into<String>,
        url: impl Into<String>,
        data: &[u8],
    ) -> Self {
        Self::new(filename, url, content_hash(data))
    }

    pub fn first_of_variant(mut self) -> Self {
        self.first_of_variant = true;
        self
    }
}

/// Last-known state of one image on a target server.
///
/// Written by the target platform after a successful upload and read back
/// before every export as the reconciliation baseline. Absence means "never
/// uploaded to this server".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedImage {
    /// Matches the source filename.
    pub name: String,
    /// Remote asset identifier.
    pub id: String,
    /// 1-based order on the remote side.
    pub position: u32,
    /// Content hash at the last successful sync.
    pub hash: String,
    /// Remote variant identifiers the image is attached to.
    #[serde(default)]
    pub variant_ids: Vec<String>,
}

/// A catalog object as surfaced to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub class: String,
    pub published: bool,
    pub modified: DateTime<Utc>,
    /// Wire-agnostic field data; the exporter forwards it as-is.
    #[serde(default)]
    pub fields: serde_json::Value,
    #[serde(default)]
    pub images: Vec<SourceImage>,
}

impl ObjectRecord {
    pub fn new(id: ObjectId, class: impl Into<String>) -> Self {
        Self {
            id,
            class: class.into(),
            published: true,
            modified: Utc::now(),
            fields: serde_json::Value::Null,
            images: Vec::new(),
        }
    }

    pub fn unpublished(mut self) -> Self {
        self.published = false;
        self
    }

    pub fn with_fields(mut self, fields: serde_json::Value) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_images(mut self, images: Vec<SourceImage>) -> Self {
        self.images = images;
        self
    }

    /// Stable external identifier used to key remote upserts. Uses the `sku`
    /// field when the object carries one, the numeric id otherwise.
    pub fn external_key(&self) -> String {
        self.fields
            .get("sku")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// SHA-256 content hash as a hex string.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
