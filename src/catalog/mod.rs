//! Catalog data model and the source-of-truth store interface.

pub mod memory;
pub mod store;
pub mod types;

pub use memory::{CatalogSnapshot, MemoryStore, SnapshotObject};
pub use store::CatalogStore;
pub use types::{
    content_hash, CachedImage, ExportRecord, ObjectId, ObjectRecord, SourceImage, SyncCandidate,
    TargetServer,
};
