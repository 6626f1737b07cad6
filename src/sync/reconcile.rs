//! Image reconciliation.
//!
//! Decides, per image attached to an object, whether to upload new bytes,
//! reference the already-uploaded remote asset, or merely reposition it.
//! Pure and deterministic: the same `(images, cache, policy)` triple always
//! yields the same operation sequence, which makes retry after a partial
//! remote failure safe.

use serde::Serialize;

use crate::catalog::{CachedImage, SourceImage};

/// Reconciliation policy for one export.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePolicy {
    /// Re-send reference data for every cached image unconditionally,
    /// skipping hash comparison and variant-association bookkeeping. Used
    /// when the server requires a full resync pass.
    pub force_full_sync: bool,
    /// Remote identifier of the owning variant, used to seed the variant
    /// association of a first-of-variant image that was never uploaded.
    pub owner_variant_id: Option<String>,
}

/// One action against a remote image slot.
///
/// Every variant carries `hash`, `name` and `local_position` (0-based) for
/// downstream bookkeeping; the remaining fields are mutually exclusive by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ImageOperation {
    /// New bytes must be sent: the image was never uploaded, or its content
    /// changed since the last sync.
    Upload {
        src: String,
        variant_ids: Vec<String>,
        hash: String,
        name: String,
        local_position: usize,
    },
    /// Reuse the existing remote asset. `position` is present only when the
    /// remote order differs from the current one, to avoid no-op updates.
    Reference {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<u32>,
        variant_ids: Vec<String>,
        hash: String,
        name: String,
        local_position: usize,
    },
    /// Reference taken unconditionally under forced full sync; never touches
    /// variant associations.
    ForcedReference {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<u32>,
        hash: String,
        name: String,
        local_position: usize,
    },
}

impl ImageOperation {
    pub fn name(&self) -> &str {
        match self {
            Self::Upload { name, .. } => name,
            Self::Reference { name, .. } => name,
            Self::ForcedReference { name, .. } => name,
        }
    }

    pub fn hash(&self) -> &str {
        match self {
            Self::Upload { hash, .. } => hash,
            Self::Reference { hash, .. } => hash,
            Self::ForcedReference { hash, .. } => hash,
        }
    }

    pub fn local_position(&self) -> usize {
        match self {
            Self::Upload { local_position, .. } => *local_position,
            Self::Reference { local_position, .. } => *local_position,
            Self::ForcedReference { local_position, .. } => *local_position,
        }
    }

    pub fn is_upload(&self) -> bool {
        matches!(self, Self::Upload { .. })
    }
}

/// Compute the operation sequence for the object's current image list
/// against the target's last-known cached state.
pub fn reconcile(
    images: &[SourceImage],
    cache: &[CachedImage],
    policy: &ReconcilePolicy,
) -> Vec<ImageOperation> {
    images
        .iter()
        .enumerate()
        .map(|(index, image)| reconcile_one(index, image, cache, policy))
        .collect()
}

fn reconcile_one(
    index: usize,
    image: &SourceImage,
    cache: &[CachedImage],
    policy: &ReconcilePolicy,
) -> ImageOperation {
    let cached = find_cached(&image.filename, cache);
    let remote_position = index as u32 + 1;

    if policy.force_full_sync {
        return match cached {
            Some(entry) => ImageOperation::ForcedReference {
                id: entry.id.clone(),
                position: (remote_position != entry.position).then_some(remote_position),
                hash: image.hash.clone(),
                name: image.filename.clone(),
                local_position: index,
            },
            // Never uploaded: reference is impossible even under full sync.
            None => ImageOperation::Upload {
                src: image.url.clone(),
                variant_ids: Vec::new(),
                hash: image.hash.clone(),
                name: image.filename.clone(),
                local_position: index,
            },
        };
    }

    let variant_ids = variant_associations(image, cached, policy);

    match cached {
        Some(entry) if entry.hash == image.hash => ImageOperation::Reference {
            id: entry.id.clone(),
            position: (remote_position != entry.position).then_some(remote_position),
            variant_ids,
            hash: image.hash.clone(),
            name: image.filename.clone(),
            local_position: index,
        },
        // Content changed or never uploaded.
        _ => ImageOperation::Upload {
            src: image.url.clone(),
            variant_ids,
            hash: image.hash.clone(),
            name: image.filename.clone(),
            local_position: index,
        },
    }
}

/// Match a local image to its cache entry by exact filename.
///
/// When upstream bookkeeping misbehaves and several cache entries share a
/// filename, the first match wins; the tie-break is not guaranteed correct.
fn find_cached<'a>(filename: &str, cache: &'a [CachedImage]) -> Option<&'a CachedImage> {
    cache.iter().find(|entry| entry.name == filename)
}

fn variant_associations(
    image: &SourceImage,
    cached: Option<&CachedImage>,
    policy: &ReconcilePolicy,
) -> Vec<String> {
    match cached {
        Some(entry) if !entry.variant_ids.is_empty() => entry.variant_ids.clone(),
        Some(_) => Vec::new(),
        None => match (&policy.owner_variant_id, image.first_of_variant) {
            (Some(variant_id), true) => vec![variant_id.clone()],
            _ => Vec::new(),
        },
    }
}
