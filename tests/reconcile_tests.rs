// Tests for the image reconciliation algorithm

use outflow::catalog::{content_hash, CachedImage, SourceImage};
use outflow::sync::{reconcile, ImageOperation, ReconcilePolicy};

fn image(name: &str, hash: &str) -> SourceImage {
    SourceImage::new(name, format!("http://cdn.example/{name}"), hash)
}

fn cached(name: &str, id: &str, position: u32, hash: &str) -> CachedImage {
    CachedImage {
        name: name.to_string(),
        id: id.to_string(),
        position,
        hash: hash.to_string(),
        variant_ids: Vec::new(),
    }
}

fn cached_with_variants(
    name: &str,
    id: &str,
    position: u32,
    hash: &str,
    variant_ids: &[&str],
) -> CachedImage {
    CachedImage {
        variant_ids: variant_ids.iter().map(|s| s.to_string()).collect(),
        ..cached(name, id, position, hash)
    }
}

#[test]
fn test_deterministic_for_identical_inputs() {
    let images = vec![
        image("a.jpg", "ha"),
        image("b.jpg", "hb-changed"),
        image("c.jpg", "hc"),
    ];
    let cache = vec![
        cached("a.jpg", "i1", 1, "ha"),
        cached("b.jpg", "i2", 2, "hb"),
    ];
    let policy = ReconcilePolicy::default();

    let first = reconcile(&images, &cache, &policy);
    let second = reconcile(&images, &cache, &policy);

    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_unsynced_images_always_upload() {
    let images = vec![image("a.jpg", "ha"), image("b.jpg", "hb")];
    let ops = reconcile(&images, &[], &ReconcilePolicy::default());

    assert!(ops.iter().all(|op| op.is_upload()));
    // Common bookkeeping fields are present on every operation.
    assert_eq!(ops[0].local_position(), 0);
    assert_eq!(ops[1].local_position(), 1);
    assert_eq!(ops[0].hash(), "ha");
    assert_eq!(ops[1].name(), "b.jpg");
}

#[test]
fn test_matching_hash_never_uploads() {
    let images = vec![image("a.jpg", "ha")];
    let cache = vec![cached("a.jpg", "img-1", 1, "ha")];
    let ops = reconcile(&images, &cache, &ReconcilePolicy::default());

    match &ops[0] {
        ImageOperation::Reference { id, position, .. } => {
            assert_eq!(id, "img-1");
            assert_eq!(*position, None);
        }
        other => panic!("expected reference, got {other:?}"),
    }
}

#[test]
fn test_changed_hash_uploads_again() {
    let images = vec![image("a.jpg", "new-hash")];
    let cache = vec![cached("a.jpg", "img-1", 1, "old-hash")];
    let ops = reconcile(&images, &cache, &ReconcilePolicy::default());

    match &ops[0] {
        ImageOperation::Upload { src, .. } => {
            assert_eq!(src, "http://cdn.example/a.jpg");
        }
        other => panic!("expected upload, got {other:?}"),
    }
}

#[test]
fn test_position_omitted_when_unchanged_included_otherwise() {
    // Cached position 2, image at 0-based index 2 -> emitted position 3.
    let images = vec![image("a.jpg", "ha"), image("b.jpg", "hb"), image("c.jpg", "hc")];
    let cache = vec![
        cached("a.jpg", "i1", 1, "ha"),
        cached("b.jpg", "i2", 2, "hb"),
        cached("c.jpg", "i3", 2, "hc"),
    ];
    let ops = reconcile(&images, &cache, &ReconcilePolicy::default());

    let positions: Vec<Option<u32>> = ops
        .iter()
        .map(|op| match op {
            ImageOperation::Reference { position, .. } => *position,
            other => panic!("expected reference, got {other:?}"),
        })
        .collect();
    assert_eq!(positions, vec![None, None, Some(3)]);
}

#[test]
fn test_force_full_sync_references_every_cached_image() {
    let images = vec![
        image("a.jpg", "ha-changed"),
        image("b.jpg", "hb"),
        image("new.jpg", "hn"),
    ];
    let cache = vec![
        cached("a.jpg", "i1", 2, "ha"),
        cached("b.jpg", "i2", 2, "hb"),
    ];
    let policy = ReconcilePolicy {
        force_full_sync: true,
        owner_variant_id: Some("var-1".to_string()),
    };
    let ops = reconcile(&images, &cache, &policy);

    // Cached images are force-referenced regardless of hash, with position
    // only where the order changed. Never-uploaded images still upload.
    match &ops[0] {
        ImageOperation::ForcedReference { id, position, .. } => {
            assert_eq!(id, "i1");
            assert_eq!(*position, Some(1));
        }
        other => panic!("expected forced reference, got {other:?}"),
    }
    match &ops[1] {
        ImageOperation::ForcedReference { position, .. } => assert_eq!(*position, None),
        other => panic!("expected forced reference, got {other:?}"),
    }
    match &ops[2] {
        // Full-sync mode skips variant-association bookkeeping entirely.
        ImageOperation::Upload { variant_ids, .. } => assert!(variant_ids.is_empty()),
        other => panic!("expected upload, got {other:?}"),
    }
}

#[test]
fn test_cached_variant_ids_propagate_unchanged() {
    let images = vec![image("a.jpg", "ha")];
    let cache = vec![cached_with_variants("a.jpg", "i1", 1, "ha", &["v1", "v2"])];
    let policy = ReconcilePolicy {
        force_full_sync: false,
        owner_variant_id: Some("v-other".to_string()),
    };
    let ops = reconcile(&images, &cache, &policy);

    match &ops[0] {
        ImageOperation::Reference { variant_ids, .. } => {
            assert_eq!(variant_ids, &["v1".to_string(), "v2".to_string()]);
        }
        other => panic!("expected reference, got {other:?}"),
    }
}

#[test]
fn test_first_of_variant_seeds_association_only_without_cache() {
    let images = vec![
        image("lead.jpg", "h1").first_of_variant(),
        image("other.jpg", "h2"),
    ];
    let policy = ReconcilePolicy {
        force_full_sync: false,
        owner_variant_id: Some("var-9".to_string()),
    };
    let ops = reconcile(&images, &[], &policy);

    match (&ops[0], &ops[1]) {
        (
            ImageOperation::Upload { variant_ids: first, .. },
            ImageOperation::Upload { variant_ids: second, .. },
        ) => {
            assert_eq!(first, &["var-9".to_string()]);
            assert!(second.is_empty());
        }
        other => panic!("expected uploads, got {other:?}"),
    }

    // A cache entry with no variants wins over the seeding rule.
    let cache = vec![cached("lead.jpg", "i1", 1, "h1")];
    let ops = reconcile(&images, &cache, &policy);
    match &ops[0] {
        ImageOperation::Reference { variant_ids, .. } => assert!(variant_ids.is_empty()),
        other => panic!("expected reference, got {other:?}"),
    }
}

#[test]
fn test_byte_derived_hashes_drive_the_upload_decision() {
    let cache = vec![cached("a.jpg", "img-1", 1, &content_hash(b"v1"))];
    let policy = ReconcilePolicy::default();

    // Unchanged bytes hash to the cached value and only reference.
    let unchanged = SourceImage::from_bytes("a.jpg", "http://cdn.example/a.jpg", b"v1");
    let ops = reconcile(&[unchanged], &cache, &policy);
    assert!(!ops[0].is_upload());

    // Edited bytes change the hash and force a re-upload.
    let edited = SourceImage::from_bytes("a.jpg", "http://cdn.example/a.jpg", b"v2");
    let ops = reconcile(&[edited], &cache, &policy);
    assert!(ops[0].is_upload());
    assert_eq!(ops[0].hash(), content_hash(b"v2"));
}

#[test]
fn test_serialized_operations_are_tagged() {
    let images = vec![image("a.jpg", "ha"), image("b.jpg", "hb")];
    let cache = vec![cached("a.jpg", "i1", 1, "ha")];
    let ops = reconcile(&images, &cache, &ReconcilePolicy::default());

    let json = serde_json::to_value(&ops).unwrap();
    assert_eq!(json[0]["op"], "reference");
    assert_eq!(json[1]["op"], "upload");
    assert_eq!(json[1]["src"], "http://cdn.example/b.jpg");
    assert_eq!(json[0]["name"], "a.jpg");
    assert_eq!(json[1]["local_position"], 1);
}
