use super::*;
use crate::brick_index::BrickEntry;
use crate::ident::Id;

#[test]
fn test_empty_manifest_for_fresh_root() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = Manifest::open(dir.path()).unwrap();
    assert!(manifest.parameters.is_empty());
}

#[test]
fn test_save_and_reload_roundtrip() {
    let dir = tempfile::tempdir().unwrap();

    let mut bricks = BrickIndex::new();
    bricks.insert(BrickEntry::new(Id::generate(), vec![0], vec![6]));

    let mut manifest = Manifest::default();
    manifest.parameters.insert(
        "temperature".to_string(),
        ParameterMeta {
            name: "temperature".to_string(),
            extent: vec![12],
            dtype: ElementType::F64,
            fill: Scalar::F64(-9999.0),
            temporal_brick_extent: 6,
            bricks,
        },
    );
    manifest.save(dir.path()).unwrap();

    let reloaded = Manifest::open(dir.path()).unwrap();
    let param = reloaded.parameters.get("temperature").unwrap();
    assert_eq!(param.extent, vec![12]);
    assert_eq!(param.bricks.len(), 1);
}
