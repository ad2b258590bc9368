use super::*;

fn policy() -> BrickSizingPolicy {
    BrickSizingPolicy { temporal_extent: 6, chunk_divisor: 3 }
}

#[test]
fn test_init_parameter_allocates_bricks() {
    let dir = tempfile::tempdir().unwrap();
    let mut layer = PersistenceLayer::open(dir.path()).unwrap();
    layer
        .init_parameter("temperature", vec![12, 4], ElementType::F64, Scalar::F64(-9999.0), &policy())
        .unwrap();

    let bricks = layer.list_bricks("temperature").unwrap();
    assert_eq!(bricks.len(), 2); // 12 / 6 = 2 temporal bricks, 1 spatial brick each
    let mut origins: Vec<i64> = bricks.iter().map(|b| b.origin[0]).collect();
    origins.sort();
    assert_eq!(origins, vec![0, 6]);
}

#[test]
fn test_init_parameter_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut layer = PersistenceLayer::open(dir.path()).unwrap();
    layer
        .init_parameter("p", vec![6], ElementType::F64, Scalar::F64(0.0), &policy())
        .unwrap();
    layer
        .init_parameter("p", vec![6], ElementType::F64, Scalar::F64(0.0), &policy())
        .unwrap();
    assert_eq!(layer.list_bricks("p").unwrap().len(), 1);
}

#[test]
fn test_expand_domain_adds_new_bricks() {
    let dir = tempfile::tempdir().unwrap();
    let mut layer = PersistenceLayer::open(dir.path()).unwrap();
    layer
        .init_parameter("p", vec![6], ElementType::F64, Scalar::F64(0.0), &policy())
        .unwrap();
    assert_eq!(layer.list_bricks("p").unwrap().len(), 1);

    layer.expand_domain("p", vec![18]).unwrap();
    let bricks = layer.list_bricks("p").unwrap();
    assert_eq!(bricks.len(), 3);
}

#[test]
fn test_expand_domain_rejects_shrink() {
    let dir = tempfile::tempdir().unwrap();
    let mut layer = PersistenceLayer::open(dir.path()).unwrap();
    layer
        .init_parameter("p", vec![12], ElementType::F64, Scalar::F64(0.0), &policy())
        .unwrap();
    assert!(matches!(layer.expand_domain("p", vec![6]), Err(crate::error::Error::DomainShrink(..))));
}

#[test]
fn test_expand_domain_rejects_non_temporal_axis_change() {
    // Per §4.5: "the new total extent must equal the previous extent on
    // all non-temporal axes". Growing axis 0 is fine; touching axis 1
    // at all, even by growing it, must fail as NonTemporalChange rather
    // than silently reallocating a second spatial brick.
    let dir = tempfile::tempdir().unwrap();
    let mut layer = PersistenceLayer::open(dir.path()).unwrap();
    layer
        .init_parameter("temperature", vec![12, 4], ElementType::F64, Scalar::F64(0.0), &policy())
        .unwrap();

    assert!(matches!(
        layer.expand_domain("temperature", vec![18, 5]),
        Err(crate::error::Error::NonTemporalChange(..))
    ));

    // The parameter's extent and bricks must be untouched by the
    // rejected call.
    assert_eq!(layer.parameter("temperature").unwrap().extent, vec![12, 4]);
    assert_eq!(layer.list_bricks("temperature").unwrap().len(), 2);
}

#[test]
fn test_temporal_brick_size_stays_constant_across_expansion() {
    // Regression: brick_size_for used to cap the temporal nominal brick
    // size to the parameter's *current* total extent, so a parameter
    // created with a temporal extent smaller than the configured brick
    // extent got an undersized first brick. Expanding past that brick's
    // nominal size then opened a gap no brick covered.
    let dir = tempfile::tempdir().unwrap();
    let mut layer = PersistenceLayer::open(dir.path()).unwrap();
    layer
        .init_parameter("p", vec![4], ElementType::F64, Scalar::F64(-1.0), &policy())
        .unwrap();

    let bricks = layer.list_bricks("p").unwrap();
    assert_eq!(bricks.len(), 1);
    assert_eq!(bricks[0].size[0], 6); // nominal size is the brick extent, not the extent-4 total

    layer.expand_domain("p", vec![10]).unwrap();
    let bricks = layer.list_bricks("p").unwrap();
    let mut origins: Vec<i64> = bricks.iter().map(|b| b.origin[0]).collect();
    origins.sort();
    assert_eq!(origins, vec![0, 6]); // no gap between the two bricks' nominal ranges
}

#[test]
fn test_manifest_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut layer = PersistenceLayer::open(dir.path()).unwrap();
        layer
            .init_parameter("p", vec![6], ElementType::F64, Scalar::F64(0.0), &policy())
            .unwrap();
    }
    let layer = PersistenceLayer::open(dir.path()).unwrap();
    assert_eq!(layer.list_bricks("p").unwrap().len(), 1);
}
