use super::*;

#[test]
fn test_default_brick_sizing() {
    let policy = BrickSizingPolicy::default();
    assert_eq!(policy.resolve_temporal_extent(100), 6);
}

#[test]
fn test_derived_temporal_extent() {
    let policy = BrickSizingPolicy { temporal_extent: 0, chunk_divisor: 4 };
    assert_eq!(policy.resolve_temporal_extent(10), 3);
    assert_eq!(policy.resolve_temporal_extent(1), 1);
}

#[test]
fn test_load_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brickstore.toml");
    std::fs::write(
        &path,
        r#"
        [brick_sizing]
        temporal_extent = 10
        chunk_divisor = 3

        [dispatcher]
        workers = 4
        queue_capacity = 256
        max_retries = 5
        retry_backoff_ms = 50
        "#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.brick_sizing.temporal_extent, 10);
    assert_eq!(config.dispatcher.workers, 4);
}
