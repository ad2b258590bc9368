use super::*;

#[test]
fn test_count_in_range() {
    assert_eq!(count_in_range(0, 10, 1), 10);
    assert_eq!(count_in_range(0, 10, 2), 5);
    assert_eq!(count_in_range(4, 8, 1), 4);
    assert_eq!(count_in_range(5, 5, 1), 0);
    assert_eq!(count_in_range(8, 5, 1), 0);
}

#[test]
fn test_selection_shape() {
    let sel = Selection::new(vec![
        AxisSelection::range(0, 10),
        AxisSelection::index(3),
        AxisSelection::list(vec![1, 2, 5]),
    ]);
    let total = Extent::new(vec![10, 20, 30]);
    assert_eq!(sel.shape(&total), vec![10, 1, 3]);
}

#[test]
fn test_broadcast_to() {
    let sel = Selection::new(vec![AxisSelection::range(0, 10)]);
    let broadcast = sel.broadcast_to(3).unwrap();
    assert_eq!(broadcast.rank(), 3);
    assert_eq!(broadcast.0[1], AxisSelection::full());
    assert_eq!(broadcast.0[2], AxisSelection::full());

    let too_long = Selection::new(vec![
        AxisSelection::range(0, 10),
        AxisSelection::range(0, 10),
    ]);
    assert!(too_long.broadcast_to(1).is_none());
}

#[test]
fn test_bounds_intersects() {
    let a = Bounds::new(vec![0, 0], vec![5, 5]);
    let b = Bounds::new(vec![4, 4], vec![10, 10]);
    let c = Bounds::new(vec![6, 6], vec![10, 10]);
    assert!(a.intersects(&b));
    assert!(!a.intersects(&c));
}

#[test]
fn test_bounds_from_origin_size() {
    let b = Bounds::from_origin_size(&[6, 0], &[6, 4]);
    assert_eq!(b.lo, vec![6, 0]);
    assert_eq!(b.hi, vec![11, 3]);
}

#[test]
fn test_padded_to_rank2() {
    let b = Bounds::new(vec![6], vec![11]);
    let p = b.padded_to_rank2();
    assert_eq!(p.lo, vec![6, 0]);
    assert_eq!(p.hi, vec![11, 0]);

    let b2 = Bounds::new(vec![0, 0], vec![1, 1]);
    assert_eq!(b2.padded_to_rank2(), b2);
}
