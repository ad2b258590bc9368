use super::*;
use crate::domain::AxisSelection;

#[test]
fn test_same_selection_same_key() {
    let sel = Selection::new(vec![AxisSelection::range(0, 6)]);
    let a = WorkKey::new("temperature", &sel);
    let b = WorkKey::new("temperature", &sel);
    assert_eq!(a, b);
}

#[test]
fn test_different_parameter_different_key() {
    let sel = Selection::new(vec![AxisSelection::range(0, 6)]);
    let a = WorkKey::new("temperature", &sel);
    let b = WorkKey::new("salinity", &sel);
    assert_ne!(a, b);
}

#[test]
fn test_packed_work_stable_for_identical_item() {
    let sel = Selection::new(vec![AxisSelection::range(0, 3)]);
    let data = Array::F64 { shape: vec![3], data: vec![1.0, 2.0, 3.0] };
    let item_a = WorkItem::new("p", sel.clone(), data.clone());
    let item_b = WorkItem::new("p", sel, data);
    assert_eq!(item_a.packed().unwrap(), item_b.packed().unwrap());
}

#[test]
fn test_metrics_reflect_cell_count() {
    let sel = Selection::new(vec![AxisSelection::range(0, 4)]);
    let data = Array::F64 { shape: vec![4], data: vec![0.0; 4] };
    let item = WorkItem::new("p", sel, data);
    assert_eq!(item.metrics().cells, 4);
    assert_eq!(item.metrics().attempt, 0);
}
