use super::*;

fn entry(o: i64, s: u64) -> BrickEntry {
    BrickEntry::new(Id::generate(), vec![o], vec![s])
}

#[test]
fn test_insert_and_len() {
    let mut idx = BrickIndex::new();
    assert!(idx.is_empty());
    idx.insert(entry(0, 6));
    idx.insert(entry(6, 6));
    assert_eq!(idx.len(), 2);
}

#[test]
fn test_padded_to_rank2() {
    let e = entry(0, 6);
    assert_eq!(e.bounds.rank(), 2);
    assert_eq!(e.bounds.lo, vec![0, 0]);
    assert_eq!(e.bounds.hi, vec![5, 0]);
}

#[test]
fn test_intersect() {
    let mut idx = BrickIndex::new();
    idx.insert(entry(0, 6));
    idx.insert(entry(6, 6));
    idx.insert(entry(12, 6));

    let query = Bounds::new(vec![4, 0], vec![8, 0]);
    let hits = idx.intersect(&query);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].origin, vec![0]);
    assert_eq!(hits[1].origin, vec![6]);
}

#[test]
fn test_domain_bounds() {
    let mut idx = BrickIndex::new();
    idx.insert(entry(0, 6));
    idx.insert(entry(6, 6));
    let bounds = idx.domain_bounds().unwrap();
    assert_eq!(bounds.lo, vec![0, 0]);
    assert_eq!(bounds.hi, vec![11, 0]);
}

#[test]
fn test_domain_bounds_empty() {
    let idx = BrickIndex::new();
    assert!(idx.domain_bounds().is_none());
}

#[test]
fn test_sort_ascending() {
    let mut idx = BrickIndex::new();
    idx.insert(entry(12, 6));
    idx.insert(entry(0, 6));
    idx.insert(entry(6, 6));

    let all: Vec<&BrickEntry> = idx.all().iter().collect();
    let sorted = BrickIndex::sort_ascending(all);
    let origins: Vec<i64> = sorted.iter().map(|e| e.origin[0]).collect();
    assert_eq!(origins, vec![0, 6, 12]);
}
