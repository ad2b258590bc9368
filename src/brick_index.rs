//! The brick index (C1): tracks which brick files exist for a
//! parameter and where each sits in index space.
//!
//! The source system keeps a spatial index over brick bounds. No
//! spatial-index crate turned up anywhere in the retrieval corpus, so
//! this is a flat `Vec<BrickEntry>` scanned linearly on every lookup.
//! Brick counts per parameter are small (the brick-sizing policy keeps
//! exactly one brick per non-temporal axis, so the index only ever
//! grows along the temporal axis), so a linear scan is the right
//! amount of machinery rather than an R-tree's.

use serde::{Deserialize, Serialize};

use crate::domain::Bounds;
use crate::ident::Id;

/// One brick's placement in index space, padded to at least rank 2
/// per the index's rank invariant (a rank-1 parameter's brick still
/// carries a dummy trailing `(0, 0)` dimension).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrickEntry {
    pub id: Id,
    pub origin: Vec<i64>,
    pub size: Vec<u64>,
    pub bounds: Bounds,
}

impl BrickEntry {
    pub fn new(id: Id, origin: Vec<i64>, size: Vec<u64>) -> BrickEntry {
        let bounds = Bounds::from_origin_size(&origin, &size).padded_to_rank2();
        BrickEntry { id, origin, size, bounds }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrickIndex {
    entries: Vec<BrickEntry>,
}

impl BrickIndex {
    pub fn new() -> BrickIndex {
        BrickIndex { entries: Vec::new() }
    }

    pub fn insert(&mut self, entry: BrickEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn all(&self) -> &[BrickEntry] {
        &self.entries
    }

    pub fn get(&self, id: Id) -> Option<&BrickEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// All bricks whose bounds intersect `query`, in insertion order.
    /// Per the brick-write ordering invariant, callers that need
    /// ascending-origin visitation sort the result themselves
    /// (`sort_ascending`) rather than relying on insertion order.
    pub fn intersect(&self, query: &Bounds) -> Vec<&BrickEntry> {
        let query = query.padded_to_rank2();
        self.entries
            .iter()
            .filter(|e| e.bounds.intersects(&query))
            .collect()
    }

    /// The union of every brick's bounds, or `None` for an empty index.
    pub fn domain_bounds(&self) -> Option<Bounds> {
        let mut iter = self.entries.iter();
        let first = iter.next()?.bounds.clone();
        Some(iter.fold(first, |acc, e| acc.union(&e.bounds)))
    }

    /// Brick entries sorted by ascending origin (lexicographic over
    /// axes), the order in which writes to overlapping bricks must be
    /// applied to preserve the single-writer-per-key ordering the
    /// dispatcher otherwise can't guarantee across bricks.
    pub fn sort_ascending<'a>(mut entries: Vec<&'a BrickEntry>) -> Vec<&'a BrickEntry> {
        entries.sort_by(|a, b| a.origin.cmp(&b.origin));
        entries
    }
}

#[cfg(test)]
#[path = "brick_index_test.rs"]
mod brick_index_test;
