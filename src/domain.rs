//! Selections, extents and bounds over an n-dimensional integer index
//! space. This module has no notion of bricks or files — it is pure
//! index-space arithmetic shared by the brick index (C1) and the slice
//! calculator (C3).

use serde::{Deserialize, Serialize};

/// One axis of a rank-n selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisSelection {
    /// A single index along this axis.
    Index(i64),
    /// An explicit, possibly unordered, list of indices.
    List(Vec<i64>),
    /// A half-open `[start, stop)` range with a step, any bound optional.
    Range {
        start: Option<i64>,
        stop: Option<i64>,
        step: i64,
    },
}

impl AxisSelection {
    pub fn index(i: i64) -> AxisSelection {
        AxisSelection::Index(i)
    }

    pub fn list(l: Vec<i64>) -> AxisSelection {
        AxisSelection::List(l)
    }

    /// A `[start, stop)` range with unit step.
    pub fn range(start: i64, stop: i64) -> AxisSelection {
        AxisSelection::Range {
            start: Some(start),
            stop: Some(stop),
            step: 1,
        }
    }

    /// The unbounded, whole-axis range, used when broadcasting a
    /// shorter selection out to a parameter's full rank.
    pub fn full() -> AxisSelection {
        AxisSelection::Range {
            start: None,
            stop: None,
            step: 1,
        }
    }

    /// Number of indices this axis selects, given the axis's total
    /// extent (used to resolve open range bounds).
    pub fn count(&self, total_extent: u64) -> usize {
        match self {
            AxisSelection::Index(_) => 1,
            AxisSelection::List(l) => l.len(),
            AxisSelection::Range { start, stop, step } => {
                let lo = start.unwrap_or(0);
                let hi = stop.unwrap_or(total_extent as i64);
                count_in_range(lo, hi, *step)
            }
        }
    }
}

/// Row-major (last-axis-fastest) strides for a dense array of `shape`.
pub fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Number of values produced by a `[lo, hi)` stride of `step` (`step`
/// must be positive; negative-step ranges are not part of this
/// grammar).
pub fn count_in_range(lo: i64, hi: i64, step: i64) -> usize {
    if hi <= lo || step <= 0 {
        0
    } else {
        (((hi - lo) + step - 1) / step) as usize
    }
}

/// A rank-n selection: one `AxisSelection` per axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection(pub Vec<AxisSelection>);

impl Selection {
    pub fn new(axes: Vec<AxisSelection>) -> Selection {
        Selection(axes)
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Broadcast this selection out to `rank` axes by appending
    /// full-range slices, per §4.4: "after broadcasting a shorter
    /// selection with trailing full-range slices to match rank".
    pub fn broadcast_to(&self, rank: usize) -> Option<Selection> {
        if self.rank() > rank {
            return None;
        }
        let mut axes = self.0.clone();
        while axes.len() < rank {
            axes.push(AxisSelection::full());
        }
        Some(Selection(axes))
    }

    /// Shape of the result array this selection would produce, given
    /// the parameter's total extent per axis.
    pub fn shape(&self, total_extent: &Extent) -> Vec<usize> {
        self.0
            .iter()
            .zip(total_extent.0.iter())
            .map(|(axis, extent)| axis.count(*extent))
            .collect()
    }

    /// The inclusive bounding interval this selection spans, resolving
    /// open range ends against `total_extent`. Used to narrow down
    /// which bricks a selection could possibly touch before resolving
    /// it exactly, axis by axis, against each candidate brick.
    pub fn bounds(&self, total_extent: &Extent) -> Bounds {
        let mut lo = Vec::with_capacity(self.rank());
        let mut hi = Vec::with_capacity(self.rank());
        for (axis, extent) in self.0.iter().zip(total_extent.0.iter()) {
            let (l, h) = match axis {
                AxisSelection::Index(i) => (*i, *i),
                AxisSelection::List(items) => (
                    *items.iter().min().unwrap_or(&0),
                    *items.iter().max().unwrap_or(&0),
                ),
                AxisSelection::Range { start, stop, .. } => {
                    let s = start.unwrap_or(0);
                    let e = stop.unwrap_or(*extent as i64) - 1;
                    (s, e.max(s))
                }
            };
            lo.push(l);
            hi.push(h);
        }
        Bounds { lo, hi }
    }
}

/// Per-axis length of a domain or block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent(pub Vec<u64>);

impl Extent {
    pub fn new(dims: Vec<u64>) -> Extent {
        Extent(dims)
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn total_cells(&self) -> u64 {
        self.0.iter().product()
    }
}

/// Inclusive n-d bounding interval `[lo, hi]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub lo: Vec<i64>,
    pub hi: Vec<i64>,
}

impl Bounds {
    pub fn new(lo: Vec<i64>, hi: Vec<i64>) -> Bounds {
        Bounds { lo, hi }
    }

    pub fn rank(&self) -> usize {
        self.lo.len()
    }

    /// Bounds of a brick with the given origin and nominal size.
    pub fn from_origin_size(origin: &[i64], size: &[u64]) -> Bounds {
        let lo = origin.to_vec();
        let hi = origin
            .iter()
            .zip(size.iter())
            .map(|(o, s)| o + (*s as i64) - 1)
            .collect();
        Bounds { lo, hi }
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        debug_assert_eq!(self.rank(), other.rank());
        self.lo
            .iter()
            .zip(self.hi.iter())
            .zip(other.lo.iter().zip(other.hi.iter()))
            .all(|((a_lo, a_hi), (b_lo, b_hi))| a_lo <= b_hi && b_lo <= a_hi)
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let lo = self
            .lo
            .iter()
            .zip(other.lo.iter())
            .map(|(a, b)| *a.min(b))
            .collect();
        let hi = self
            .hi
            .iter()
            .zip(other.hi.iter())
            .map(|(a, b)| *a.max(b))
            .collect();
        Bounds { lo, hi }
    }

    /// Pad to rank 2 by appending a dummy `(0, 0)` dimension, per the
    /// brick index's rank invariant (§4.1).
    pub fn padded_to_rank2(&self) -> Bounds {
        if self.rank() >= 2 {
            return self.clone();
        }
        let mut lo = self.lo.clone();
        let mut hi = self.hi.clone();
        lo.push(0);
        hi.push(0);
        Bounds { lo, hi }
    }
}

#[cfg(test)]
#[path = "domain_test.rs"]
mod domain_test;
