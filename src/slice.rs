//! The slice calculator (C3): maps a selection axis plus a brick's
//! local bounds onto brick-local coordinates and the matching range
//! of the caller's buffer.
//!
//! Per axis we resolve the buffer-side offset analytically from the
//! selection and the brick bounds, rather than threading a single
//! mutable "cursor" counter through every brick visited for the whole
//! operation. The distilled spec describes the cursor as advancing by
//! a count per brick; that is exactly what the analytic form below
//! computes, but it also remains correct if a future brick-sizing
//! policy ever tiles a non-temporal axis into more than one brick,
//! where a naively-shared running counter would double-count (the
//! current policy, §4.5, never does — every non-temporal axis is
//! exactly one brick wide — but deriving the offset directly removes
//! the ordering assumption instead of relying on it).

use crate::domain::{count_in_range, AxisSelection};
use crate::error::Result;

/// A selection axis expressed in a brick's local coordinate space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrickAxisSelection {
    Index(usize),
    List(Vec<usize>),
    Range { start: usize, stop: usize, step: usize },
}

impl BrickAxisSelection {
    pub fn count(&self) -> usize {
        match self {
            BrickAxisSelection::Index(_) => 1,
            BrickAxisSelection::List(l) => l.len(),
            BrickAxisSelection::Range { start, stop, step } => {
                count_in_range(*start as i64, *stop as i64, *step as i64)
            }
        }
    }
}

/// The matching contiguous range of the caller's buffer along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferAxisRange {
    pub start: usize,
    pub count: usize,
}

impl BufferAxisRange {
    pub fn end(&self) -> usize {
        self.start + self.count
    }
}

/// Resolve one selection axis against one brick's local bounds.
///
/// `bo` is the brick origin along this axis, `bs` its nominal size.
pub fn compute_axis(
    axis: &AxisSelection,
    bo: i64,
    bs: u64,
) -> Result<(BrickAxisSelection, BufferAxisRange)> {
    let bn = bo + bs as i64;

    match axis {
        AxisSelection::Index(s) => {
            if *s >= bo && *s < bn {
                let local = (*s - bo) as usize;
                // buffer offset: this axis selects exactly one global
                // index, so the buffer range is always [0, 1).
                Ok((
                    BrickAxisSelection::Index(local),
                    BufferAxisRange { start: 0, count: 1 },
                ))
            } else {
                err_at!(OutOfBrick, msg: "index {} outside brick [{}, {})", s, bo, bn)
            }
        }

        AxisSelection::List(l) => {
            let local: Vec<usize> = l
                .iter()
                .filter(|x| **x >= bo && **x < bn)
                .map(|x| (*x - bo) as usize)
                .collect();
            if local.is_empty() {
                return err_at!(NoOverlap, msg: "none of {:?} fall within brick [{}, {})", l, bo, bn);
            }
            // buffer offset: position of the first in-brick element
            // within the full (unfiltered) list, preserving the
            // caller's original ordering.
            let start = l.iter().position(|x| *x >= bo && *x < bn).unwrap();
            let count = local.len();
            Ok((
                BrickAxisSelection::List(local),
                BufferAxisRange { start, count },
            ))
        }

        AxisSelection::Range { start, stop, step } => {
            let step = *step;
            if step <= 0 {
                return err_at!(Fatal, msg: "range step must be positive, got {}", step);
            }
            let a = start.unwrap_or(0);
            let b = stop.unwrap_or(bn);

            if a > bn || b < bo {
                return err_at!(NoOverlap, msg: "range [{:?}, {:?}) does not overlap brick [{}, {})", start, stop, bo, bn);
            }

            let local_start = (a - bo).max(0) as usize;
            let local_stop = if b <= bn { (b - bo).max(0) as usize } else { bs as usize };
            let local_stop = local_stop.min(bs as usize);

            // buffer offset: number of steps of the *global* arithmetic
            // sequence `a, a+step, ...` strictly before the first term
            // landing inside this brick.
            let first_in_brick = if bo > a {
                a + step * (((bo - a) + step - 1) / step)
            } else {
                a
            };
            let buf_start = ((first_in_brick - a) / step) as usize;

            let count = count_in_range(local_start as i64, local_stop as i64, step);

            Ok((
                BrickAxisSelection::Range {
                    start: local_start,
                    stop: local_stop,
                    step: step as usize,
                },
                BufferAxisRange { start: buf_start, count },
            ))
        }
    }
}

/// Resolve a full rank-n selection against one brick's origin/size.
pub fn compute_selection(
    axes: &[AxisSelection],
    brick_origin: &[i64],
    brick_size: &[u64],
) -> Result<(Vec<BrickAxisSelection>, Vec<BufferAxisRange>)> {
    debug_assert_eq!(axes.len(), brick_origin.len());
    debug_assert_eq!(axes.len(), brick_size.len());

    let mut brick_sel = Vec::with_capacity(axes.len());
    let mut buf_sel = Vec::with_capacity(axes.len());

    for ((axis, bo), bs) in axes.iter().zip(brick_origin.iter()).zip(brick_size.iter()) {
        let (b, v) = compute_axis(axis, *bo, *bs)?;
        brick_sel.push(b);
        buf_sel.push(v);
    }

    Ok((brick_sel, buf_sel))
}

#[cfg(test)]
#[path = "slice_test.rs"]
mod slice_test;
