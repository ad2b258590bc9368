//! Generic n-d sub-block copies between dynamically-typed [`Array`]
//! buffers, used by [`crate::persisted_storage`] to gather a brick's
//! contribution into a caller's result buffer and to scatter a
//! caller's input buffer down into each brick's local sub-range.

use crate::domain::row_major_strides;
use crate::dtype::Array;
use crate::slice::BufferAxisRange;

fn cartesian_ranges(ranges: &[BufferAxisRange]) -> Vec<Vec<usize>> {
    let mut out = vec![vec![]];
    for r in ranges {
        let mut next = Vec::with_capacity(out.len() * r.count.max(1));
        for prefix in &out {
            for v in r.start..r.end() {
                let mut row = prefix.clone();
                row.push(v);
                next.push(row);
            }
        }
        out = next;
    }
    out
}

fn local_cartesian(shape: &[usize]) -> Vec<Vec<usize>> {
    let ranges: Vec<BufferAxisRange> = shape.iter().map(|n| BufferAxisRange { start: 0, count: *n }).collect();
    cartesian_ranges(&ranges)
}

/// Copy `src` (shaped exactly `src.shape()`) into the sub-block of
/// `dst` described by `ranges` (one `BufferAxisRange` per axis of
/// `dst_shape`).
pub fn scatter_into(dst: &mut Array, dst_shape: &[usize], ranges: &[BufferAxisRange], src: &Array) {
    let dst_strides = row_major_strides(dst_shape);
    let dst_positions = cartesian_ranges(ranges);
    let src_positions = local_cartesian(src.shape());
    debug_assert_eq!(dst_positions.len(), src_positions.len());

    macro_rules! copy_typed {
        ($dst_data:expr, $src_data:expr) => {{
            for (i, dpos) in dst_positions.iter().enumerate() {
                let doff: usize = dpos.iter().zip(dst_strides.iter()).map(|(p, s)| p * s).sum();
                $dst_data[doff] = $src_data[i].clone();
            }
        }};
    }

    match (dst, src) {
        (Array::I32 { data: d, .. }, Array::I32 { data: s, .. }) => copy_typed!(d, s),
        (Array::I64 { data: d, .. }, Array::I64 { data: s, .. }) => copy_typed!(d, s),
        (Array::F32 { data: d, .. }, Array::F32 { data: s, .. }) => copy_typed!(d, s),
        (Array::F64 { data: d, .. }, Array::F64 { data: s, .. }) => copy_typed!(d, s),
        (Array::Bytes { data: d, .. }, Array::Bytes { data: s, .. }) => copy_typed!(d, s),
        _ => panic!("scatter_into: mismatched array element types"),
    }
}

/// Extract the sub-block of `src` (shaped `src_shape`) described by
/// `ranges` into a freshly-allocated, densely-packed `Array`.
pub fn gather_from(src: &Array, src_shape: &[usize], ranges: &[BufferAxisRange]) -> Array {
    let src_strides = row_major_strides(src_shape);
    let out_shape: Vec<usize> = ranges.iter().map(|r| r.count).collect();
    let positions = cartesian_ranges(ranges);

    macro_rules! gather_typed {
        ($variant:ident, $src_data:expr) => {{
            let mut data = Vec::with_capacity(positions.len());
            for pos in &positions {
                let off: usize = pos.iter().zip(src_strides.iter()).map(|(p, s)| p * s).sum();
                data.push($src_data[off].clone());
            }
            Array::$variant { shape: out_shape, data }
        }};
    }

    match src {
        Array::I32 { data, .. } => gather_typed!(I32, data),
        Array::I64 { data, .. } => gather_typed!(I64, data),
        Array::F32 { data, .. } => gather_typed!(F32, data),
        Array::F64 { data, .. } => gather_typed!(F64, data),
        Array::Bytes { data, .. } => gather_typed!(Bytes, data),
    }
}

#[cfg(test)]
#[path = "ndcopy_test.rs"]
mod ndcopy_test;
