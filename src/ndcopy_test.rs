use super::*;
use crate::slice::BufferAxisRange;

#[test]
fn test_gather_sub_block() {
    // 4x3 row-major: rows 0..4, cols 0..3
    let src = Array::I64 { shape: vec![4, 3], data: (0..12).collect() };
    let ranges = [
        BufferAxisRange { start: 1, count: 2 },
        BufferAxisRange { start: 1, count: 2 },
    ];
    let got = gather_from(&src, &[4, 3], &ranges);
    assert_eq!(got, Array::I64 { shape: vec![2, 2], data: vec![4, 5, 7, 8] });
}

#[test]
fn test_scatter_sub_block() {
    let mut dst = Array::I64 { shape: vec![4, 3], data: vec![0; 12] };
    let src = Array::I64 { shape: vec![2, 2], data: vec![99, 98, 97, 96] };
    let ranges = [
        BufferAxisRange { start: 1, count: 2 },
        BufferAxisRange { start: 1, count: 2 },
    ];
    scatter_into(&mut dst, &[4, 3], &ranges, &src);
    match dst {
        Array::I64 { data, .. } => {
            assert_eq!(data, vec![0, 0, 0, 0, 99, 98, 0, 97, 96, 0, 0, 0]);
        }
        _ => panic!("wrong variant"),
    }
}

#[test]
fn test_roundtrip_full_block() {
    let src = Array::F64 { shape: vec![3], data: vec![1.0, 2.0, 3.0] };
    let ranges = [BufferAxisRange { start: 0, count: 3 }];
    let mut dst = Array::F64 { shape: vec![3], data: vec![0.0; 3] };
    scatter_into(&mut dst, &[3], &ranges, &src);
    assert_eq!(dst, src);
    let back = gather_from(&dst, &[3], &ranges);
    assert_eq!(back, src);
}
