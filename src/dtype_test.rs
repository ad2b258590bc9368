use super::*;

#[test]
fn test_filled() {
    let arr = Array::filled(vec![2, 3], &Scalar::F64(-9999.0)).unwrap();
    assert_eq!(arr.shape(), &[2, 3]);
    assert_eq!(arr.len(), 6);
    match &arr {
        Array::F64 { data, .. } => assert!(data.iter().all(|v| *v == -9999.0)),
        _ => panic!("wrong variant"),
    }
}

#[test]
fn test_element_type_widths() {
    assert_eq!(ElementType::I32.fixed_width(), Some(4));
    assert_eq!(ElementType::F64.fixed_width(), Some(8));
    assert_eq!(ElementType::FixedBytes(12).fixed_width(), Some(12));
    assert_eq!(ElementType::VarBytes.fixed_width(), None);
}

#[test]
fn test_as_f64() {
    let arr = Array::I64 { shape: vec![3], data: vec![1, 2, 3] };
    assert_eq!(arr.as_f64(), Some(vec![1.0, 2.0, 3.0]));
    let bytes = Array::Bytes { shape: vec![1], data: vec![vec![1, 2]] };
    assert_eq!(bytes.as_f64(), None);
}
