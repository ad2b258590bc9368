use super::*;
use crate::slice::BrickAxisSelection;

fn range(stop: usize) -> BrickAxisSelection {
    BrickAxisSelection::Range { start: 0, stop, step: 1 }
}

#[test]
fn test_require_dataset_and_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brick.bin");

    let mut backend = FlatFileBackend::open(&path).unwrap();
    backend.require_dataset("temperature", &[4, 3], ElementType::F64, &Scalar::F64(0.0)).unwrap();

    let data = Array::F64 { shape: vec![4, 3], data: (0..12).map(|v| v as f64).collect() };
    backend.write("temperature", &[range(4), range(3)], &data).unwrap();

    let got = backend.read("temperature", &[range(4), range(3)]).unwrap();
    assert_eq!(got, data);
}

#[test]
fn test_reopen_preserves_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brick.bin");

    {
        let mut backend = FlatFileBackend::open(&path).unwrap();
        backend.require_dataset("salinity", &[2, 2], ElementType::I32, &Scalar::I32(0)).unwrap();
        let data = Array::I32 { shape: vec![2, 2], data: vec![1, 2, 3, 4] };
        backend.write("salinity", &[range(2), range(2)], &data).unwrap();
    }

    let mut reopened = FlatFileBackend::open(&path).unwrap();
    assert_eq!(reopened.dataset_shape("salinity"), Some(vec![2, 2]));
    let got = reopened.read("salinity", &[range(2), range(2)]).unwrap();
    assert_eq!(got, Array::I32 { shape: vec![2, 2], data: vec![1, 2, 3, 4] });
}

#[test]
fn test_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brick.bin");

    let mut backend = FlatFileBackend::open(&path).unwrap();
    backend.require_dataset("p", &[4], ElementType::F64, &Scalar::F64(0.0)).unwrap();
    let err = backend.require_dataset("p", &[4], ElementType::I32, &Scalar::I32(0));
    assert!(err.is_err());
}

#[test]
fn test_two_datasets_coexist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brick.bin");

    let mut backend = FlatFileBackend::open(&path).unwrap();
    backend.require_dataset("a", &[3], ElementType::I64, &Scalar::I64(0)).unwrap();
    backend.require_dataset("b", &[2], ElementType::F32, &Scalar::F32(0.0)).unwrap();

    backend
        .write("a", &[range(3)], &Array::I64 { shape: vec![3], data: vec![10, 20, 30] })
        .unwrap();
    backend
        .write("b", &[range(2)], &Array::F32 { shape: vec![2], data: vec![1.5, 2.5] })
        .unwrap();

    assert_eq!(
        backend.read("a", &[range(3)]).unwrap(),
        Array::I64 { shape: vec![3], data: vec![10, 20, 30] }
    );
    assert_eq!(
        backend.read("b", &[range(2)]).unwrap(),
        Array::F32 { shape: vec![2], data: vec![1.5, 2.5] }
    );
}

#[test]
fn test_varbytes_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brick.bin");

    let mut backend = FlatFileBackend::open(&path).unwrap();
    backend.require_dataset("tags", &[2], ElementType::VarBytes, &Scalar::Bytes(Vec::new())).unwrap();

    let data = Array::Bytes { shape: vec![2], data: vec![b"ok".to_vec(), b"longer-value".to_vec()] };
    backend.write("tags", &[range(2)], &data).unwrap();

    let got = backend.read("tags", &[range(2)]).unwrap();
    assert_eq!(got, data);
}

#[test]
fn test_new_dataset_reads_back_as_fill_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brick.bin");

    let mut backend = FlatFileBackend::open(&path).unwrap();
    backend.require_dataset("p", &[2, 2], ElementType::F64, &Scalar::F64(-9999.0)).unwrap();

    let got = backend.read("p", &[range(2), range(2)]).unwrap();
    match got {
        Array::F64 { data, .. } => assert!(data.iter().all(|v| *v == -9999.0)),
        _ => panic!("wrong variant"),
    }
}

#[test]
fn test_new_varbytes_dataset_reads_back_as_fill_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brick.bin");

    let mut backend = FlatFileBackend::open(&path).unwrap();
    backend.require_dataset("tags", &[3], ElementType::VarBytes, &Scalar::Bytes(b"n/a".to_vec())).unwrap();

    let got = backend.read("tags", &[range(3)]).unwrap();
    match got {
        Array::Bytes { data, .. } => assert!(data.iter().all(|v| v == b"n/a")),
        _ => panic!("wrong variant"),
    }
}

#[test]
fn test_missing_dataset_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brick.bin");
    let mut backend = FlatFileBackend::open(&path).unwrap();
    assert!(backend.read("nope", &[range(1)]).is_err());
}
