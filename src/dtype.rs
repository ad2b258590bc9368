//! Dynamic element types and the typed array/scalar variant union.
//!
//! The source system carries runtime-typed numerical dtypes (numpy
//! dtypes). Per the design notes, we tag every value by a closed
//! `ElementType` enum and route every operation through the tag,
//! rather than reaching for a single uniform n-d array type. Variable-
//! length byte strings (an "object dtype" in the source) get their own
//! `Array::Bytes` variant instead of being shoehorned into a numeric
//! buffer.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    I32,
    I64,
    F32,
    F64,
    /// Fixed-length byte string, width in bytes.
    FixedBytes(usize),
    /// Variable-length byte string ("object dtype" in the source system).
    VarBytes,
}

impl ElementType {
    /// Byte width of one element, when fixed; `None` for `VarBytes`
    /// (whose on-disk representation is a length-prefixed blob).
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ElementType::I32 => Some(4),
            ElementType::I64 => Some(8),
            ElementType::F32 => Some(4),
            ElementType::F64 => Some(8),
            ElementType::FixedBytes(n) => Some(*n),
            ElementType::VarBytes => None,
        }
    }
}

/// A scalar value of a given element type, used for fill values and
/// as the unit of parameter-function evaluation arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
}

/// A dense n-d array, one variant per `ElementType`, stored flattened
/// in row-major order alongside its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Array {
    I32 { shape: Vec<usize>, data: Vec<i32> },
    I64 { shape: Vec<usize>, data: Vec<i64> },
    F32 { shape: Vec<usize>, data: Vec<f32> },
    F64 { shape: Vec<usize>, data: Vec<f64> },
    /// Object-dtype array: one owned byte buffer per cell, rather than
    /// a uniform numeric buffer.
    Bytes { shape: Vec<usize>, data: Vec<Vec<u8>> },
}

impl Array {
    pub fn shape(&self) -> &[usize] {
        match self {
            Array::I32 { shape, .. } => shape,
            Array::I64 { shape, .. } => shape,
            Array::F32 { shape, .. } => shape,
            Array::F64 { shape, .. } => shape,
            Array::Bytes { shape, .. } => shape,
        }
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Array::I32 { .. } => ElementType::I32,
            Array::I64 { .. } => ElementType::I64,
            Array::F32 { .. } => ElementType::F32,
            Array::F64 { .. } => ElementType::F64,
            Array::Bytes { .. } => ElementType::VarBytes,
        }
    }

    /// Allocate an array of `shape`, every cell set to `fill`.
    pub fn filled(shape: Vec<usize>, fill: &Scalar) -> Result<Array> {
        let n: usize = shape.iter().product();
        let array = match fill {
            Scalar::I32(v) => Array::I32 { shape, data: vec![*v; n] },
            Scalar::I64(v) => Array::I64 { shape, data: vec![*v; n] },
            Scalar::F32(v) => Array::F32 { shape, data: vec![*v; n] },
            Scalar::F64(v) => Array::F64 { shape, data: vec![*v; n] },
            Scalar::Bytes(v) => Array::Bytes { shape, data: vec![v.clone(); n] },
        };
        Ok(array)
    }

    pub fn as_f64(&self) -> Option<Vec<f64>> {
        match self {
            Array::I32 { data, .. } => Some(data.iter().map(|v| *v as f64).collect()),
            Array::I64 { data, .. } => Some(data.iter().map(|v| *v as f64).collect()),
            Array::F32 { data, .. } => Some(data.iter().map(|v| *v as f64).collect()),
            Array::F64 { data, .. } => Some(data.clone()),
            Array::Bytes { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "dtype_test.rs"]
mod dtype_test;
