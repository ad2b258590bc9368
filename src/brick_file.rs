//! The brick file backend (C2): a self-describing container for one
//! brick's worth of dataset values.
//!
//! The source system stores bricks in a third-party hierarchical array
//! format. That library and its ecosystem crate never appear anywhere
//! in the retrieval corpus, and the on-disk byte layout is explicitly
//! out of scope, so `FlatFileBackend` is a minimal from-scratch
//! container instead: a 4-byte magic, a fixed-width data region per
//! dataset, and a trailing directory (`bincode`-encoded) naming each
//! dataset's element type, shape and data offset. The directory always
//! lives at the current end of the file; adding a dataset or appending
//! variable-length bytes writes new data just before the old directory
//! location, then rewrites the directory (and its fixed 16-byte
//! offset/length trailer) past it. Variable-length (`VarBytes`) cells
//! can't be addressed by stride arithmetic, so their directory entry
//! instead carries a per-cell `(offset, len)` table and every write
//! appends fresh bytes — the previous bytes become unreachable
//! garbage, acceptable since a brick file is written by one key's
//! worth of work at a time and is never compacted.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::dtype::{Array, ElementType, Scalar};
use crate::error::Result;
use crate::io_util;
use crate::slice::BrickAxisSelection;

const MAGIC: &[u8; 4] = b"BRK1";
const TRAILER_LEN: u64 = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatasetMeta {
    dtype: ElementType,
    shape: Vec<u64>,
    /// Fixed absolute offset of this dataset's data region, assigned
    /// once when the dataset is created and never moved afterwards.
    data_offset: u64,
    /// Per-cell `(offset, len)`, row-major, valid only for `VarBytes`.
    var_table: Vec<(u64, u32)>,
}

impl DatasetMeta {
    fn strides(&self) -> Vec<u64> {
        row_major_strides(&self.shape)
    }
}

fn row_major_strides(shape: &[u64]) -> Vec<u64> {
    let mut strides = vec![1u64; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Directory {
    datasets: HashMap<String, DatasetMeta>,
}

/// Operations a brick's storage surface must provide. `FlatFileBackend`
/// is the only implementation; the trait exists so the dispatcher and
/// persisted-storage layers above it are not tied to one container
/// format, the same seam the source system draws between its storage
/// abstraction and the concrete array-file library underneath.
pub trait BrickBackend {
    fn require_dataset(&mut self, name: &str, shape: &[u64], dtype: ElementType, fill: &Scalar) -> Result<()>;
    fn dataset_shape(&self, name: &str) -> Option<Vec<u64>>;
    fn read(&mut self, name: &str, selection: &[BrickAxisSelection]) -> Result<Array>;
    fn write(&mut self, name: &str, selection: &[BrickAxisSelection], data: &Array) -> Result<()>;
}

pub struct FlatFileBackend {
    path: PathBuf,
    file: File,
    dir: Directory,
    /// Absolute offset just past the last byte of real data; this is
    /// where the directory currently lives, and where the next
    /// dataset's data (or var-bytes append) gets written before the
    /// directory is rewritten past it.
    data_end: u64,
}

impl FlatFileBackend {
    /// Open an existing brick file, or create a fresh one with an
    /// empty directory. Takes an exclusive advisory lock for the
    /// lifetime of the handle — bricks are written by exactly one
    /// dispatcher worker at a time, and the lock turns a violation of
    /// that invariant into an early, loud failure instead of silent
    /// corruption.
    pub fn open(path: &Path) -> Result<FlatFileBackend> {
        let fresh = !path.exists();
        let mut file = if fresh {
            io_util::create_file(path)?
        } else {
            io_util::open_file_rw(path)?
        };
        err_at!(IOError, file.try_lock_exclusive())?;

        let (dir, data_end) = if fresh {
            io_util::sync_write_at(&mut file, 0, MAGIC)?;
            let dir = Directory::default();
            let data_end = MAGIC.len() as u64;
            write_directory(&mut file, &dir, data_end)?;
            (dir, data_end)
        } else {
            read_directory(&mut file)?
        };

        Ok(FlatFileBackend { path: path.to_path_buf(), file, dir, data_end })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FlatFileBackend {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Write the directory at `at`, followed by the 16-byte trailer
/// `(dir_offset, dir_len)` at the very end of the file.
fn write_directory(file: &mut File, dir: &Directory, at: u64) -> Result<()> {
    let encoded = err_at!(Fatal, bincode::serialize(dir))?;
    io_util::sync_write_at(file, at, &encoded)?;
    let mut trailer = Vec::with_capacity(TRAILER_LEN as usize);
    trailer.extend_from_slice(&at.to_le_bytes());
    trailer.extend_from_slice(&(encoded.len() as u64).to_le_bytes());
    io_util::sync_write_at(file, at + encoded.len() as u64, &trailer)?;
    Ok(())
}

/// Read the directory, returning it along with `data_end` (the
/// directory's own offset — the boundary past which real data ends).
fn read_directory(file: &mut File) -> Result<(Directory, u64)> {
    let total = err_at!(IOError, file.metadata())?.len();
    if total < MAGIC.len() as u64 + TRAILER_LEN {
        return err_at!(SchemaMismatch, msg: "brick file too short to be ours");
    }
    let magic = io_util::read_at(file, 0, MAGIC.len())?;
    if magic != MAGIC {
        return err_at!(SchemaMismatch, msg: "brick file header corrupt or not ours");
    }
    let trailer = io_util::read_at(file, total - TRAILER_LEN, TRAILER_LEN as usize)?;
    let dir_offset = u64::from_le_bytes(trailer[0..8].try_into().unwrap());
    let dir_len = u64::from_le_bytes(trailer[8..16].try_into().unwrap());
    let encoded = io_util::read_at(file, dir_offset, dir_len as usize)?;
    let dir: Directory = err_at!(Fatal, bincode::deserialize(&encoded))?;
    Ok((dir, dir_offset))
}

/// Cartesian product of per-axis local index lists, in row-major
/// (last-axis-fastest) order.
fn cartesian(axes: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut out = vec![vec![]];
    for axis in axes {
        let mut next = Vec::with_capacity(out.len() * axis.len().max(1));
        for prefix in &out {
            for v in axis {
                let mut row = prefix.clone();
                row.push(*v);
                next.push(row);
            }
        }
        out = next;
    }
    out
}

fn axis_indices(axis: &BrickAxisSelection) -> Vec<usize> {
    match axis {
        BrickAxisSelection::Index(i) => vec![*i],
        BrickAxisSelection::List(l) => l.clone(),
        BrickAxisSelection::Range { start, stop, step } => (*start..*stop).step_by(*step).collect(),
    }
}

fn linear_index(idx: &[usize], strides: &[u64]) -> u64 {
    idx.iter().zip(strides.iter()).map(|(i, s)| *i as u64 * s).sum()
}

fn fixed_fill_pattern(dtype: ElementType, fill: &Scalar, width: usize) -> Result<Vec<u8>> {
    match (dtype, fill) {
        (ElementType::I32, Scalar::I32(v)) => Ok(v.to_le_bytes().to_vec()),
        (ElementType::I64, Scalar::I64(v)) => Ok(v.to_le_bytes().to_vec()),
        (ElementType::F32, Scalar::F32(v)) => Ok(v.to_le_bytes().to_vec()),
        (ElementType::F64, Scalar::F64(v)) => Ok(v.to_le_bytes().to_vec()),
        (ElementType::FixedBytes(_), Scalar::Bytes(v)) => {
            let mut buf = v.clone();
            buf.resize(width, 0);
            Ok(buf)
        }
        _ => err_at!(SchemaMismatch, msg: "fill value does not match dataset element type {:?}", dtype),
    }
}

impl BrickBackend for FlatFileBackend {
    fn require_dataset(&mut self, name: &str, shape: &[u64], dtype: ElementType, fill: &Scalar) -> Result<()> {
        match self.dir.datasets.get(name) {
            Some(existing) if existing.dtype == dtype && existing.shape == shape => Ok(()),
            Some(existing) => err_at!(
                SchemaMismatch,
                msg: "dataset {:?} exists with shape {:?}/{:?}, requested {:?}/{:?}",
                name, existing.shape, existing.dtype, shape, dtype
            ),
            // A brick's cells are never individually written before
            // they hold real data, so a freshly created dataset must
            // read back as the parameter's fill value everywhere, not
            // as zero bytes (zero is rarely the configured fill).
            None if matches!(dtype, ElementType::VarBytes) => {
                let bytes = match fill {
                    Scalar::Bytes(v) => v.clone(),
                    _ => return err_at!(SchemaMismatch, msg: "fill value does not match VarBytes dataset"),
                };
                let cells: u64 = shape.iter().product();
                let data_offset = self.data_end;
                if !bytes.is_empty() {
                    io_util::sync_write_at(&mut self.file, data_offset, &bytes)?;
                }
                self.data_end = data_offset + bytes.len() as u64;

                let entry = (data_offset, bytes.len() as u32);
                let meta = DatasetMeta { dtype, shape: shape.to_vec(), data_offset, var_table: vec![entry; cells as usize] };
                self.dir.datasets.insert(name.to_string(), meta);
                write_directory(&mut self.file, &self.dir, self.data_end)
            }
            None => {
                let cells: u64 = shape.iter().product();
                let width = dtype.fixed_width().unwrap_or(0);
                let pattern = fixed_fill_pattern(dtype, fill, width)?;
                let reserved = cells * width as u64;

                let data_offset = self.data_end;
                if reserved > 0 {
                    let region = pattern.repeat(cells as usize);
                    io_util::sync_write_at(&mut self.file, data_offset, &region)?;
                }
                self.data_end = data_offset + reserved;

                let meta = DatasetMeta { dtype, shape: shape.to_vec(), data_offset, var_table: Vec::new() };
                self.dir.datasets.insert(name.to_string(), meta);
                write_directory(&mut self.file, &self.dir, self.data_end)
            }
        }
    }

    fn dataset_shape(&self, name: &str) -> Option<Vec<u64>> {
        self.dir.datasets.get(name).map(|m| m.shape.clone())
    }

    fn read(&mut self, name: &str, selection: &[BrickAxisSelection]) -> Result<Array> {
        let meta = match self.dir.datasets.get(name) {
            Some(m) => m.clone(),
            None => return err_at!(MissingBrickFile, msg: "no dataset {:?} in {:?}", name, self.path),
        };
        let strides = meta.strides();
        let axes: Vec<Vec<usize>> = selection.iter().map(axis_indices).collect();
        let cells = cartesian(&axes);
        let shape: Vec<usize> = axes.iter().map(|a| a.len()).collect();

        match meta.dtype {
            ElementType::VarBytes => {
                let mut data = Vec::with_capacity(cells.len());
                for idx in &cells {
                    let lin = linear_index(idx, &strides);
                    let (off, len) = meta.var_table[lin as usize];
                    let bytes = if len == 0 {
                        Vec::new()
                    } else {
                        io_util::read_at(&mut self.file, off, len as usize)?
                    };
                    data.push(bytes);
                }
                Ok(Array::Bytes { shape, data })
            }
            fixed => {
                let width = fixed.fixed_width().unwrap() as u64;
                read_fixed(&mut self.file, meta.data_offset, &strides, width, &cells, shape, fixed)
            }
        }
    }

    fn write(&mut self, name: &str, selection: &[BrickAxisSelection], data: &Array) -> Result<()> {
        let meta = match self.dir.datasets.get(name) {
            Some(m) => m.clone(),
            None => return err_at!(MissingBrickFile, msg: "no dataset {:?} in {:?}", name, self.path),
        };
        let strides = meta.strides();
        let axes: Vec<Vec<usize>> = selection.iter().map(axis_indices).collect();
        let cells = cartesian(&axes);

        if cells.len() != data.len() {
            return err_at!(
                SelectionRankMismatch,
                msg: "selection picks {} cells but data has {}",
                cells.len(), data.len()
            );
        }

        match data {
            Array::Bytes { data: values, .. } if matches!(meta.dtype, ElementType::VarBytes) => {
                let mut var_table = meta.var_table.clone();
                let mut cursor = self.data_end;
                for (idx, bytes) in cells.iter().zip(values.iter()) {
                    let lin = linear_index(idx, &strides) as usize;
                    io_util::sync_write_at(&mut self.file, cursor, bytes)?;
                    var_table[lin] = (cursor, bytes.len() as u32);
                    cursor += bytes.len() as u64;
                }
                self.data_end = cursor;
                let mut updated = meta.clone();
                updated.var_table = var_table;
                self.dir.datasets.insert(name.to_string(), updated);
                write_directory(&mut self.file, &self.dir, self.data_end)
            }
            _ => {
                let width = meta.dtype.fixed_width().ok_or_else(|| {
                    crate::error::Error::Fatal(
                        format!("{}:{}", file!(), line!()),
                        "dataset has no fixed width".to_string(),
                    )
                })?;
                write_fixed(&mut self.file, meta.data_offset, &strides, width as u64, &cells, data)
            }
        }
    }
}

fn read_fixed(
    file: &mut File,
    base: u64,
    strides: &[u64],
    width: u64,
    cells: &[Vec<usize>],
    shape: Vec<usize>,
    dtype: ElementType,
) -> Result<Array> {
    macro_rules! collect_as {
        ($variant:ident, $conv:expr) => {{
            let mut data = Vec::with_capacity(cells.len());
            for idx in cells {
                let off = base + linear_index(idx, strides) * width;
                let raw = io_util::read_at(file, off, width as usize)?;
                data.push(($conv)(&raw));
            }
            Ok(Array::$variant { shape, data })
        }};
    }

    match dtype {
        ElementType::I32 => collect_as!(I32, |b: &[u8]| i32::from_le_bytes(b.try_into().unwrap())),
        ElementType::I64 => collect_as!(I64, |b: &[u8]| i64::from_le_bytes(b.try_into().unwrap())),
        ElementType::F32 => collect_as!(F32, |b: &[u8]| f32::from_le_bytes(b.try_into().unwrap())),
        ElementType::F64 => collect_as!(F64, |b: &[u8]| f64::from_le_bytes(b.try_into().unwrap())),
        ElementType::FixedBytes(_) => {
            let mut data = Vec::with_capacity(cells.len());
            for idx in cells {
                let off = base + linear_index(idx, strides) * width;
                data.push(io_util::read_at(file, off, width as usize)?);
            }
            Ok(Array::Bytes { shape, data })
        }
        ElementType::VarBytes => unreachable!("handled by caller"),
    }
}

fn write_fixed(
    file: &mut File,
    base: u64,
    strides: &[u64],
    width: u64,
    cells: &[Vec<usize>],
    data: &Array,
) -> Result<()> {
    macro_rules! scatter {
        ($data:expr, $to_bytes:expr) => {{
            for (idx, v) in cells.iter().zip($data.iter()) {
                let off = base + linear_index(idx, strides) * width;
                let bytes = ($to_bytes)(v);
                io_util::sync_write_at(file, off, &bytes)?;
            }
        }};
    }

    match data {
        Array::I32 { data, .. } => scatter!(data, |v: &i32| v.to_le_bytes()),
        Array::I64 { data, .. } => scatter!(data, |v: &i64| v.to_le_bytes()),
        Array::F32 { data, .. } => scatter!(data, |v: &f32| v.to_le_bytes()),
        Array::F64 { data, .. } => scatter!(data, |v: &f64| v.to_le_bytes()),
        Array::Bytes { data, .. } => {
            for (idx, v) in cells.iter().zip(data.iter()) {
                let off = base + linear_index(idx, strides) * width;
                let mut buf = v.clone();
                buf.resize(width as usize, 0);
                io_util::sync_write_at(file, off, &buf)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "brick_file_test.rs"]
mod brick_file_test;
