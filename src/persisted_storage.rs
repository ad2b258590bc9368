//! The per-parameter storage facade (C4): `get`/`set`/`fill`/`reinit`
//! against a selection expressed purely in index space. This is where
//! a selection spanning several bricks gets fanned out to each one and
//! the results stitched back into a single dense buffer.

use std::fs;

use crate::brick_file::{BrickBackend, FlatFileBackend};
use crate::brick_index::BrickIndex;
use crate::domain::{Extent, Selection};
use crate::dtype::{Array, Scalar};
use crate::error::Result;
use crate::ndcopy::{gather_from, scatter_into};
use crate::persistence::PersistenceLayer;
use crate::slice::compute_selection;

pub struct PersistedStorage<'a> {
    layer: &'a mut PersistenceLayer,
    name: String,
}

impl<'a> PersistedStorage<'a> {
    pub fn new(layer: &'a mut PersistenceLayer, name: &str) -> PersistedStorage<'a> {
        PersistedStorage { layer, name: name.to_string() }
    }

    /// Read a selection, broadcasting it out to the parameter's full
    /// rank first. Bricks never written to contribute the parameter's
    /// fill value rather than an error or zero bytes.
    pub fn get(&mut self, selection: &Selection) -> Result<Array> {
        let param = self.layer.parameter(&self.name)?.clone();
        let rank = param.extent.len();
        let selection = selection
            .broadcast_to(rank)
            .ok_or_else(|| rank_mismatch(&self.name, rank, selection.rank()))?;

        let extent = Extent::new(param.extent.clone());
        let out_shape = selection.shape(&extent);
        let mut out = Array::filled(out_shape.clone(), &param.fill)?;

        let query = selection.bounds(&extent).padded_to_rank2();
        let candidates = BrickIndex::sort_ascending(param.bricks.intersect(&query));

        for brick in candidates {
            let origin = &brick.origin[..rank];
            let size = &brick.size[..rank];
            let (brick_sel, buf_sel) = match compute_selection(&selection.0, origin, size) {
                Ok(pair) => pair,
                Err(_) => continue, // bounding-box hit, but no exact per-axis overlap
            };

            let path = self.layer.brick_path(&self.name, brick.id);
            if !path.exists() {
                continue; // never written: leave the pre-filled fill value in place
            }
            let mut backend = FlatFileBackend::open(&path)?;
            let piece = backend.read(&self.name, &brick_sel)?;
            scatter_into(&mut out, &out_shape, &buf_sel, &piece);
        }

        Ok(out)
    }

    /// Write `data` (shaped to match the broadcast selection) across
    /// every brick it touches, creating brick files lazily on first
    /// write and visiting overlapping bricks in ascending-origin order.
    pub fn set(&mut self, selection: &Selection, data: &Array) -> Result<()> {
        let param = self.layer.parameter(&self.name)?.clone();
        let rank = param.extent.len();
        let selection = selection
            .broadcast_to(rank)
            .ok_or_else(|| rank_mismatch(&self.name, rank, selection.rank()))?;

        let extent = Extent::new(param.extent.clone());
        let out_shape = selection.shape(&extent);
        if data.shape() != out_shape.as_slice() {
            return err_at!(
                SelectionRankMismatch,
                msg: "selection shape {:?} does not match data shape {:?}",
                out_shape, data.shape()
            );
        }

        let query = selection.bounds(&extent).padded_to_rank2();
        let candidates = BrickIndex::sort_ascending(param.bricks.intersect(&query));

        for brick in candidates {
            let origin = &brick.origin[..rank];
            let size = &brick.size[..rank];
            let (brick_sel, buf_sel) = match compute_selection(&selection.0, origin, size) {
                Ok(pair) => pair,
                Err(_) => continue,
            };

            let piece = gather_from(data, &out_shape, &buf_sel);

            let path = self.layer.brick_path(&self.name, brick.id);
            let mut backend = FlatFileBackend::open(&path)?;
            backend.require_dataset(&self.name, size, param.dtype, &param.fill)?;
            backend.write(&self.name, &brick_sel, &piece)?;
        }

        Ok(())
    }

    /// Reset every selected cell to the parameter's fill value.
    pub fn fill(&mut self, selection: &Selection) -> Result<()> {
        let param = self.layer.parameter(&self.name)?.clone();
        let rank = param.extent.len();
        let selection = selection
            .broadcast_to(rank)
            .ok_or_else(|| rank_mismatch(&self.name, rank, selection.rank()))?;
        let extent = Extent::new(param.extent.clone());
        let shape = selection.shape(&extent);
        let data = Array::filled(shape, &param.fill)?;
        self.set(&selection, &data)
    }

    /// Discard every brick file backing this parameter and re-run its
    /// initial allocation against `extent`, re-registering the same
    /// dtype and fill. Used when a parameter's schema must be rebuilt
    /// from scratch rather than grown; ordinary domain growth should
    /// use [`PersistenceLayer::expand_domain`] instead, which preserves
    /// existing bricks.
    pub fn reinit(&mut self, extent: Vec<u64>, policy: &crate::config::BrickSizingPolicy) -> Result<()> {
        let param = self.layer.parameter(&self.name)?.clone();
        for brick in param.bricks.all() {
            let path = self.layer.brick_path(&self.name, brick.id);
            if path.exists() {
                err_at!(IOError, fs::remove_file(&path))?;
            }
        }
        self.layer.reset_parameter(&self.name, extent, param.dtype, param.fill, policy)
    }
}

fn rank_mismatch(name: &str, param_rank: usize, selection_rank: usize) -> crate::error::Error {
    crate::error::Error::SelectionRankMismatch(
        format!("{}:{}", file!(), line!()),
        format!(
            "parameter {:?} has rank {} but selection has rank {} (selections may only be narrower, not wider)",
            name, param_rank, selection_rank
        ),
    )
}

#[cfg(test)]
#[path = "persisted_storage_test.rs"]
mod persisted_storage_test;
