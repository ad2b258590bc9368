//! The persistence layer (C5): owns the parameter manifest and brick
//! allocation. Callers open a layer once per storage root and ask it
//! to register parameters, grow their domain, and resolve which
//! bricks a selection touches; actual reads and writes happen one
//! level up, in [`crate::persisted_storage`].

use std::path::{Path, PathBuf};

use crate::brick_index::{BrickEntry, BrickIndex};
use crate::config::BrickSizingPolicy;
use crate::dtype::{ElementType, Scalar};
use crate::error::Result;
use crate::ident::Id;
use crate::manifest::{Manifest, ParameterMeta};

pub struct PersistenceLayer {
    root: PathBuf,
    manifest: Manifest,
}

impl PersistenceLayer {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<PersistenceLayer> {
        let root = root.as_ref().to_path_buf();
        let manifest = Manifest::open(&root)?;
        Ok(PersistenceLayer { root, manifest })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn parameter(&self, name: &str) -> Result<&ParameterMeta> {
        self.manifest
            .parameters
            .get(name)
            .ok_or_else(|| missing_parameter(name))
    }

    /// Register a new parameter and allocate its initial bricks. A
    /// parameter name that already exists is left untouched unless its
    /// declared shape/dtype conflict with the existing registration.
    pub fn init_parameter(
        &mut self,
        name: &str,
        extent: Vec<u64>,
        dtype: ElementType,
        fill: Scalar,
        policy: &BrickSizingPolicy,
    ) -> Result<()> {
        if let Some(existing) = self.manifest.parameters.get(name) {
            if existing.extent == extent && existing.dtype == dtype {
                return Ok(());
            }
            return err_at!(
                SchemaMismatch,
                msg: "parameter {:?} already registered with extent {:?}/{:?}",
                name, existing.extent, existing.dtype
            );
        }

        let temporal_brick_extent = policy.resolve_temporal_extent(extent.first().copied().unwrap_or(0));
        let brick_size = brick_size_for(&extent, temporal_brick_extent);

        let mut bricks = BrickIndex::new();
        for origin in allocate_origins(&extent, &brick_size) {
            bricks.insert(BrickEntry::new(Id::generate(), origin, brick_size.clone()));
        }

        self.manifest.parameters.insert(
            name.to_string(),
            ParameterMeta { name: name.to_string(), extent, dtype, fill, temporal_brick_extent, bricks },
        );
        self.manifest.save(&self.root)
    }

    /// Grow a parameter's temporal extent, allocating whatever new
    /// bricks the larger domain needs. Per the domain invariant, a
    /// parameter's extent can only grow, never shrink.
    pub fn expand_domain(&mut self, name: &str, new_extent: Vec<u64>) -> Result<()> {
        let param = self
            .manifest
            .parameters
            .get(name)
            .ok_or_else(|| missing_parameter(name))?
            .clone();

        if new_extent.len() != param.extent.len() {
            return err_at!(
                SelectionRankMismatch,
                msg: "parameter {:?} has rank {}, expansion gave rank {}",
                name, param.extent.len(), new_extent.len()
            );
        }
        for (axis, (old, new)) in param.extent.iter().zip(new_extent.iter()).enumerate() {
            if axis == 0 {
                if new < old {
                    return err_at!(
                        DomainShrink,
                        msg: "parameter {:?} cannot shrink axis from {} to {}",
                        name, old, new
                    );
                }
            } else if new != old {
                return err_at!(
                    NonTemporalChange,
                    msg: "parameter {:?} axis {} is fixed at creation: was {}, expansion gave {}",
                    name, axis, old, new
                );
            }
        }

        let brick_size = brick_size_for(&new_extent, param.temporal_brick_extent);
        let existing_origins: std::collections::HashSet<Vec<i64>> =
            param.bricks.all().iter().map(|e| e.origin.clone()).collect();

        let mut bricks = param.bricks.clone();
        for origin in allocate_origins(&new_extent, &brick_size) {
            if !existing_origins.contains(&origin) {
                bricks.insert(BrickEntry::new(Id::generate(), origin, brick_size.clone()));
            }
        }

        let meta = self.manifest.parameters.get_mut(name).unwrap();
        meta.extent = new_extent;
        meta.bricks = bricks;
        self.manifest.save(&self.root)
    }

    /// Unconditionally (re)register a parameter with a fresh brick
    /// allocation, discarding any previous registration under `name`.
    /// Used to rebuild a parameter's schema from scratch; ordinary
    /// growth should go through [`Self::expand_domain`] instead, which
    /// preserves existing bricks.
    pub fn reset_parameter(
        &mut self,
        name: &str,
        extent: Vec<u64>,
        dtype: ElementType,
        fill: Scalar,
        policy: &BrickSizingPolicy,
    ) -> Result<()> {
        self.manifest.parameters.remove(name);
        self.init_parameter(name, extent, dtype, fill, policy)
    }

    pub fn list_bricks(&self, name: &str) -> Result<&[BrickEntry]> {
        Ok(self.parameter(name)?.bricks.all())
    }

    pub fn brick_path(&self, name: &str, id: Id) -> PathBuf {
        self.root.join(name).join(format!("{}.brk", id))
    }
}

fn missing_parameter(name: &str) -> crate::error::Error {
    crate::error::Error::MissingBrickFile(
        format!("{}:{}", file!(), line!()),
        format!("no parameter registered under {:?}", name),
    )
}

/// Brick size for every axis: `temporal_brick_extent` on axis 0, the
/// full extent on every other axis (one brick per non-temporal axis,
/// per the sizing policy). The temporal nominal size is the constant
/// brick extent regardless of the current total extent — it must stay
/// fixed across `expand_domain` calls so that a brick allocated while
/// the total extent was still smaller than one brick (e.g. a fresh
/// parameter with temporal extent 4 against a default brick extent of
/// 6) reserves its full grid cell up front; capping it to the extent
/// at allocation time would leave a gap between that brick's nominal
/// size and the next brick's origin once the domain grows past it.
fn brick_size_for(extent: &[u64], temporal_brick_extent: u64) -> Vec<u64> {
    extent
        .iter()
        .enumerate()
        .map(|(axis, e)| if axis == 0 { temporal_brick_extent.max(1) } else { *e })
        .collect()
}

/// Cartesian product of per-axis brick origins: `0, size, 2*size, ...`
/// up to (but not exceeding) the axis's extent.
fn allocate_origins(extent: &[u64], brick_size: &[u64]) -> Vec<Vec<i64>> {
    let mut axes_origins: Vec<Vec<i64>> = Vec::with_capacity(extent.len());
    for (e, s) in extent.iter().zip(brick_size.iter()) {
        let s = (*s).max(1);
        let mut origins = Vec::new();
        let mut o = 0u64;
        while o < *e {
            origins.push(o as i64);
            o += s;
        }
        if origins.is_empty() {
            origins.push(0);
        }
        axes_origins.push(origins);
    }

    let mut out = vec![vec![]];
    for origins in axes_origins {
        let mut next = Vec::with_capacity(out.len() * origins.len());
        for prefix in &out {
            for o in &origins {
                let mut row = prefix.clone();
                row.push(*o);
                next.push(row);
            }
        }
        out = next;
    }
    out
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod persistence_test;
