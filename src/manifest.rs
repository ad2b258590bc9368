//! The parameter manifest (part of C5): the durable record of which
//! parameters exist, their shape/dtype/fill, and which bricks back
//! them. Stored as TOML next to the brick files, the same way the
//! ambient [`crate::config`] surface is — a human-inspectable sidecar
//! rather than a packed binary the corpus has no precedent for using
//! at this layer.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::brick_index::BrickIndex;
use crate::dtype::{ElementType, Scalar};
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterMeta {
    pub name: String,
    pub extent: Vec<u64>,
    pub dtype: ElementType,
    pub fill: Scalar,
    pub temporal_brick_extent: u64,
    pub bricks: BrickIndex,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub parameters: HashMap<String, ParameterMeta>,
}

impl Manifest {
    const FILE_NAME: &'static str = "manifest.toml";

    fn path(root: &Path) -> PathBuf {
        root.join(Self::FILE_NAME)
    }

    /// Load the manifest from `root`, or an empty one if none exists
    /// yet (a brand-new storage root).
    pub fn open(root: &Path) -> Result<Manifest> {
        let path = Self::path(root);
        if !path.exists() {
            return Ok(Manifest::default());
        }
        let text = err_at!(IOError, fs::read_to_string(&path))?;
        err_at!(Fatal, toml::from_str(&text), "corrupt manifest at {:?}", path)
    }

    /// Persist the manifest to `root`, taking an exclusive lock on a
    /// sibling lock file for the duration of the write so that two
    /// processes racing to update the manifest don't interleave
    /// partial writes.
    pub fn save(&self, root: &Path) -> Result<()> {
        err_at!(IOError, fs::create_dir_all(root))?;
        let lock_path = root.join(".manifest.lock");
        let lock_file = err_at!(
            IOError,
            fs::OpenOptions::new().create(true).write(true).open(&lock_path)
        )?;
        err_at!(IOError, lock_file.lock_exclusive())?;

        let text = err_at!(Fatal, toml::to_string_pretty(self))?;
        let path = Self::path(root);
        let tmp = root.join(".manifest.toml.tmp");
        err_at!(IOError, fs::write(&tmp, text))?;
        err_at!(IOError, fs::rename(&tmp, &path))?;

        err_at!(IOError, FileExt::unlock(&lock_file))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "manifest_test.rs"]
mod manifest_test;
