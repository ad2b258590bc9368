//! The work-item data model shared between the dispatcher (C6) and its
//! workers (C7): what a pending brick write looks like once it has
//! left the caller's thread.

use serde::{Deserialize, Serialize};

use crate::domain::Selection;
use crate::dtype::Array;
use crate::error::Result;

/// Identifies one logical write: a parameter name plus the selection
/// being written. Two `put`s against the same key coalesce in the
/// dispatcher's stash rather than both reaching disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkKey {
    pub parameter: String,
    pub selection_key: String,
}

impl WorkKey {
    pub fn new(parameter: &str, selection: &Selection) -> WorkKey {
        // Selections are small and this key only needs to be stable
        // and distinguishing, not reversible, so we reuse the same
        // debug formatting the corpus leans on for ad-hoc keys.
        WorkKey { parameter: parameter.to_string(), selection_key: format!("{:?}", selection) }
    }
}

/// Size and shape metrics describing a work item's payload, surfaced
/// to callers that want visibility into queue depth without decoding
/// every item (e.g. an operator inspecting dispatcher backlog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrickMetrics {
    pub cells: usize,
    pub attempt: u32,
}

/// One brick write, queued for the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub key: WorkKey,
    pub parameter: String,
    pub selection: Selection,
    pub data: Array,
    pub attempt: u32,
}

impl WorkItem {
    pub fn new(parameter: &str, selection: Selection, data: Array) -> WorkItem {
        let key = WorkKey::new(parameter, &selection);
        WorkItem { key, parameter: parameter.to_string(), selection, data, attempt: 0 }
    }

    pub fn metrics(&self) -> BrickMetrics {
        BrickMetrics { cells: self.data.len(), attempt: self.attempt }
    }

    pub fn packed(&self) -> Result<PackedWork> {
        let bytes = err_at!(Fatal, bincode::serialize(self))?;
        Ok(PackedWork(bytes))
    }
}

/// The `bincode`-encoded form of a [`WorkItem`], used as the
/// dispatcher's failure-counter key: two retries of the same logical
/// write produce identical bytes, so counting by encoded payload
/// (rather than by [`WorkKey`] alone) naturally resets the count once
/// the payload actually changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackedWork(pub Vec<u8>);

#[cfg(test)]
#[path = "work_test.rs"]
mod work_test;
