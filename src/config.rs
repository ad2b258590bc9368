//! Ambient configuration (C9): brick sizing policy and dispatcher
//! tuning, loadable from a TOML file the way the corpus's own
//! configuration surfaces are (`serde` + `toml`), with documented
//! defaults so a parameter can be initialized without one.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Governs how a parameter's total domain is cut into bricks.
///
/// Per the sizing rule: the temporal axis is chunked into bricks of
/// `temporal_extent` steps; every other axis gets exactly one brick
/// spanning its full extent. `chunk_divisor` is kept for parity with
/// the source system's configuration surface, which derives a brick's
/// temporal extent as `total_temporal_extent / chunk_divisor` when no
/// explicit override is given; `temporal_extent` here is that already-
/// resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrickSizingPolicy {
    pub temporal_extent: u64,
    pub chunk_divisor: u64,
}

impl Default for BrickSizingPolicy {
    fn default() -> BrickSizingPolicy {
        BrickSizingPolicy { temporal_extent: 6, chunk_divisor: 3 }
    }
}

impl BrickSizingPolicy {
    /// Resolve a brick's temporal extent for a parameter whose total
    /// temporal extent is `total`, falling back to `total /
    /// chunk_divisor` (rounded up, minimum 1) when `temporal_extent`
    /// is zero (meaning "derive it").
    pub fn resolve_temporal_extent(&self, total: u64) -> u64 {
        if self.temporal_extent > 0 {
            self.temporal_extent
        } else {
            ((total + self.chunk_divisor - 1) / self.chunk_divisor).max(1)
        }
    }
}

/// Governs the write dispatcher's worker pool and retry behavior.
///
/// The source system's organizer polls its inbound queue on a 1-second
/// tick so that a stash left behind by a key's in-flight write gets
/// flushed even without further `put` traffic. This dispatcher's
/// organizer instead flushes a key's stash the moment that key's active
/// write reports success or failure (see `dispatcher.rs`), so there is
/// no separate flush-interval knob to configure; `retry_backoff_ms` is
/// the one timing parameter that survived the port, governing how long
/// a worker pauses after a failed write before asking for more work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> DispatcherConfig {
        DispatcherConfig {
            workers: num_cpus::get().max(1),
            queue_capacity: 1024,
            max_retries: 4,
            retry_backoff_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    pub brick_sizing: BrickSizingPolicy,
    pub dispatcher: DispatcherConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let text = err_at!(IOError, fs::read_to_string(path))?;
        err_at!(Fatal, toml::from_str(&text), "invalid config at {:?}", path)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
