//! `brickstore` persists the parameter data of a coverage model: large,
//! mostly-temporal n-dimensional arrays too big to hold as a single
//! file, split into fixed-size bricks and written back through an
//! asynchronous dispatcher so that callers computing new values never
//! block on disk I/O.
//!
//! A parameter's values are addressed purely in index space (time
//! step, depth level, lat/lon cell, ...) through [`domain::Selection`];
//! the brick index ([`brick_index`]) and slice calculator ([`slice`])
//! translate that into per-brick reads and writes against the on-disk
//! container format in [`brick_file`]. [`persistence`] owns brick
//! allocation and the parameter manifest; [`dispatcher`] and
//! [`worker`] move writes off the caller's thread and onto a pool of
//! workers; [`expr`] evaluates the arithmetic expressions a derived
//! parameter is defined by.

#[macro_use]
mod error;

mod brick_file;
mod brick_index;
mod config;
mod dispatcher;
mod domain;
mod dtype;
mod expr;
mod ident;
mod io_util;
mod manifest;
mod ndcopy;
mod persisted_storage;
mod persistence;
mod slice;
mod thread;
mod work;
mod worker;

pub use crate::brick_file::{BrickBackend, FlatFileBackend};
pub use crate::brick_index::{BrickEntry, BrickIndex};
pub use crate::config::{BrickSizingPolicy, Config, DispatcherConfig};
pub use crate::dispatcher::{Dispatcher, FailureCallback};
pub use crate::domain::{AxisSelection, Bounds, Extent, Selection};
pub use crate::dtype::{Array, ElementType, Scalar};
pub use crate::error::{Error, Result};
pub use crate::expr::{ArgBinding, CallableRegistry, Expression};
pub use crate::ident::Id;
pub use crate::persisted_storage::PersistedStorage;
pub use crate::persistence::PersistenceLayer;
pub use crate::work::{BrickMetrics, PackedWork, WorkItem, WorkKey};
