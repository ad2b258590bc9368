//! Crate-wide error type and the `err_at!` capture macro.
//!
//! Every fallible boundary in this crate returns `Result<T>` from this
//! module. `err_at!` is the same shape the author's other crates use
//! (see `src/llrb/index.rs`, `src/util/files.rs` in the sibling `rdms`
//! lineage this crate is grown from): it tags an error with the
//! call-site location so that a `Display` of any `Error` tells you
//! where it was raised, not just what kind it is.

use std::fmt;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed error kinds for the brick storage engine.
///
/// Each variant carries `(location, message)` where `location` is
/// `file!():line!()` of the `err_at!` call site.
#[derive(Debug)]
pub enum Error {
    /// On-disk brick metadata disagrees with the parameter's declared
    /// shape/element-type. Fatal, never retried.
    SchemaMismatch(String, String),
    /// The manifest references a brick file that is absent on disk.
    MissingBrickFile(String, String),
    /// `expand_domain` was asked to shrink the total extent.
    DomainShrink(String, String),
    /// `expand_domain` changed a non-temporal axis.
    NonTemporalChange(String, String),
    /// Selection rank does not match (and cannot be broadcast to) the
    /// parameter's rank.
    SelectionRankMismatch(String, String),
    /// An axis index landed outside the brick it was dispatched to.
    /// Indicates a bug in the brick index, never a user error.
    OutOfBrick(String, String),
    /// A selection axis does not overlap a brick's bounds at all.
    NoOverlap(String, String),
    /// A worker failed while performing a write.
    WorkerFailure(String, String),
    /// A submission arrived after the dispatcher started shutting down.
    ShutdownAfterSubmit(String, String),
    /// A submission was rejected because the bounded inbound queue is full.
    QueueFull(String, String),
    /// Catch-all I/O failure (file open/read/write/flush, lock acquisition).
    IOError(String, String),
    /// Catch-all for invariant violations that don't fit a narrower kind.
    Fatal(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Error::*;

        match self {
            SchemaMismatch(l, m) => write!(f, "{} SchemaMismatch: {}", l, m),
            MissingBrickFile(l, m) => write!(f, "{} MissingBrickFile: {}", l, m),
            DomainShrink(l, m) => write!(f, "{} DomainShrink: {}", l, m),
            NonTemporalChange(l, m) => write!(f, "{} NonTemporalChange: {}", l, m),
            SelectionRankMismatch(l, m) => write!(f, "{} SelectionRankMismatch: {}", l, m),
            OutOfBrick(l, m) => write!(f, "{} OutOfBrick: {}", l, m),
            NoOverlap(l, m) => write!(f, "{} NoOverlap: {}", l, m),
            WorkerFailure(l, m) => write!(f, "{} WorkerFailure: {}", l, m),
            ShutdownAfterSubmit(l, m) => write!(f, "{} ShutdownAfterSubmit: {}", l, m),
            QueueFull(l, m) => write!(f, "{} QueueFull: {}", l, m),
            IOError(l, m) => write!(f, "{} IOError: {}", l, m),
            Fatal(l, m) => write!(f, "{} Fatal: {}", l, m),
        }
    }
}

impl std::error::Error for Error {}

/// Build or convert into an `Error` of the given kind, tagged with the
/// call-site location.
///
/// Forms:
/// - `err_at!(Kind, msg: "fmt", args...)` — build an `Err(Error::Kind(loc, msg))` directly.
/// - `err_at!(Kind, result_expr)` — convert a foreign `Result`'s `Err` into `Error::Kind`.
/// - `err_at!(Kind, result_expr, "fmt", args...)` — same, with a custom message on failure.
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let location = format!("{}:{}", file!(), line!());
        Result::Err($crate::error::Error::$v(location, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let location = format!("{}:{}", file!(), line!());
                Err($crate::error::Error::$v(location, format!("{}", err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(_) => {
                let location = format!("{}:{}", file!(), line!());
                Err($crate::error::Error::$v(location, format!($($arg),+)))
            }
        }
    }};
}
