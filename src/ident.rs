//! 128-bit random identifiers, used for coverage ids and brick ids.
//!
//! Hex-encoded, uppercase, dash-grouped — the `uuid` crate's hyphenated
//! encoding already produces exactly this shape, so `Id` is a thin
//! newtype over `uuid::Uuid` rather than a hand-rolled hex codec.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Id(Uuid);

impl Id {
    /// Generate a new random (v4) identifier.
    pub fn generate() -> Id {
        Id(Uuid::new_v4())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.to_hyphenated().to_string().to_uppercase())
    }
}

impl FromStr for Id {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Id> {
        let uuid = err_at!(Fatal, Uuid::parse_str(s), "invalid identifier {:?}", s)?;
        Ok(Id(uuid))
    }
}

#[cfg(test)]
#[path = "ident_test.rs"]
mod ident_test;
