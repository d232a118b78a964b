//! Timestamp authority incarnation counter

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one incarnation of the timestamp authority.
///
/// A new epoch begins whenever the authority restarts or is replaced. A
/// response tagged with an older epoch may have been decided by an
/// incarnation that no longer holds authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Epoch(u64);

impl Epoch {
    pub const fn new(value: u64) -> Self {
        Epoch(value)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// The epoch of the successor incarnation.
    pub const fn next(&self) -> Self {
        Epoch(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epoch-{}", self.0)
    }
}
