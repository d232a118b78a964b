//! Logical timestamps issued by the timestamp authority
//!
//! Timestamps are plain u64 counters allocated centrally, so comparing two
//! of them is a total order across the whole deployment. A transaction's
//! start timestamp doubles as its identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical timestamp allocated by the timestamp authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Zero timestamp, used for "not yet assigned" commit timestamps.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Largest representable timestamp. Never allocated by an authority;
    /// reserved for sentinel use.
    pub const MAX: Timestamp = Timestamp(u64::MAX);

    pub const fn new(value: u64) -> Self {
        Timestamp(value)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Big-endian byte form, suitable as an order-preserving storage key.
    pub fn to_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Timestamp(u64::from_be_bytes(bytes))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Timestamp(value)
    }
}
