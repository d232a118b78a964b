//! Commit table: the shared ledger of transaction outcomes
//!
//! The commit table maps transaction start timestamps to outcomes. It is the
//! single source of truth for "did this transaction commit" whenever the
//! timestamp authority cannot answer unambiguously, e.g. after a failover to
//! a new incarnation.
//!
//! Two capability-scoped roles share the one ledger:
//! - the **writer** (one active instance per authority incarnation) appends
//!   committed transactions and advances the low watermark, buffered until
//!   `flush`
//! - the **client** (any number of readers, across incarnations) performs
//!   point lookups, retires resolved entries, and races writers with the
//!   atomic `try_invalidate_transaction` primitive
//!
//! The commit record and the invalidation marker for one start timestamp are
//! mutually exclusive: both are written with the store's conditional write,
//! so exactly one of them ever becomes durable. A new incarnation fences out
//! an old one by winning this race, not by detecting its death.

mod error;
mod store_backed;

pub use error::{Error, Result};
pub use store_backed::StoreCommitTable;

use async_trait::async_trait;
use centra_common::Timestamp;
use std::fmt;
use std::sync::Arc;

/// Default name of the table backing the ledger.
pub const DEFAULT_TABLE_NAME: &str = "commit_table";

/// Sentinel stored in place of a commit timestamp for invalidated
/// transactions. Never allocated by a timestamp authority.
pub const INVALID_COMMIT_MARKER: Timestamp = Timestamp::MAX;

/// Where an authoritative commit timestamp was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitLocation {
    NotPresent,
    Cache,
    CommitTable,
    ShadowCell,
}

/// Result of a commit-timestamp lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitTimestamp {
    /// Where the answer came from.
    pub location: CommitLocation,
    /// The commit timestamp, meaningful only when the entry is valid.
    pub value: Timestamp,
    /// False once the transaction has been invalidated.
    pub is_valid: bool,
}

impl CommitTimestamp {
    pub fn committed(location: CommitLocation, value: Timestamp) -> Self {
        Self {
            location,
            value,
            is_valid: true,
        }
    }

    pub fn invalidated(location: CommitLocation) -> Self {
        Self {
            location,
            value: Timestamp::ZERO,
            is_valid: false,
        }
    }
}

impl fmt::Display for CommitTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "is valid={}, location={:?}, value={}",
            self.is_valid, self.location, self.value
        )
    }
}

/// Write-capability view over the ledger.
///
/// One active writer per authority incarnation. Mutations are buffered and
/// become visible only when `flush` returns.
#[async_trait]
pub trait CommitTableWriter: Send + Sync {
    /// Records that `start_ts` committed at `commit_ts`. Buffered.
    async fn add_committed_transaction(
        &self,
        start_ts: Timestamp,
        commit_ts: Timestamp,
    ) -> Result<()>;

    /// Buffers a monotonic advance of the low watermark. A value below the
    /// currently buffered or stored watermark is ignored.
    async fn update_low_watermark(&self, low_watermark: Timestamp) -> Result<()>;

    /// Durably applies all buffered writes. Returns only once the store has
    /// acknowledged persistence; on failure the buffer is kept so the whole
    /// flush can be retried.
    async fn flush(&self) -> Result<()>;

    /// Discards buffered writes without applying them. Required when a
    /// writer loses ownership: stale buffered records must never be flushed
    /// by a later call.
    fn clear_write_buffer(&self);
}

/// Read-capability view over the ledger.
///
/// Safe for unbounded concurrent callers, including across incarnations.
#[async_trait]
pub trait CommitTableClient: Send + Sync {
    /// Point lookup of a transaction's outcome. `None` means no record
    /// exists (yet, or any more).
    async fn get_commit_timestamp(&self, start_ts: Timestamp) -> Result<Option<CommitTimestamp>>;

    /// Current low watermark; `Timestamp::ZERO` if never advanced.
    async fn read_low_watermark(&self) -> Result<Timestamp>;

    /// Retires the entry for a fully resolved transaction. Idempotent.
    async fn complete_transaction(&self, start_ts: Timestamp) -> Result<()>;

    /// Atomically invalidates `start_ts` if and only if no commit record
    /// exists for it. Returns true when the invalidation marker was written,
    /// false when a record was already present (too late to invalidate).
    async fn try_invalidate_transaction(&self, start_ts: Timestamp) -> Result<bool>;
}

/// A commit table hands out its two role views.
pub trait CommitTable: Send + Sync {
    fn writer(&self) -> Arc<dyn CommitTableWriter>;
    fn client(&self) -> Arc<dyn CommitTableClient>;
}
