//! Error types for the transaction manager

use centra_common::Timestamp;
use thiserror::Error;

/// Result type for transaction manager operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced to callers of the transaction manager
#[derive(Debug, Error)]
pub enum Error {
    /// The transaction did not commit. Expected and recoverable: retry the
    /// whole transaction. Uncommitted row versions were cleaned up before
    /// this was surfaced.
    #[error("transaction {0} rolled back")]
    Rollback(Timestamp),

    /// Reconciliation could not establish whether the transaction committed.
    /// Never a silent commit or rollback; the caller retries reconciliation
    /// later with the same start timestamp or escalates.
    #[error("cannot determine outcome of transaction {start_ts}")]
    Indeterminate { start_ts: Timestamp },

    /// The data-row layer or store was unreachable after the retry budget.
    #[error("storage unavailable: {0}")]
    Storage(#[from] centra_store::Error),

    /// The commit table was unreachable or corrupt outside reconciliation.
    #[error("commit table error: {0}")]
    CommitTable(#[from] centra_commit_table::Error),

    /// The timestamp authority request failed.
    #[error("timestamp authority error: {0}")]
    Authority(#[from] centra_tso::Error),

    /// Caller misuse: committing or rolling back a transaction that is
    /// already terminal. A programming error, never retried.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}
