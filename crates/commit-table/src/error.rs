//! Error types for the commit table

use thiserror::Error;

/// Result type for commit table operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced by commit table roles
#[derive(Debug, Error)]
pub enum Error {
    /// The backing store failed or was unreachable after the retry budget.
    #[error("commit table storage error: {0}")]
    Storage(#[from] centra_store::Error),

    /// A stored entry violated the ledger's encoding.
    #[error("corrupt commit table entry: {0}")]
    Corrupt(String),
}

impl Error {
    /// Convenience constructor for test doubles simulating outages.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Error::Storage(centra_store::Error::Unavailable(msg.into()))
    }
}
