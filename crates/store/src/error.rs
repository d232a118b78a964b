//! Error types for the store boundary

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced by store adapters
#[derive(Debug, Error)]
pub enum Error {
    /// The backend rejected or failed an operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The backend could not be reached at all.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<fjall::Error> for Error {
    fn from(e: fjall::Error) -> Self {
        Error::Backend(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Unavailable(e.to_string())
    }
}
