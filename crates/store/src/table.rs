//! Store and table traits
//!
//! A `Store` hands out named tables. A table is a map from (row key,
//! qualifier) cells to byte values; qualifiers play the role of logical
//! column groups (a commit record next to a low-watermark singleton, or a
//! data version next to its shadow cell).

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// One buffered mutation, applied through `StoreTable::apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Put {
        key: Vec<u8>,
        qualifier: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        key: Vec<u8>,
        qualifier: Vec<u8>,
    },
}

/// A named table inside the external store.
///
/// Every method is a potentially blocking round trip; callers own their
/// retry budgets. `put_if_absent` must be atomic with respect to all other
/// writers of the same cell, including writers in other processes — this is
/// the store capability the whole commit/invalidate race rests on.
#[async_trait]
pub trait StoreTable: Send + Sync {
    /// Point lookup of a single cell.
    async fn get(&self, key: &[u8], qualifier: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Unconditional write of a single cell.
    async fn put(&self, key: &[u8], qualifier: &[u8], value: Vec<u8>) -> Result<()>;

    /// Writes the cell only if it is currently absent. Returns true if the
    /// write happened, false if another value was already present.
    async fn put_if_absent(&self, key: &[u8], qualifier: &[u8], value: Vec<u8>) -> Result<bool>;

    /// Removes a single cell. Removing an absent cell is not an error.
    async fn delete(&self, key: &[u8], qualifier: &[u8]) -> Result<()>;

    /// Applies a batch of mutations. The batch becomes visible as a whole:
    /// readers never observe a prefix of it.
    async fn apply(&self, batch: Vec<WriteOp>) -> Result<()>;

    /// All cells under the given qualifier, in key order.
    async fn scan(&self, qualifier: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// Handle to the external store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens (creating if necessary) a named table.
    async fn table(&self, name: &str) -> Result<Arc<dyn StoreTable>>;
}
