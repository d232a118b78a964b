//! Data-row access layer
//!
//! Data writes are versioned: each cell a transaction writes lands under a
//! qualifier carrying the owning start timestamp, and the matching shadow
//! cell records the commit timestamp once the outcome is known. The manager
//! consumes this layer only for post-outcome cleanup — deleting uncommitted
//! versions on rollback, marking shadow cells on commit. Conflict detection
//! on data rows happens elsewhere.

use crate::error::Result;
use crate::transaction::{CellRef, Transaction};
use crate::{Error, TxnStatus};
use async_trait::async_trait;
use centra_common::Timestamp;
use centra_store::{Decode, RetryConfig, Store, StoreTable, with_retries};
use std::sync::Arc;

fn version_qualifier(start_ts: Timestamp) -> Vec<u8> {
    let mut q = Vec::with_capacity(9);
    q.push(b'v');
    q.extend_from_slice(&start_ts.to_bytes());
    q
}

fn shadow_qualifier(start_ts: Timestamp) -> Vec<u8> {
    let mut q = Vec::with_capacity(9);
    q.push(b's');
    q.extend_from_slice(&start_ts.to_bytes());
    q
}

/// Transactional view of one data table, used by callers to issue writes
/// between `begin` and `commit`.
pub struct TxnTable {
    name: String,
    table: Arc<dyn StoreTable>,
}

impl TxnTable {
    pub async fn open(store: &dyn Store, name: &str) -> Result<Self> {
        let table = store.table(name).await?;
        Ok(Self {
            name: name.to_string(),
            table,
        })
    }

    /// Writes a versioned cell tagged with the transaction's start
    /// timestamp and records it in the write set.
    pub async fn put(&self, tx: &mut Transaction, row: &[u8], value: Vec<u8>) -> Result<()> {
        if tx.status() != TxnStatus::Running {
            return Err(Error::ProtocolViolation(format!(
                "cannot write in state {:?}",
                tx.status()
            )));
        }

        self.table
            .put(row, &version_qualifier(tx.start_timestamp()), value)
            .await?;
        tx.record_write(CellRef {
            table: self.name.clone(),
            row: row.to_vec(),
        });
        Ok(())
    }

    /// The version a given transaction wrote for a row, if still present.
    pub async fn read_version(&self, row: &[u8], start_ts: Timestamp) -> Result<Option<Vec<u8>>> {
        Ok(self.table.get(row, &version_qualifier(start_ts)).await?)
    }

    /// The shadow cell for a row version: the commit timestamp of the
    /// writing transaction, once cleanup has marked it.
    pub async fn read_shadow(&self, row: &[u8], start_ts: Timestamp) -> Result<Option<Timestamp>> {
        match self.table.get(row, &shadow_qualifier(start_ts)).await? {
            None => Ok(None),
            Some(bytes) => Ok(Some(Timestamp::decode(&bytes)?)),
        }
    }
}

/// Cleanup interface the manager drives once a transaction's outcome is
/// known.
#[async_trait]
pub trait DataRowLayer: Send + Sync {
    /// Marks every written cell's shadow cell with the commit timestamp.
    async fn mark_committed(
        &self,
        writes: &[CellRef],
        start_ts: Timestamp,
        commit_ts: Timestamp,
    ) -> Result<()>;

    /// Deletes the uncommitted versions a rolled-back transaction wrote.
    async fn delete_uncommitted(&self, writes: &[CellRef], start_ts: Timestamp) -> Result<()>;
}

/// Data-row layer over the external store, resolving tables by name.
pub struct StoreRows {
    store: Arc<dyn Store>,
    retry: RetryConfig,
}

impl StoreRows {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl DataRowLayer for StoreRows {
    async fn mark_committed(
        &self,
        writes: &[CellRef],
        start_ts: Timestamp,
        commit_ts: Timestamp,
    ) -> Result<()> {
        let shadow = shadow_qualifier(start_ts);
        let value = commit_ts.to_bytes().to_vec();
        for cell in writes {
            let table = self.store.table(&cell.table).await?;
            with_retries(&self.retry, "shadow cell write", || {
                table.put(&cell.row, &shadow, value.clone())
            })
            .await?;
        }
        Ok(())
    }

    async fn delete_uncommitted(&self, writes: &[CellRef], start_ts: Timestamp) -> Result<()> {
        let version = version_qualifier(start_ts);
        for cell in writes {
            let table = self.store.table(&cell.table).await?;
            with_retries(&self.retry, "uncommitted version delete", || {
                table.delete(&cell.row, &version)
            })
            .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use centra_store::MemoryStore;

    #[tokio::test]
    async fn test_put_records_write_and_versions_cell() {
        let store = Arc::new(MemoryStore::new());
        let table = TxnTable::open(store.as_ref(), "t").await.unwrap();
        let mut tx = Transaction::new(Timestamp::new(1));

        table.put(&mut tx, b"row1", b"data".to_vec()).await.unwrap();

        assert_eq!(tx.write_set().len(), 1);
        assert_eq!(
            table.read_version(b"row1", Timestamp::new(1)).await.unwrap(),
            Some(b"data".to_vec())
        );
        // No shadow cell until the outcome is known.
        assert_eq!(
            table.read_shadow(b"row1", Timestamp::new(1)).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_cleanup_deletes_only_this_transactions_versions() {
        let store = Arc::new(MemoryStore::new());
        let table = TxnTable::open(store.as_ref(), "t").await.unwrap();
        let rows = StoreRows::new(store.clone());

        let mut tx1 = Transaction::new(Timestamp::new(1));
        let mut tx2 = Transaction::new(Timestamp::new(5));
        table.put(&mut tx1, b"row1", b"a".to_vec()).await.unwrap();
        table.put(&mut tx2, b"row1", b"b".to_vec()).await.unwrap();

        rows.delete_uncommitted(tx1.write_set(), Timestamp::new(1))
            .await
            .unwrap();

        assert_eq!(
            table.read_version(b"row1", Timestamp::new(1)).await.unwrap(),
            None
        );
        assert_eq!(
            table.read_version(b"row1", Timestamp::new(5)).await.unwrap(),
            Some(b"b".to_vec())
        );
    }

    #[tokio::test]
    async fn test_mark_committed_writes_shadow_cells() {
        let store = Arc::new(MemoryStore::new());
        let table = TxnTable::open(store.as_ref(), "t").await.unwrap();
        let rows = StoreRows::new(store.clone());

        let mut tx = Transaction::new(Timestamp::new(1));
        table.put(&mut tx, b"row1", b"a".to_vec()).await.unwrap();

        rows.mark_committed(tx.write_set(), Timestamp::new(1), Timestamp::new(2))
            .await
            .unwrap();

        assert_eq!(
            table.read_shadow(b"row1", Timestamp::new(1)).await.unwrap(),
            Some(Timestamp::new(2))
        );
    }

    #[tokio::test]
    async fn test_put_rejected_on_terminal_transaction() {
        let store = Arc::new(MemoryStore::new());
        let table = TxnTable::open(store.as_ref(), "t").await.unwrap();

        let mut tx = Transaction::new(Timestamp::new(1));
        tx.mark_rolled_back();

        let result = table.put(&mut tx, b"row1", b"a".to_vec()).await;
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));
    }
}
