//! Transaction manager: begin/commit/rollback and failover reconciliation
//!
//! The commit path has three branches, keyed off the authority's answer:
//!
//! - plain grant: the authority is the source of truth, commit locally and
//!   clean up asynchronously
//! - plain abort: roll back, delete uncommitted versions, surface the
//!   rollback signal
//! - epoch-ambiguous grant: a different authority incarnation may already
//!   have decided this transaction, so ground truth lives in the commit
//!   table. The manager looks the transaction up and, if no record exists,
//!   races the old incarnation's writer with `try_invalidate_transaction`.
//!   Whichever of the commit record and the invalidation marker became
//!   durable first wins; the manager only discovers the winner.
//!
//! When reconciliation cannot reach an answer — the commit table is
//! unreachable, or the lost race is not observable on re-read — the manager
//! surfaces `Indeterminate` and leaves the transaction `Running` rather
//! than guessing either way.

use crate::error::{Error, Result};
use crate::rows::DataRowLayer;
use crate::transaction::Transaction;
use centra_commit_table::CommitTableClient;
use centra_common::Timestamp;
use centra_tso::{CommitDecision, TimestampAuthority};
use std::sync::Arc;

/// Drives transaction lifecycles for one client.
///
/// Multiple manager instances, across processes and authority incarnations,
/// may operate against the same commit table; each transaction is owned by
/// the manager that began it.
pub struct TransactionManager {
    tso: Arc<dyn TimestampAuthority>,
    commit_table: Arc<dyn CommitTableClient>,
    rows: Arc<dyn DataRowLayer>,
}

impl TransactionManager {
    pub fn new(
        tso: Arc<dyn TimestampAuthority>,
        commit_table: Arc<dyn CommitTableClient>,
        rows: Arc<dyn DataRowLayer>,
    ) -> Self {
        Self {
            tso,
            commit_table,
            rows,
        }
    }

    /// Starts a new transaction.
    pub async fn begin(&self) -> Result<Transaction> {
        let start_ts = self.tso.next_start_timestamp().await?;
        tracing::debug!("began transaction {}", start_ts);
        Ok(Transaction::new(start_ts))
    }

    /// Commits the transaction, returning its commit timestamp.
    ///
    /// Surfaces `Error::Rollback` when the transaction did not commit and
    /// `Error::Indeterminate` when failover reconciliation could not
    /// establish the outcome; in the latter case the transaction stays
    /// `Running` and the caller may retry reconciliation later.
    pub async fn commit(&self, tx: &mut Transaction) -> Result<Timestamp> {
        if !tx.is_running() {
            return Err(Error::ProtocolViolation(format!(
                "cannot commit transaction {} in state {:?}",
                tx.start_timestamp(),
                tx.status()
            )));
        }

        let start_ts = tx.start_timestamp();
        let decision = self.tso.request_commit(start_ts).await?;

        match decision {
            CommitDecision::Granted {
                commit_ts,
                epoch_ambiguous: false,
            } => {
                // Fast path: the authority alone decides, and the commit
                // table entry can be retired once shadow cells are marked.
                self.finish_commit(tx, commit_ts, true);
                Ok(commit_ts)
            }
            CommitDecision::Granted {
                epoch_ambiguous: true,
                ..
            } => {
                tracing::info!(
                    "epoch-ambiguous grant for {} ({}), reconciling against commit table",
                    start_ts,
                    self.tso.current_epoch()
                );
                self.reconcile(tx).await
            }
            CommitDecision::Aborted => {
                self.finish_rollback(tx).await?;
                Err(Error::Rollback(start_ts))
            }
        }
    }

    /// Rolls the transaction back explicitly.
    pub async fn rollback(&self, tx: &mut Transaction) -> Result<()> {
        if !tx.is_running() {
            return Err(Error::ProtocolViolation(format!(
                "cannot roll back transaction {} in state {:?}",
                tx.start_timestamp(),
                tx.status()
            )));
        }
        self.finish_rollback(tx).await
    }

    /// Resolves an epoch-ambiguous grant against the commit table.
    async fn reconcile(&self, tx: &mut Transaction) -> Result<Timestamp> {
        let start_ts = tx.start_timestamp();

        let first = match self.commit_table.get_commit_timestamp(start_ts).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("commit table unreachable while reconciling {}: {}", start_ts, e);
                return Err(Error::Indeterminate { start_ts });
            }
        };

        match first {
            Some(entry) if entry.is_valid => {
                tracing::info!(
                    "adopting commit decided by previous incarnation: {} -> {}",
                    start_ts,
                    entry.value
                );
                // The record stays in the commit table so future lookups
                // remain answerable.
                self.finish_commit(tx, entry.value, false);
                Ok(entry.value)
            }
            Some(_) => {
                tracing::info!("transaction {} was invalidated, rolling back", start_ts);
                self.finish_rollback(tx).await?;
                Err(Error::Rollback(start_ts))
            }
            None => match self.commit_table.try_invalidate_transaction(start_ts).await {
                Ok(true) => {
                    tracing::info!("invalidated in-flight transaction {}, rolling back", start_ts);
                    self.finish_rollback(tx).await?;
                    Err(Error::Rollback(start_ts))
                }
                Ok(false) => self.adopt_racing_commit(tx).await,
                Err(e) => {
                    tracing::warn!("invalidation of {} failed: {}", start_ts, e);
                    Err(Error::Indeterminate { start_ts })
                }
            },
        }
    }

    /// Lost the invalidation race: the previous incarnation's writer got its
    /// commit record in first. The re-read must observe it.
    async fn adopt_racing_commit(&self, tx: &mut Transaction) -> Result<Timestamp> {
        let start_ts = tx.start_timestamp();

        let second = match self.commit_table.get_commit_timestamp(start_ts).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("re-read after lost race failed for {}: {}", start_ts, e);
                return Err(Error::Indeterminate { start_ts });
            }
        };

        match second {
            Some(entry) if entry.is_valid => {
                tracing::info!(
                    "lost invalidation race for {}, adopting commit at {}",
                    start_ts,
                    entry.value
                );
                self.finish_commit(tx, entry.value, false);
                Ok(entry.value)
            }
            Some(_) => {
                self.finish_rollback(tx).await?;
                Err(Error::Rollback(start_ts))
            }
            None => {
                // Losing the race guarantees a record exists; not seeing one
                // means the read was not consistent with the racing write.
                tracing::warn!(
                    "no commit record visible for {} after lost invalidation race",
                    start_ts
                );
                Err(Error::Indeterminate { start_ts })
            }
        }
    }

    /// Marks the transaction committed and kicks off post-commit cleanup
    /// without blocking the caller. `retire` additionally removes the
    /// commit table entry once shadow cells are durable.
    fn finish_commit(&self, tx: &mut Transaction, commit_ts: Timestamp, retire: bool) {
        tx.mark_committed(commit_ts);

        let start_ts = tx.start_timestamp();
        let writes = tx.write_set().to_vec();
        let rows = self.rows.clone();
        let commit_table = self.commit_table.clone();

        tokio::spawn(async move {
            if let Err(e) = rows.mark_committed(&writes, start_ts, commit_ts).await {
                tracing::warn!("shadow cell update for {} failed: {}", start_ts, e);
                return;
            }
            if retire
                && let Err(e) = commit_table.complete_transaction(start_ts).await
            {
                tracing::warn!("commit table retirement for {} failed: {}", start_ts, e);
            }
        });
    }

    /// Deletes the transaction's uncommitted row versions, then marks it
    /// rolled back. Cleanup runs before the rollback is surfaced.
    async fn finish_rollback(&self, tx: &mut Transaction) -> Result<()> {
        let start_ts = tx.start_timestamp();
        self.rows
            .delete_uncommitted(tx.write_set(), start_ts)
            .await?;
        tx.mark_rolled_back();
        tracing::debug!("rolled back transaction {}", start_ts);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{StoreRows, TxnTable};
    use crate::transaction::TxnStatus;
    use centra_commit_table::{CommitTable, StoreCommitTable};
    use centra_common::Epoch;
    use centra_store::MemoryStore;
    use centra_tso::LocalTso;
    use std::time::Duration;

    const TABLE: &str = "test_table";

    async fn setup() -> (TransactionManager, TxnTable, Arc<dyn CommitTableClient>) {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let commit_table =
            StoreCommitTable::open(store.as_ref(), centra_commit_table::DEFAULT_TABLE_NAME)
                .await
                .unwrap();
        let client = commit_table.client();
        let table = TxnTable::open(store.as_ref(), TABLE).await.unwrap();
        let rows = Arc::new(StoreRows::new(store.clone()));
        let tso = Arc::new(LocalTso::new(Epoch::new(1)));

        let manager = TransactionManager::new(tso, client.clone(), rows);
        (manager, table, client)
    }

    #[tokio::test]
    async fn test_fast_path_commit() {
        let (manager, table, client) = setup().await;

        let mut tx = manager.begin().await.unwrap();
        let start_ts = tx.start_timestamp();
        table.put(&mut tx, b"row1", b"data".to_vec()).await.unwrap();

        let commit_ts = manager.commit(&mut tx).await.unwrap();

        assert_eq!(tx.status(), TxnStatus::Committed);
        assert!(commit_ts > start_ts);
        assert_eq!(tx.commit_timestamp(), commit_ts);

        // Version survives; shadow cell and commit-table retirement happen
        // asynchronously.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            table.read_version(b"row1", start_ts).await.unwrap(),
            Some(b"data".to_vec())
        );
        assert_eq!(
            table.read_shadow(b"row1", start_ts).await.unwrap(),
            Some(commit_ts)
        );
        assert_eq!(client.get_commit_timestamp(start_ts).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_explicit_rollback_deletes_versions() {
        let (manager, table, _client) = setup().await;

        let mut tx = manager.begin().await.unwrap();
        let start_ts = tx.start_timestamp();
        table.put(&mut tx, b"row1", b"data".to_vec()).await.unwrap();

        manager.rollback(&mut tx).await.unwrap();

        assert_eq!(tx.status(), TxnStatus::RolledBack);
        assert_eq!(tx.commit_timestamp(), Timestamp::ZERO);
        assert_eq!(table.read_version(b"row1", start_ts).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_commit_twice_is_a_protocol_violation() {
        let (manager, _table, _client) = setup().await;

        let mut tx = manager.begin().await.unwrap();
        manager.commit(&mut tx).await.unwrap();

        let second = manager.commit(&mut tx).await;
        assert!(matches!(second, Err(Error::ProtocolViolation(_))));
    }

    #[tokio::test]
    async fn test_rollback_after_commit_is_a_protocol_violation() {
        let (manager, _table, _client) = setup().await;

        let mut tx = manager.begin().await.unwrap();
        manager.commit(&mut tx).await.unwrap();

        let result = manager.rollback(&mut tx).await;
        assert!(matches!(result, Err(Error::ProtocolViolation(_))));
    }
}
