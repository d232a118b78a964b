//! Store-backed commit table
//!
//! Layout inside one store table:
//! - commit records under the `commit` qualifier, keyed by the start
//!   timestamp's big-endian bytes; the value is the commit timestamp, or the
//!   invalidation sentinel
//! - the low watermark as a singleton row under the `lwm` qualifier
//!
//! Both the writer's flushed commit records and the client's invalidation
//! markers go through `put_if_absent` on the same cell, which is what makes
//! the two outcomes mutually exclusive per start timestamp.

use crate::error::{Error, Result};
use crate::{
    CommitLocation, CommitTable, CommitTableClient, CommitTableWriter, CommitTimestamp,
    INVALID_COMMIT_MARKER,
};
use async_trait::async_trait;
use centra_common::Timestamp;
use centra_store::{Decode, Encode, RetryConfig, Store, StoreTable, with_retries};
use parking_lot::Mutex;
use std::sync::Arc;

const COMMIT_QUALIFIER: &[u8] = b"commit";
const WATERMARK_QUALIFIER: &[u8] = b"lwm";
const WATERMARK_KEY: &[u8] = b"__low_watermark";

/// Commit table adapter over one store table.
pub struct StoreCommitTable {
    table: Arc<dyn StoreTable>,
    retry: RetryConfig,
}

impl StoreCommitTable {
    /// Opens the ledger inside the given store with the default retry budget.
    pub async fn open(store: &dyn Store, name: &str) -> Result<Self> {
        Self::open_with_retry(store, name, RetryConfig::default()).await
    }

    pub async fn open_with_retry(
        store: &dyn Store,
        name: &str,
        retry: RetryConfig,
    ) -> Result<Self> {
        let table = store.table(name).await?;
        Ok(Self { table, retry })
    }
}

impl CommitTable for StoreCommitTable {
    fn writer(&self) -> Arc<dyn CommitTableWriter> {
        Arc::new(StoreWriter {
            table: self.table.clone(),
            retry: self.retry,
            buffer: Mutex::new(WriteBuffer::default()),
            flush_guard: tokio::sync::Mutex::new(()),
        })
    }

    fn client(&self) -> Arc<dyn CommitTableClient> {
        Arc::new(StoreClient {
            table: self.table.clone(),
            retry: self.retry,
        })
    }
}

#[derive(Default)]
struct WriteBuffer {
    committed: Vec<(Timestamp, Timestamp)>,
    low_watermark: Option<Timestamp>,
}

impl WriteBuffer {
    fn is_empty(&self) -> bool {
        self.committed.is_empty() && self.low_watermark.is_none()
    }

    fn take(&mut self) -> WriteBuffer {
        std::mem::take(self)
    }

    /// Puts staged writes back after a failed flush, ahead of anything
    /// buffered in the meantime.
    fn merge_back(&mut self, mut staged: WriteBuffer) {
        staged.committed.append(&mut self.committed);
        self.committed = staged.committed;
        self.low_watermark = match (staged.low_watermark, self.low_watermark) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }
}

struct StoreWriter {
    table: Arc<dyn StoreTable>,
    retry: RetryConfig,
    buffer: Mutex<WriteBuffer>,
    /// At most one flush in flight per writer.
    flush_guard: tokio::sync::Mutex<()>,
}

impl StoreWriter {
    async fn apply_staged(&self, staged: &WriteBuffer) -> Result<()> {
        for &(start_ts, commit_ts) in &staged.committed {
            let key = start_ts.to_bytes();
            let value = commit_ts.encode()?;
            let written = with_retries(&self.retry, "commit table append", || {
                self.table.put_if_absent(&key, COMMIT_QUALIFIER, value.clone())
            })
            .await?;
            if !written {
                // A racing invalidator (or an earlier flush) got there first.
                tracing::warn!(
                    "transaction {} already decided, dropping buffered commit record",
                    start_ts
                );
            }
        }

        if let Some(lwm) = staged.low_watermark {
            self.persist_low_watermark(lwm).await?;
        }
        Ok(())
    }

    async fn persist_low_watermark(&self, lwm: Timestamp) -> Result<()> {
        let current = with_retries(&self.retry, "low watermark read", || {
            self.table.get(WATERMARK_KEY, WATERMARK_QUALIFIER)
        })
        .await?;

        if let Some(bytes) = current {
            let stored = Timestamp::decode(&bytes)?;
            if stored >= lwm {
                return Ok(());
            }
        }

        let value = lwm.encode()?;
        with_retries(&self.retry, "low watermark write", || {
            self.table.put(WATERMARK_KEY, WATERMARK_QUALIFIER, value.clone())
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CommitTableWriter for StoreWriter {
    async fn add_committed_transaction(
        &self,
        start_ts: Timestamp,
        commit_ts: Timestamp,
    ) -> Result<()> {
        if commit_ts == INVALID_COMMIT_MARKER {
            return Err(Error::Corrupt(format!(
                "commit timestamp {} is reserved for invalidation",
                commit_ts
            )));
        }
        self.buffer.lock().committed.push((start_ts, commit_ts));
        Ok(())
    }

    async fn update_low_watermark(&self, low_watermark: Timestamp) -> Result<()> {
        let mut buffer = self.buffer.lock();
        buffer.low_watermark = Some(match buffer.low_watermark {
            Some(buffered) => buffered.max(low_watermark),
            None => low_watermark,
        });
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        let _in_flight = self.flush_guard.lock().await;

        let staged = self.buffer.lock().take();
        if staged.is_empty() {
            return Ok(());
        }

        match self.apply_staged(&staged).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Keep the staged writes so a retried flush re-applies the
                // whole set; put_if_absent makes re-application idempotent.
                self.buffer.lock().merge_back(staged);
                Err(e)
            }
        }
    }

    fn clear_write_buffer(&self) {
        *self.buffer.lock() = WriteBuffer::default();
    }
}

struct StoreClient {
    table: Arc<dyn StoreTable>,
    retry: RetryConfig,
}

#[async_trait]
impl CommitTableClient for StoreClient {
    async fn get_commit_timestamp(&self, start_ts: Timestamp) -> Result<Option<CommitTimestamp>> {
        let key = start_ts.to_bytes();
        let raw = with_retries(&self.retry, "commit table lookup", || {
            self.table.get(&key, COMMIT_QUALIFIER)
        })
        .await?;

        match raw {
            None => Ok(None),
            Some(bytes) => {
                let stored = Timestamp::decode(&bytes)?;
                if stored == INVALID_COMMIT_MARKER {
                    Ok(Some(CommitTimestamp::invalidated(CommitLocation::CommitTable)))
                } else {
                    Ok(Some(CommitTimestamp::committed(
                        CommitLocation::CommitTable,
                        stored,
                    )))
                }
            }
        }
    }

    async fn read_low_watermark(&self) -> Result<Timestamp> {
        let raw = with_retries(&self.retry, "low watermark read", || {
            self.table.get(WATERMARK_KEY, WATERMARK_QUALIFIER)
        })
        .await?;

        match raw {
            None => Ok(Timestamp::ZERO),
            Some(bytes) => Ok(Timestamp::decode(&bytes)?),
        }
    }

    async fn complete_transaction(&self, start_ts: Timestamp) -> Result<()> {
        let key = start_ts.to_bytes();
        with_retries(&self.retry, "commit table retire", || {
            self.table.delete(&key, COMMIT_QUALIFIER)
        })
        .await?;
        Ok(())
    }

    async fn try_invalidate_transaction(&self, start_ts: Timestamp) -> Result<bool> {
        let key = start_ts.to_bytes();
        let marker = INVALID_COMMIT_MARKER.encode()?;
        let invalidated = with_retries(&self.retry, "commit table invalidate", || {
            self.table.put_if_absent(&key, COMMIT_QUALIFIER, marker.clone())
        })
        .await?;

        if invalidated {
            tracing::debug!("invalidated in-flight transaction {}", start_ts);
        }
        Ok(invalidated)
    }
}
