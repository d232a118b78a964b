//! Shared test doubles for failover scenarios

use async_trait::async_trait;
use centra_commit_table::{CommitTableClient, CommitTimestamp};
use centra_common::Timestamp;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Commit table client whose lookup and invalidation answers can be scripted
/// per call. Calls with no scripted answer fall through to the real client,
/// so a test only scripts the steps it wants to distort.
pub struct ScriptedCommitTableClient {
    inner: Arc<dyn CommitTableClient>,
    lookups: Mutex<VecDeque<centra_commit_table::Result<Option<CommitTimestamp>>>>,
    invalidations: Mutex<VecDeque<centra_commit_table::Result<bool>>>,
}

impl ScriptedCommitTableClient {
    pub fn new(inner: Arc<dyn CommitTableClient>) -> Self {
        Self {
            inner,
            lookups: Mutex::new(VecDeque::new()),
            invalidations: Mutex::new(VecDeque::new()),
        }
    }

    pub fn queue_lookup(&self, response: centra_commit_table::Result<Option<CommitTimestamp>>) {
        self.lookups.lock().push_back(response);
    }

    pub fn queue_invalidation(&self, response: centra_commit_table::Result<bool>) {
        self.invalidations.lock().push_back(response);
    }
}

#[async_trait]
impl CommitTableClient for ScriptedCommitTableClient {
    async fn get_commit_timestamp(
        &self,
        start_ts: Timestamp,
    ) -> centra_commit_table::Result<Option<CommitTimestamp>> {
        let scripted = self.lookups.lock().pop_front();
        match scripted {
            Some(scripted) => scripted,
            None => self.inner.get_commit_timestamp(start_ts).await,
        }
    }

    async fn read_low_watermark(&self) -> centra_commit_table::Result<Timestamp> {
        self.inner.read_low_watermark().await
    }

    async fn complete_transaction(&self, start_ts: Timestamp) -> centra_commit_table::Result<()> {
        self.inner.complete_transaction(start_ts).await
    }

    async fn try_invalidate_transaction(
        &self,
        start_ts: Timestamp,
    ) -> centra_commit_table::Result<bool> {
        let scripted = self.invalidations.lock().pop_front();
        match scripted {
            Some(scripted) => scripted,
            None => self.inner.try_invalidate_transaction(start_ts).await,
        }
    }
}
