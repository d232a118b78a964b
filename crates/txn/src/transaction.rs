//! Per-transaction state machine

use centra_common::Timestamp;

/// Transaction lifecycle status. Transitions only move forward:
/// `Running` is initial, the other two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    Running,
    Committed,
    RolledBack,
}

/// One cell written by a transaction, remembered for post-outcome cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRef {
    pub table: String,
    pub row: Vec<u8>,
}

/// A transaction owned by the manager instance that created it.
///
/// Not shared across threads without explicit hand-off; the manager takes
/// `&mut` for every state transition.
#[derive(Debug)]
pub struct Transaction {
    start_ts: Timestamp,
    commit_ts: Timestamp,
    status: TxnStatus,
    write_set: Vec<CellRef>,
}

impl Transaction {
    pub(crate) fn new(start_ts: Timestamp) -> Self {
        Self {
            start_ts,
            commit_ts: Timestamp::ZERO,
            status: TxnStatus::Running,
            write_set: Vec::new(),
        }
    }

    /// The transaction's identity.
    pub fn start_timestamp(&self) -> Timestamp {
        self.start_ts
    }

    /// Assigned commit timestamp; `Timestamp::ZERO` unless committed.
    pub fn commit_timestamp(&self) -> Timestamp {
        self.commit_ts
    }

    pub fn status(&self) -> TxnStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TxnStatus::Running
    }

    /// Cells written so far, in write order.
    pub fn write_set(&self) -> &[CellRef] {
        &self.write_set
    }

    pub(crate) fn record_write(&mut self, cell: CellRef) {
        self.write_set.push(cell);
    }

    pub(crate) fn mark_committed(&mut self, commit_ts: Timestamp) {
        debug_assert!(self.is_running());
        self.commit_ts = commit_ts;
        self.status = TxnStatus::Committed;
    }

    pub(crate) fn mark_rolled_back(&mut self) {
        debug_assert!(self.is_running());
        self.status = TxnStatus::RolledBack;
    }
}
