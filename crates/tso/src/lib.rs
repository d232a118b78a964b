//! Timestamp authority boundary
//!
//! The timestamp authority (TSO) issues start and commit timestamps and
//! decides commit/abort. Its allocation algorithm and persistence are not
//! modeled here; this crate pins down the response protocol a transaction
//! manager observes, plus two in-process implementations:
//!
//! - `LocalTso`: a monotonic issuer for the non-failover fast path
//! - `ProgrammableTso`: a scripted double whose responses are queued up
//!   front by tests, including epoch-ambiguous commit grants

use async_trait::async_trait;
use centra_common::{Epoch, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Result type for authority operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced by authority clients
#[derive(Debug, Error)]
pub enum Error {
    /// The authority could not be reached.
    #[error("timestamp authority unavailable: {0}")]
    Unavailable(String),

    /// The authority answered something the protocol does not allow here,
    /// e.g. a commit grant for a different transaction.
    #[error("timestamp authority protocol error: {0}")]
    Protocol(String),
}

/// The authority's answer to a commit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitDecision {
    /// Commit granted at `commit_ts`. When `epoch_ambiguous` is set, a
    /// different incarnation may already have decided this transaction and
    /// the caller must reconcile against the commit table before trusting
    /// the grant.
    Granted {
        commit_ts: Timestamp,
        epoch_ambiguous: bool,
    },

    /// The transaction must roll back.
    Aborted,
}

/// Client view of the timestamp authority.
#[async_trait]
pub trait TimestampAuthority: Send + Sync {
    /// Allocates the start timestamp for a new transaction.
    async fn next_start_timestamp(&self) -> Result<Timestamp>;

    /// Asks the authority to commit the transaction that started at
    /// `start_ts`.
    async fn request_commit(&self, start_ts: Timestamp) -> Result<CommitDecision>;

    /// Epoch of the incarnation this client last spoke to.
    fn current_epoch(&self) -> Epoch;
}

/// In-process authority issuing monotonically increasing timestamps.
///
/// Grants every commit unconditionally; conflict detection on data rows is
/// not this crate's concern.
pub struct LocalTso {
    epoch: Epoch,
    next: AtomicU64,
}

impl LocalTso {
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            next: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl TimestampAuthority for LocalTso {
    async fn next_start_timestamp(&self) -> Result<Timestamp> {
        Ok(Timestamp::new(self.next.fetch_add(1, Ordering::SeqCst)))
    }

    async fn request_commit(&self, _start_ts: Timestamp) -> Result<CommitDecision> {
        Ok(CommitDecision::Granted {
            commit_ts: Timestamp::new(self.next.fetch_add(1, Ordering::SeqCst)),
            epoch_ambiguous: false,
        })
    }

    fn current_epoch(&self) -> Epoch {
        self.epoch
    }
}

/// One scripted authority response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedResponse {
    /// Answer to the next `next_start_timestamp` call.
    Timestamp(Timestamp),

    /// Answer to the next `request_commit` call for `start_ts`.
    Commit {
        start_ts: Timestamp,
        commit_ts: Timestamp,
        epoch_ambiguous: bool,
    },

    /// Abort answer to the next `request_commit` call for `start_ts`.
    Abort(Timestamp),
}

/// Scripted authority double.
///
/// Tests queue responses up front; each call consumes the next one and
/// fails loudly on a mismatch.
pub struct ProgrammableTso {
    epoch: Epoch,
    responses: Mutex<VecDeque<ScriptedResponse>>,
}

impl ProgrammableTso {
    pub fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            responses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn queue_response(&self, response: ScriptedResponse) {
        self.responses.lock().push_back(response);
    }

    pub fn clear_responses(&self) {
        self.responses.lock().clear();
    }

    fn next_response(&self) -> Result<ScriptedResponse> {
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| Error::Unavailable("no scripted response queued".to_string()))
    }
}

#[async_trait]
impl TimestampAuthority for ProgrammableTso {
    async fn next_start_timestamp(&self) -> Result<Timestamp> {
        match self.next_response()? {
            ScriptedResponse::Timestamp(ts) => Ok(ts),
            other => Err(Error::Protocol(format!(
                "expected timestamp response, got {:?}",
                other
            ))),
        }
    }

    async fn request_commit(&self, start_ts: Timestamp) -> Result<CommitDecision> {
        match self.next_response()? {
            ScriptedResponse::Commit {
                start_ts: scripted,
                commit_ts,
                epoch_ambiguous,
            } if scripted == start_ts => Ok(CommitDecision::Granted {
                commit_ts,
                epoch_ambiguous,
            }),
            ScriptedResponse::Abort(scripted) if scripted == start_ts => {
                Ok(CommitDecision::Aborted)
            }
            other => Err(Error::Protocol(format!(
                "scripted response {:?} does not match commit request for {}",
                other, start_ts
            ))),
        }
    }

    fn current_epoch(&self) -> Epoch {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_tso_issues_increasing_timestamps() {
        let tso = LocalTso::new(Epoch::new(1));

        let a = tso.next_start_timestamp().await.unwrap();
        let b = tso.next_start_timestamp().await.unwrap();
        assert!(a < b);

        let decision = tso.request_commit(b).await.unwrap();
        match decision {
            CommitDecision::Granted {
                commit_ts,
                epoch_ambiguous,
            } => {
                assert!(commit_ts > b);
                assert!(!epoch_ambiguous);
            }
            CommitDecision::Aborted => panic!("local tso never aborts"),
        }
    }

    #[tokio::test]
    async fn test_programmable_tso_replays_script() {
        let tso = ProgrammableTso::new(Epoch::new(2));
        tso.queue_response(ScriptedResponse::Timestamp(Timestamp::new(1)));
        tso.queue_response(ScriptedResponse::Commit {
            start_ts: Timestamp::new(1),
            commit_ts: Timestamp::new(2),
            epoch_ambiguous: true,
        });

        assert_eq!(
            tso.next_start_timestamp().await.unwrap(),
            Timestamp::new(1)
        );
        assert_eq!(
            tso.request_commit(Timestamp::new(1)).await.unwrap(),
            CommitDecision::Granted {
                commit_ts: Timestamp::new(2),
                epoch_ambiguous: true,
            }
        );
    }

    #[tokio::test]
    async fn test_programmable_tso_rejects_mismatched_script() {
        let tso = ProgrammableTso::new(Epoch::new(2));
        tso.queue_response(ScriptedResponse::Abort(Timestamp::new(7)));

        let err = tso.request_commit(Timestamp::new(1)).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_empty_script_reads_as_unavailable() {
        let tso = ProgrammableTso::new(Epoch::new(2));
        let err = tso.next_start_timestamp().await.unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
    }
}
