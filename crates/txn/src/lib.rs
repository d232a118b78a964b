//! Snapshot-isolation transaction manager
//!
//! Drives the transaction lifecycle against a timestamp authority and the
//! shared commit table:
//!
//! 1. `begin` obtains a start timestamp from the authority
//! 2. the caller writes data rows, tagged with the start timestamp
//! 3. `commit` asks the authority for a commit timestamp
//!
//! On a plain grant or abort the authority's answer is final. On an
//! epoch-ambiguous grant — the authority signals that a different
//! incarnation may already have decided this transaction — the manager
//! reconciles against the commit table: it discovers, never decides, which
//! of the commit record and the invalidation marker won the race there.

mod error;
mod manager;
mod rows;
mod transaction;

pub use error::{Error, Result};
pub use manager::TransactionManager;
pub use rows::{DataRowLayer, StoreRows, TxnTable};
pub use transaction::{CellRef, Transaction, TxnStatus};
