//! Key-value store boundary for the centra transaction stack
//!
//! The commit table and the data-row layer both live on top of an external
//! key-value store. This crate pins down the narrow surface they consume:
//! named tables with cell-level get/put/scan plus a conditional write
//! (`put_if_absent`), which is the serialization point for the
//! commit-vs-invalidate race.
//!
//! Two adapters are provided:
//! - `MemoryStore`: in-process tables behind a mutex, for tests and
//!   single-node setups
//! - `FjallStore`: persistent tables, one fjall partition per table

pub mod config;
pub mod disk;
pub mod encoding;
pub mod error;
pub mod memory;
pub mod retry;
pub mod table;

pub use config::StoreConfig;
pub use disk::FjallStore;
pub use encoding::{Decode, Encode};
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use retry::{RetryConfig, with_retries};
pub use table::{Store, StoreTable, WriteOp};
