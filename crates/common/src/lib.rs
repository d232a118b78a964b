//! Common types for the centra transaction stack
//!
//! This crate defines:
//! - `Timestamp`: the logical timestamp issued by the timestamp authority,
//!   used both as transaction identity (start timestamp) and as commit order
//! - `Epoch`: the incarnation counter of the timestamp authority

mod epoch;
mod timestamp;

pub use epoch::Epoch;
pub use timestamp::Timestamp;
