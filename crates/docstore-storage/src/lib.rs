//! # docstore-storage
//!
//! The In-Memory Store (§4.C): per-database heads, document bodies, the
//! `seq` counter, and the three secondary indexes (§3), plus every
//! operation in the durable service's outward contract.

pub mod index;
pub mod stats;
pub mod store;

pub use stats::DbStats;
pub use store::{Equals, InMemoryStore, NumericRange, MAX_LIMIT};
