//! # docstore-durability
//!
//! The Write-Ahead Log (§4.D) and Snapshot Manager (§4.E): the two durable
//! artifacts the engine composes into crash-recoverable per-database
//! storage (crate `docstore-engine`).

pub mod snapshot;
pub mod wal;

pub use snapshot::{Manifest, SnapshotManager};
pub use wal::{Wal, WalOp, WalRecord};
