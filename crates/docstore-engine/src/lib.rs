//! # docstore-engine
//!
//! The Durable Document Service (§4.F): composes `docstore-storage`'s
//! in-memory store with `docstore-durability`'s WAL and snapshot manager,
//! one of each per database, behind a single reader-writer lock over the
//! whole database map (§5).

mod recovery;
mod service;

/// Every per-database store only ever knows about one database, addressed
/// internally under this fixed key (the durable service itself keys by
/// database name one level up, in its own database map).
pub(crate) const SELF_KEY: &str = "db";

pub use recovery::RecoveryReport;
pub use service::DurableDocumentService;
