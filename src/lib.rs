//! # docstore
//!
//! Public facade over the DocStore workspace: an embedded, log-structured
//! document database with revision-tracked documents and three secondary
//! indexes (equality/range, tags, full-text).
//!
//! Most embedders only need [`DocStore`] plus [`Config`]/[`DurabilityLevel`]
//! from `docstore-core`. The [`adapters`] module holds the two boundary
//! codecs (§6.3) that sit outside the core TLV format.

pub mod adapters;

pub use docstore_core::{Config, DurabilityLevel, Document, Error, Head, Result, Value};
pub use docstore_engine::{DurableDocumentService, RecoveryReport};
pub use docstore_router::{shard_of, HashAlgorithm, ShardRouter};

/// Alias for the engine's single public type — most callers just want "the
/// database", not "the durable document service".
pub type DocStore = DurableDocumentService;
