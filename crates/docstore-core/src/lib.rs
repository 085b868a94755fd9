//! # docstore-core
//!
//! Shared data model and error surface for the DocStore engine: the
//! `Document`/`Head`/`Value` types, the unified `Error` enum, and engine
//! configuration. Every other crate in the workspace depends on this one.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, DurabilityLevel};
pub use error::{Error, Result};
pub use types::{Document, Head, Value};
