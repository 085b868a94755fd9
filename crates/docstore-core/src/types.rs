//! Core data model: `Document`, `Head`, and the `Value` scalar sum type.
//!
//! `data` keys are stored in a `BTreeMap` rather than an insertion-ordered
//! map: the codec (crate `docstore-codec`) must be deterministic so that
//! `H = sha1_hex(encoded_body)` is stable across round-trips, and sorting by
//! key gives that for free without pulling in an ordered-map dependency.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A scalar or structured value stored under a `data` key.
///
/// Mirrors the seven shapes the wire codec understands (§4.A type tags
/// 0..=6). Anything else is rejected at ingestion with `Error::Validation`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Null,
    Int32(i32),
    Float64(f64),
    Bool(bool),
    Str(String),
    ListStr(Vec<String>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// The numeric representation used by range queries, or `None` if this
    /// value is not numeric. Integers are compared as floats by design.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(n) => Some(*n as f64),
            Value::Float64(f) => Some(*f),
            _ => None,
        }
    }

    /// The string representation used by equality queries, or `None` if
    /// this value is not a plain string.
    pub fn as_equality_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// The current (only retained) revision record of a document id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Head {
    pub rev: String,
    pub deleted: bool,
}

/// A self-describing document: a primary key, a revision marker, a
/// soft-delete flag, scalar/structured fields, a tag set, and optional
/// free-text content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub rev: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl Document {
    /// A document as the caller intends it to be written: no rev means "no
    /// optimistic-concurrency precondition" (fresh create, or force-follow
    /// an existing tombstone's rev on undelete).
    pub fn new(id: impl Into<String>) -> Self {
        Document {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn head(&self) -> Head {
        Head {
            rev: self.rev.clone(),
            deleted: self.deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_values_compare_as_f64() {
        assert_eq!(Value::Int32(3).as_f64(), Some(3.0));
        assert_eq!(Value::Float64(3.5).as_f64(), Some(3.5));
        assert_eq!(Value::Str("3".into()).as_f64(), None);
    }

    #[test]
    fn document_default_has_empty_rev() {
        let d = Document::new("x");
        assert_eq!(d.rev, "");
        assert!(!d.deleted);
    }
}
