//! The three secondary indexes maintained per database (§3 Indexes).
//!
//! Index mutation is always computed as a delta (remove the old body's
//! entries, then add the new body's entries) and applied in one pass with
//! no interleaved reads, so callers never observe a partially updated
//! index (§9 "Observable-atomicity of index updates").

use docstore_core::types::{Document, Value};
use std::collections::{HashMap, HashSet};

/// Equality/range index for one `data` field: a `value -> ids` map for
/// string equality, plus an ordered `(numeric_value, id)` list for range
/// queries. `NaN` values are never inserted here — they would never match
/// a range query (total order excludes NaN), so omitting them from the
/// ordered list is observably identical to indexing and always skipping
/// them, and avoids corrupting the sort order.
#[derive(Debug, Default)]
pub struct FieldIndex {
    pub by_value: HashMap<String, HashSet<String>>,
    pub by_numeric: Vec<(f64, String)>,
}

impl FieldIndex {
    fn insert_string(&mut self, value: &str, id: &str) {
        self.by_value
            .entry(value.to_string())
            .or_default()
            .insert(id.to_string());
    }

    fn remove_string(&mut self, value: &str, id: &str) {
        if let Some(set) = self.by_value.get_mut(value) {
            set.remove(id);
            if set.is_empty() {
                self.by_value.remove(value);
            }
        }
    }

    fn insert_numeric(&mut self, value: f64, id: &str) {
        if value.is_nan() {
            return;
        }
        let pos = self
            .by_numeric
            .partition_point(|(v, _)| *v < value);
        self.by_numeric.insert(pos, (value, id.to_string()));
    }

    fn remove_numeric(&mut self, value: f64, id: &str) {
        if value.is_nan() {
            return;
        }
        if let Some(pos) = self
            .by_numeric
            .iter()
            .position(|(v, existing_id)| *v == value && existing_id == id)
        {
            self.by_numeric.remove(pos);
        }
    }

    /// Ids whose numeric value falls in `[min, max]`; an absent bound is
    /// unbounded on that side (half-open).
    pub fn range(&self, min: Option<f64>, max: Option<f64>) -> HashSet<String> {
        self.by_numeric
            .iter()
            .filter(|(v, _)| min.map_or(true, |m| *v >= m) && max.map_or(true, |m| *v <= m))
            .map(|(_, id)| id.clone())
            .collect()
    }
}

/// The full per-database index set.
#[derive(Debug, Default)]
pub struct Indexes {
    pub equality: HashMap<String, FieldIndex>,
    pub tags: HashMap<String, HashSet<String>>,
    pub fulltext: HashMap<String, HashSet<String>>,
}

impl Indexes {
    /// Remove every index entry derived from `doc`'s current body.
    pub fn remove_document(&mut self, doc: &Document) {
        for (field, value) in &doc.data {
            self.remove_scalar(field, value, &doc.id);
        }
        for tag in &doc.tags {
            if let Some(set) = self.tags.get_mut(tag) {
                set.remove(&doc.id);
                if set.is_empty() {
                    self.tags.remove(tag);
                }
            }
        }
        if let Some(content) = &doc.content {
            for token in docstore_search::tokenize(content) {
                if let Some(set) = self.fulltext.get_mut(&token) {
                    set.remove(&doc.id);
                    if set.is_empty() {
                        self.fulltext.remove(&token);
                    }
                }
            }
        }
    }

    /// Add every index entry derived from `doc`'s current body.
    pub fn add_document(&mut self, doc: &Document) {
        for (field, value) in &doc.data {
            self.add_scalar(field, value, &doc.id);
        }
        for tag in &doc.tags {
            self.tags.entry(tag.clone()).or_default().insert(doc.id.clone());
        }
        if let Some(content) = &doc.content {
            for token in docstore_search::tokenize(content) {
                self.fulltext.entry(token).or_default().insert(doc.id.clone());
            }
        }
    }

    /// Apply the delta between an old and a new body for the same id in one
    /// pass: remove what the old body contributed, then add what the new
    /// body contributes. Either side may be absent (fresh create / tombstone).
    pub fn apply_delta(&mut self, old: Option<&Document>, new: Option<&Document>) {
        if let Some(old) = old {
            self.remove_document(old);
        }
        if let Some(new) = new {
            self.add_document(new);
        }
    }

    fn add_scalar(&mut self, field: &str, value: &Value, id: &str) {
        let entry = self.equality.entry(field.to_string()).or_default();
        if let Some(s) = value.as_equality_str() {
            entry.insert_string(s, id);
        }
        if let Some(n) = value.as_f64() {
            entry.insert_numeric(n, id);
        }
    }

    fn remove_scalar(&mut self, field: &str, value: &Value, id: &str) {
        if let Some(entry) = self.equality.get_mut(field) {
            if let Some(s) = value.as_equality_str() {
                entry.remove_string(s, id);
            }
            if let Some(n) = value.as_f64() {
                entry.remove_numeric(n, id);
            }
            if entry.by_value.is_empty() && entry.by_numeric.is_empty() {
                self.equality.remove(field);
            }
        }
    }
}
