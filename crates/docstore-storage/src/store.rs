//! In-Memory Store (§4.C): per-database heads, bodies, `seq`, and the three
//! secondary indexes, plus every operation in the durable service's
//! outward contract (§6.1).
//!
//! This type has no locking of its own — it is exclusively owned by
//! `docstore-engine`'s `DurableDocumentService`, which serializes access
//! with the single-writer/multi-reader lock described in §5. Keeping the
//! store single-threaded keeps its invariants easy to reason about: no
//! method here can observe a torn update.

use crate::index::Indexes;
use crate::stats::DbStats;
use docstore_core::error::{Error, Result};
use docstore_core::types::{Document, Head};
use std::collections::HashMap;

/// Search results and `AllDocs` never return more than this many documents
/// in one call, regardless of the requested `limit`.
pub const MAX_LIMIT: usize = 1000;

/// A field-equality predicate used by [`InMemoryStore::find_by_fields`].
pub type Equals = HashMap<String, String>;

/// A numeric-range predicate used by [`InMemoryStore::find_by_fields`].
#[derive(Debug, Clone)]
pub struct NumericRange {
    pub field: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

struct DbState {
    heads: HashMap<String, Head>,
    bodies: HashMap<String, Document>,
    /// First-insertion order; ids are never removed from it (tombstones
    /// remain enumerable), so this doubles as the `AllDocs` iteration order.
    insertion_order: Vec<String>,
    seq: u64,
    indexes: Indexes,
}

impl DbState {
    fn new() -> Self {
        DbState {
            heads: HashMap::new(),
            bodies: HashMap::new(),
            insertion_order: Vec::new(),
            seq: 0,
            indexes: Indexes::default(),
        }
    }

    fn touch_insertion_order(&mut self, id: &str) {
        if !self.heads.contains_key(id) {
            self.insertion_order.push(id.to_string());
        }
    }

    fn live_ids_in_order(&self) -> Vec<String> {
        self.insertion_order
            .iter()
            .filter(|id| !self.heads[id.as_str()].deleted)
            .cloned()
            .collect()
    }
}

/// Owns every database's in-memory state.
#[derive(Default)]
pub struct InMemoryStore {
    databases: HashMap<String, DbState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    pub fn database_names(&self) -> Vec<String> {
        self.databases.keys().cloned().collect()
    }

    /// Idempotent: creating an already-existing database is a no-op success.
    pub fn create_db(&mut self, db: &str) {
        self.databases.entry(db.to_string()).or_insert_with(DbState::new);
    }

    pub fn delete_db(&mut self, db: &str) -> Result<()> {
        self.databases
            .remove(db)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("database {db}")))
    }

    fn db(&self, db: &str) -> Result<&DbState> {
        self.databases
            .get(db)
            .ok_or_else(|| Error::NotFound(format!("database {db}")))
    }

    fn db_mut(&mut self, db: &str) -> Result<&mut DbState> {
        self.databases
            .get_mut(db)
            .ok_or_else(|| Error::NotFound(format!("database {db}")))
    }

    pub fn get(&self, db: &str, id: &str, rev: Option<&str>) -> Result<Document> {
        let state = self.db(db)?;
        let doc = state
            .bodies
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("document {id}")))?;
        if let Some(rev) = rev {
            if rev != doc.rev {
                return Err(Error::NotFound(format!("document {id} at revision {rev}")));
            }
        }
        Ok(doc.clone())
    }

    /// Upsert with optimistic concurrency (§4.C `Put`).
    pub fn put(&mut self, db: &str, mut doc: Document) -> Result<Document> {
        if doc.id.is_empty() {
            return Err(Error::Validation("document id must not be empty".into()));
        }
        let state = self.db_mut(db)?;

        let previous_rev = match state.heads.get(&doc.id) {
            None => String::new(),
            Some(head) => {
                if head.rev != doc.rev {
                    return Err(Error::Conflict(format!(
                        "revision mismatch for {}: have {}, expected {}",
                        doc.id, doc.rev, head.rev
                    )));
                }
                head.rev.clone()
            }
        };

        let old_body = state.bodies.get(&doc.id).cloned();
        doc.deleted = false;
        let body_bytes = docstore_codec::encode_body(&doc);
        doc.rev = docstore_codec::next_revision(&previous_rev, &body_bytes);

        state.indexes.apply_delta(old_body.as_ref(), Some(&doc));
        state.touch_insertion_order(&doc.id);
        state.heads.insert(doc.id.clone(), doc.head());
        state.bodies.insert(doc.id.clone(), doc.clone());
        state.seq += 1;

        tracing::debug!(db, id = %doc.id, rev = %doc.rev, seq = state.seq, "put");
        Ok(doc)
    }

    /// `Post`: generate an id when none was supplied, then delegate to `put`.
    pub fn post(&mut self, db: &str, mut doc: Document) -> Result<Document> {
        if doc.id.is_empty() {
            doc.id = uuid::Uuid::new_v4().simple().to_string();
        }
        self.put(db, doc)
    }

    pub fn delete(&mut self, db: &str, id: &str, rev: &str) -> Result<Document> {
        let state = self.db_mut(db)?;
        let head = state
            .heads
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("document {id}")))?;
        if head.rev != rev {
            return Err(Error::Conflict(format!(
                "revision mismatch for {id}: have {rev}, expected {}",
                head.rev
            )));
        }
        let old_body = state
            .bodies
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Corruption(format!("head without body for {id}")))?;

        let mut tombstone = old_body.clone();
        tombstone.deleted = true;
        let body_bytes = docstore_codec::encode_body(&tombstone);
        tombstone.rev = docstore_codec::next_revision(&old_body.rev, &body_bytes);

        state.indexes.apply_delta(Some(&old_body), None);
        state.heads.insert(id.to_string(), tombstone.head());
        state.bodies.insert(id.to_string(), tombstone.clone());
        state.seq += 1;

        tracing::debug!(db, id, rev = %tombstone.rev, seq = state.seq, "delete");
        Ok(tombstone)
    }

    pub fn all_docs(
        &self,
        db: &str,
        skip: usize,
        limit: usize,
        include_deleted: bool,
    ) -> Result<Vec<Document>> {
        let state = self.db(db)?;
        let ids = state.insertion_order.iter().filter(|id| {
            include_deleted || !state.heads[id.as_str()].deleted
        });
        Ok(ids
            .skip(skip)
            .take(limit.min(MAX_LIMIT))
            .map(|id| state.bodies[id].clone())
            .collect())
    }

    pub fn seq(&self, db: &str) -> Result<u64> {
        Ok(self.db(db)?.seq)
    }

    pub fn stats(&self, db: &str) -> Result<DbStats> {
        let state = self.db(db)?;
        let (mut live, mut deleted) = (0u64, 0u64);
        for head in state.heads.values() {
            if head.deleted {
                deleted += 1;
            } else {
                live += 1;
            }
        }
        Ok(DbStats {
            live_count: live,
            deleted_count: deleted,
            indexed_fields: state.indexes.equality.len() as u64,
            distinct_tags: state.indexes.tags.len() as u64,
            distinct_tokens: state.indexes.fulltext.len() as u64,
        })
    }

    pub fn find_by_fields(
        &self,
        db: &str,
        equals: &Equals,
        numeric_range: Option<&NumericRange>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let state = self.db(db)?;
        let mut candidate: Option<std::collections::HashSet<String>> = None;

        for (field, value) in equals {
            let matches = state
                .indexes
                .equality
                .get(field)
                .and_then(|fi| fi.by_value.get(value))
                .cloned()
                .unwrap_or_default();
            candidate = Some(intersect(candidate, matches));
        }

        if let Some(range) = numeric_range {
            let matches = state
                .indexes
                .equality
                .get(&range.field)
                .map(|fi| fi.range(range.min, range.max))
                .unwrap_or_default();
            candidate = Some(intersect(candidate, matches));
        }

        let candidate = candidate.unwrap_or_else(|| state.live_ids_in_order().into_iter().collect());
        Ok(ordered_page(state, &candidate, skip, limit))
    }

    pub fn find_by_tags(
        &self,
        db: &str,
        all_of: &[String],
        any_of: &[String],
        none_of: &[String],
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let state = self.db(db)?;
        let mut candidate: std::collections::HashSet<String> =
            state.live_ids_in_order().into_iter().collect();

        for tag in all_of {
            let set = state
                .indexes
                .tags
                .get(tag)
                .cloned()
                .unwrap_or_default();
            candidate = candidate.intersection(&set).cloned().collect();
        }

        if !any_of.is_empty() {
            let union: std::collections::HashSet<String> = any_of
                .iter()
                .flat_map(|t| state.indexes.tags.get(t).cloned().unwrap_or_default())
                .collect();
            candidate = candidate.intersection(&union).cloned().collect();
        }

        if !none_of.is_empty() {
            let union: std::collections::HashSet<String> = none_of
                .iter()
                .flat_map(|t| state.indexes.tags.get(t).cloned().unwrap_or_default())
                .collect();
            candidate = candidate.difference(&union).cloned().collect();
        }

        Ok(ordered_page(state, &candidate, skip, limit))
    }

    pub fn full_text_search(
        &self,
        db: &str,
        query: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let state = self.db(db)?;
        let tokens: std::collections::HashSet<String> = docstore_search::tokenize(query).into_iter().collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut candidate: Option<std::collections::HashSet<String>> = None;
        for token in &tokens {
            let matches = state.indexes.fulltext.get(token).cloned().unwrap_or_default();
            candidate = Some(intersect(candidate, matches));
        }
        let candidate = candidate.unwrap_or_default();
        Ok(ordered_page(state, &candidate, skip, limit))
    }

    /// Recovery helper: install a document without running the revision
    /// engine (it already carries a rev, read from a snapshot or WAL line).
    pub fn import(
        &mut self,
        db: &str,
        doc: Document,
        set_as_head: bool,
        reindex: bool,
        bump_seq: bool,
    ) -> Result<()> {
        let state = self.db_mut(db)?;
        let old_body = state.bodies.get(&doc.id).cloned();
        state.touch_insertion_order(&doc.id);
        if reindex {
            let new_ref = if doc.deleted { None } else { Some(&doc) };
            state.indexes.apply_delta(old_body.as_ref(), new_ref);
        }
        if set_as_head {
            state.heads.insert(doc.id.clone(), doc.head());
        }
        state.bodies.insert(doc.id.clone(), doc);
        if bump_seq {
            state.seq += 1;
        }
        Ok(())
    }

    /// Recovery helper: replay a WAL `del` record for `id`, transitioning
    /// it straight to a tombstone at `rev` without running the revision
    /// engine or bumping `seq` (the caller sets `seq` once at the end of
    /// replay via [`InMemoryStore::set_seq`]).
    pub fn import_delete(&mut self, db: &str, id: &str, rev: &str) -> Result<()> {
        let state = self.db_mut(db)?;
        let old_body = state.bodies.get(id).cloned();
        if let Some(old) = &old_body {
            state.indexes.remove_document(old);
        }
        state.touch_insertion_order(id);
        let mut tombstone = old_body.unwrap_or_else(|| Document::new(id));
        tombstone.deleted = true;
        tombstone.rev = rev.to_string();
        state.heads.insert(id.to_string(), tombstone.head());
        state.bodies.insert(id.to_string(), tombstone);
        Ok(())
    }

    pub fn set_seq(&mut self, db: &str, n: u64) -> Result<()> {
        self.db_mut(db)?.seq = n;
        Ok(())
    }
}

fn intersect(
    acc: Option<std::collections::HashSet<String>>,
    next: std::collections::HashSet<String>,
) -> std::collections::HashSet<String> {
    match acc {
        None => next,
        Some(acc) => acc.intersection(&next).cloned().collect(),
    }
}

fn ordered_page(
    state: &DbState,
    candidate: &std::collections::HashSet<String>,
    skip: usize,
    limit: usize,
) -> Vec<Document> {
    state
        .insertion_order
        .iter()
        .filter(|id| candidate.contains(id.as_str()))
        .skip(skip)
        .take(limit.min(MAX_LIMIT))
        .map(|id| state.bodies[id].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_core::types::Value;
    use std::collections::BTreeMap;

    fn store_with_db() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.create_db("a");
        store
    }

    #[test]
    fn create_put_get() {
        let mut store = store_with_db();
        let mut data = BTreeMap::new();
        data.insert("k".to_string(), Value::Str("v".to_string()));
        let doc = Document { id: "x".into(), data, ..Default::default() };
        let put = store.put("a", doc).unwrap();
        assert!(put.rev.starts_with("1-"));
        let got = store.get("a", "x", None).unwrap();
        assert_eq!(got.data.get("k"), Some(&Value::Str("v".into())));
    }

    #[test]
    fn stale_rev_is_conflict() {
        let mut store = store_with_db();
        let doc = Document::new("x");
        store.put("a", doc).unwrap();
        let stale = Document { id: "x".into(), rev: "".into(), ..Default::default() };
        let err = store.put("a", stale).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn matching_rev_succeeds_and_bumps_generation() {
        let mut store = store_with_db();
        let v1 = store.put("a", Document::new("x")).unwrap();
        let mut update = Document::new("x");
        update.rev = v1.rev;
        let v2 = store.put("a", update).unwrap();
        assert!(v2.rev.starts_with("2-"));
    }

    #[test]
    fn soft_delete_removes_from_search_and_marks_tombstone() {
        let mut store = store_with_db();
        let mut data = BTreeMap::new();
        data.insert("k".to_string(), Value::Str("w".to_string()));
        let v1 = store.put("a", Document { id: "x".into(), data, ..Default::default() }).unwrap();
        let tomb = store.delete("a", "x", &v1.rev).unwrap();
        assert!(tomb.deleted);
        let got = store.get("a", "x", None).unwrap();
        assert!(got.deleted);
        let mut equals = Equals::new();
        equals.insert("k".to_string(), "w".to_string());
        assert!(store.find_by_fields("a", &equals, None, 0, 10).unwrap().is_empty());
    }

    #[test]
    fn post_generates_32_hex_char_id() {
        let mut store = store_with_db();
        let doc = store.post("a", Document::default()).unwrap();
        assert_eq!(doc.id.len(), 32);
        assert!(doc.id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tag_and_text_search_scenario_from_spec() {
        let mut store = store_with_db();
        store
            .put(
                "a",
                Document {
                    id: "n1".into(),
                    tags: vec!["red".into(), "big".into()],
                    content: Some("Hello, World!".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .put(
                "a",
                Document {
                    id: "n2".into(),
                    tags: vec!["red".into()],
                    content: Some("hello there".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let tags = store
            .find_by_tags("a", &["red".to_string()], &[], &["big".to_string()], 0, 10)
            .unwrap();
        assert_eq!(tags.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["n2"]);

        let mut text = store.full_text_search("a", "hello", 0, 10).unwrap();
        text.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(text.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["n1", "n2"]);
    }

    #[test]
    fn seq_counts_accepted_mutations_including_soft_delete() {
        let mut store = store_with_db();
        let v1 = store.put("a", Document::new("x")).unwrap();
        store.delete("a", "x", &v1.rev).unwrap();
        assert_eq!(store.seq("a").unwrap(), 2);
    }

    #[test]
    fn all_docs_preserves_insertion_order_and_includes_tombstones_when_asked() {
        let mut store = store_with_db();
        store.put("a", Document::new("a1")).unwrap();
        let v2 = store.put("a", Document::new("a2")).unwrap();
        store.delete("a", "a2", &v2.rev).unwrap();
        let live_only = store.all_docs("a", 0, 10, false).unwrap();
        assert_eq!(live_only.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["a1"]);
        let all = store.all_docs("a", 0, 10, true).unwrap();
        assert_eq!(all.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["a1", "a2"]);
    }
}
