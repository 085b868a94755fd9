//! The Durable Document Service (§4.F): the engine's single public type.
//! Composes an [`InMemoryStore`] with a [`Wal`] and [`SnapshotManager`] per
//! database and serializes access with one reader-writer lock over the
//! whole database map (§5, design note 9 — no per-database sub-locks).

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use docstore_core::error::{Error, Result};
use docstore_core::types::Document;
use docstore_core::Config;
use docstore_durability::{SnapshotManager, Wal, WalRecord};
use docstore_storage::{DbStats, Equals, InMemoryStore, NumericRange};
use parking_lot::RwLock;

use crate::recovery::{export_all, recover_into_store, RecoveryReport};
use crate::SELF_KEY;

struct DbEntry {
    dir: PathBuf,
    store: InMemoryStore,
    wal: Wal,
    snapshot: SnapshotManager,
}

/// Composes storage and durability behind the operation surface of §4.C /
/// §6.1. One instance owns one root directory.
pub struct DurableDocumentService {
    config: Config,
    databases: RwLock<HashMap<String, DbEntry>>,
}

impl DurableDocumentService {
    /// Opens (and recovers) every database found under `config.root_dir`.
    /// Per §4.F: manifest → snapshot replay → WAL replay → `SetSeq`, for
    /// each database directory found.
    pub fn open(config: Config) -> Result<(Self, RecoveryReport)> {
        fs::create_dir_all(&config.root_dir)?;
        let mut databases = HashMap::new();
        let mut report = RecoveryReport::default();

        for entry in fs::read_dir(&config.root_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let dir = entry.path();
            let wal_path = dir.join("wal.log");
            let wal = Wal::open(&wal_path, config.durability)?;
            let snapshot = SnapshotManager::new(&dir);
            let (store, replayed) = recover_into_store(&snapshot, &wal_path)?;

            report.databases_recovered += 1;
            report.wal_records_replayed += replayed;
            tracing::info!(db = %name, wal_records_replayed = replayed, "database recovered");

            databases.insert(name, DbEntry { dir, store, wal, snapshot });
        }

        Ok((DurableDocumentService { config, databases: RwLock::new(databases) }, report))
    }

    /// Idempotent (§4.F): creating an already-open database is a no-op.
    pub fn create_db(&self, db: &str) -> Result<()> {
        let mut map = self.databases.write();
        if map.contains_key(db) {
            return Ok(());
        }
        let dir = self.config.root_dir.join(sanitize_db_name(db));
        fs::create_dir_all(&dir)?;
        let wal = Wal::open(dir.join("wal.log"), self.config.durability)?;
        let snapshot = SnapshotManager::new(&dir);
        let mut store = InMemoryStore::new();
        store.create_db(SELF_KEY);
        map.insert(db.to_string(), DbEntry { dir, store, wal, snapshot });
        tracing::info!(db, "database created");
        Ok(())
    }

    /// Removes the database's directory recursively (§4.F "Deletion").
    pub fn delete_db(&self, db: &str) -> Result<()> {
        let mut map = self.databases.write();
        let entry = map
            .remove(db)
            .ok_or_else(|| Error::NotFound(format!("database {db}")))?;
        fs::remove_dir_all(&entry.dir)?;
        tracing::info!(db, "database deleted");
        Ok(())
    }

    pub fn list_dbs(&self) -> Vec<String> {
        self.databases.read().keys().cloned().collect()
    }

    pub fn get(&self, db: &str, id: &str, rev: Option<&str>) -> Result<Document> {
        let map = self.databases.read();
        let entry = self.require(&map, db)?;
        entry.store.get(SELF_KEY, id, rev)
    }

    pub fn put(&self, db: &str, doc: Document) -> Result<Document> {
        let mut map = self.databases.write();
        let entry = self.require_mut(&mut map, db)?;
        let result = entry.store.put(SELF_KEY, doc)?;
        let seq = entry_seq(entry)?;
        let record = WalRecord::put(result.id.clone(), result.rev.clone(), seq, result.clone());
        self.finish_mutation(entry, record)?;
        Ok(result)
    }

    pub fn post(&self, db: &str, doc: Document) -> Result<Document> {
        let mut map = self.databases.write();
        let entry = self.require_mut(&mut map, db)?;
        let result = entry.store.post(SELF_KEY, doc)?;
        let seq = entry_seq(entry)?;
        let record = WalRecord::put(result.id.clone(), result.rev.clone(), seq, result.clone());
        self.finish_mutation(entry, record)?;
        Ok(result)
    }

    pub fn delete(&self, db: &str, id: &str, rev: &str) -> Result<Document> {
        let mut map = self.databases.write();
        let entry = self.require_mut(&mut map, db)?;
        let tombstone = entry.store.delete(SELF_KEY, id, rev)?;
        let seq = entry_seq(entry)?;
        let record = WalRecord::del(tombstone.id.clone(), tombstone.rev.clone(), seq);
        self.finish_mutation(entry, record)?;
        Ok(tombstone)
    }

    pub fn all_docs(
        &self,
        db: &str,
        skip: usize,
        limit: usize,
        include_deleted: bool,
    ) -> Result<Vec<Document>> {
        let map = self.databases.read();
        let entry = self.require(&map, db)?;
        entry.store.all_docs(SELF_KEY, skip, limit, include_deleted)
    }

    pub fn seq(&self, db: &str) -> Result<u64> {
        let map = self.databases.read();
        let entry = self.require(&map, db)?;
        entry.store.seq(SELF_KEY)
    }

    pub fn stats(&self, db: &str) -> Result<DbStats> {
        let map = self.databases.read();
        let entry = self.require(&map, db)?;
        entry.store.stats(SELF_KEY)
    }

    pub fn find_by_fields(
        &self,
        db: &str,
        equals: &Equals,
        numeric_range: Option<&NumericRange>,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let map = self.databases.read();
        let entry = self.require(&map, db)?;
        entry.store.find_by_fields(SELF_KEY, equals, numeric_range, skip, limit)
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
        let map = self.databases.read();
        let entry = self.require(&map, db)?;
        entry.store.find_by_tags(SELF_KEY, all_of, any_of, none_of, skip, limit)
    }

    pub fn full_text_search(
        &self,
        db: &str,
        query: &str,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let map = self.databases.read();
        let entry = self.require(&map, db)?;
        entry.store.full_text_search(SELF_KEY, query, skip, limit)
    }

    fn require<'a>(&self, map: &'a HashMap<String, DbEntry>, db: &str) -> Result<&'a DbEntry> {
        map.get(db).ok_or_else(|| Error::NotFound(format!("database {db}")))
    }

    fn require_mut<'a>(
        &self,
        map: &'a mut HashMap<String, DbEntry>,
        db: &str,
    ) -> Result<&'a mut DbEntry> {
        map.get_mut(db).ok_or_else(|| Error::NotFound(format!("database {db}")))
    }

    /// WAL-append then evaluate the snapshot trigger (§4.F). Completing the
    /// WAL append before returning is what makes `Ok` mean "durable" at
    /// `Commit`/`Strong`.
    fn finish_mutation(&self, entry: &mut DbEntry, record: WalRecord) -> Result<()> {
        entry.wal.append(&record)?;
        let seq = record.seq;
        let wal_size_mb = entry.wal.size_bytes()? / (1024 * 1024);
        let triggered = (self.config.snapshot_every_n_operations > 0
            && seq % self.config.snapshot_every_n_operations == 0)
            || wal_size_mb > self.config.snapshot_max_wal_size_mb;
        if triggered {
            let docs = export_all(&entry.store);
            entry.snapshot.create_snapshot(&docs, seq)?;
            entry.wal.rotate()?;
            tracing::info!(seq, "snapshot trigger fired");
        }
        Ok(())
    }
}

fn entry_seq(entry: &DbEntry) -> Result<u64> {
    entry.store.seq(SELF_KEY)
}

/// Database directory names are the database name with any path-invalid
/// byte replaced by `_` (§6.2). Recovery then treats each subdirectory
/// name as the database name verbatim — callers should stick to names
/// that already survive this mapping unchanged if they rely on `open`
/// rediscovering them under their original name.
fn sanitize_db_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_core::DurabilityLevel;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn open_service(root: &std::path::Path) -> DurableDocumentService {
        let cfg = Config::new(root);
        DurableDocumentService::open(cfg).unwrap().0
    }

    #[test]
    fn create_put_get_roundtrip() {
        let dir = tempdir().unwrap();
        let svc = open_service(dir.path());
        svc.create_db("a").unwrap();
        let mut data = BTreeMap::new();
        data.insert("k".to_string(), docstore_core::types::Value::Str("v".into()));
        let doc = Document { id: "x".into(), data, ..Default::default() };
        let put = svc.put("a", doc).unwrap();
        assert!(put.rev.starts_with("1-"));
        let got = svc.get("a", "x", None).unwrap();
        assert_eq!(got.data.get("k"), Some(&docstore_core::types::Value::Str("v".into())));
    }

    #[test]
    fn missing_database_is_not_found() {
        let dir = tempdir().unwrap();
        let svc = open_service(dir.path());
        let err = svc.get("missing", "x", None).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn create_db_is_idempotent() {
        let dir = tempdir().unwrap();
        let svc = open_service(dir.path());
        svc.create_db("a").unwrap();
        svc.create_db("a").unwrap();
        assert_eq!(svc.list_dbs(), vec!["a".to_string()]);
    }

    #[test]
    fn delete_db_removes_its_directory() {
        let dir = tempdir().unwrap();
        let svc = open_service(dir.path());
        svc.create_db("a").unwrap();
        let db_dir = dir.path().join("a");
        assert!(db_dir.exists());
        svc.delete_db("a").unwrap();
        assert!(!db_dir.exists());
        assert!(svc.delete_db("a").unwrap_err().is_not_found());
    }

    #[test]
    fn snapshot_trigger_fires_on_configured_interval() {
        let dir = tempdir().unwrap();
        let mut cfg = Config::new(dir.path());
        cfg.durability = DurabilityLevel::Strong;
        cfg.snapshot_every_n_operations = 2;
        let (svc, _report) = DurableDocumentService::open(cfg).unwrap();
        svc.create_db("a").unwrap();
        svc.put("a", Document::new("x")).unwrap();
        svc.put("a", Document::new("y")).unwrap();

        let manifest = SnapshotManager::new(dir.path().join("a")).try_read_manifest();
        assert!(manifest.is_some());
        assert_eq!(manifest.unwrap().last_seq, 2);
    }
}
