//! Crash recovery (§4.F "Recovery") and the snapshot-export helper that
//! both recovery and the live snapshot trigger depend on.

use docstore_core::error::Result;
use docstore_core::types::Document;
use docstore_durability::{SnapshotManager, Wal, WalOp};
use docstore_storage::InMemoryStore;

use crate::SELF_KEY;

/// Returned by [`crate::DurableDocumentService::open`] so an embedder can
/// log what happened at startup without re-deriving it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryReport {
    pub databases_recovered: u64,
    pub wal_records_replayed: u64,
}

/// Pulls every document (including tombstones) out of `store`, ignoring the
/// store's normal `MAX_LIMIT` page cap — a snapshot must contain everything.
pub fn export_all(store: &InMemoryStore) -> Vec<Document> {
    let mut all = Vec::new();
    let mut skip = 0usize;
    loop {
        let page = store
            .all_docs(SELF_KEY, skip, docstore_storage::MAX_LIMIT, true)
            .expect("database created alongside its store entry");
        let got = page.len();
        all.extend(page);
        if got < docstore_storage::MAX_LIMIT {
            break;
        }
        skip += got;
    }
    all
}

/// Rebuilds one database's in-memory state from its manifest, active
/// snapshot, and WAL, per §4.F points 1-4. Returns the recovered store and
/// how many WAL records were replayed.
pub fn recover_into_store(
    snapshot: &SnapshotManager,
    wal_path: &std::path::Path,
) -> Result<(InMemoryStore, u64)> {
    let mut store = InMemoryStore::new();
    store.create_db(SELF_KEY);

    let manifest = snapshot.try_read_manifest();
    let mut last_seq = manifest.as_ref().map(|m| m.last_seq).unwrap_or(0);

    for doc in snapshot.read_active_snapshot_lines()? {
        store.import(SELF_KEY, doc, true, true, false)?;
    }

    let records = Wal::read_all_lines(wal_path)?;
    let replayed = records.len() as u64;
    for record in records {
        match record.op {
            WalOp::Put => {
                let doc = record
                    .doc
                    .unwrap_or_else(|| Document::new(record.id.clone()));
                store.import(SELF_KEY, doc, true, true, false)?;
            }
            WalOp::Del => {
                store.import_delete(SELF_KEY, &record.id, &record.rev)?;
            }
        }
        last_seq = last_seq.max(record.seq);
    }

    store.set_seq(SELF_KEY, last_seq)?;
    Ok((store, replayed))
}
