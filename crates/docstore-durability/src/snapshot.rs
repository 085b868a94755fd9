//! Snapshot Manager (§4.E): full-state snapshots and the manifest that
//! points at the active one.
//!
//! Rewriting the manifest is the commit point of a snapshot: the snapshot
//! file itself is written and fsynced first, and only then does the
//! manifest start pointing at it (temp file + rename, so a crash mid-write
//! never leaves a manifest pointing at a half-written snapshot).

use docstore_core::error::Result;
use docstore_core::types::Document;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// `manifest.json` (§6.2): the commit point of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    #[serde(rename = "lastSeq")]
    pub last_seq: u64,
    #[serde(rename = "activeSnapshot")]
    pub active_snapshot: Option<String>,
    #[serde(rename = "snapshotTimeUtc")]
    pub snapshot_time_utc: Option<String>,
}

pub struct SnapshotManager {
    dir: PathBuf,
}

impl SnapshotManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SnapshotManager { dir: dir.into() }
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join("manifest.json")
    }

    /// Write `snapshot-{unix_ts}.jsonl` (one document per line, including
    /// tombstones, in insertion order), fsync it, then atomically rewrite
    /// the manifest to point at it. The previous snapshot file, if any, is
    /// left on disk (garbage collection is out of scope, §4.E).
    pub fn create_snapshot(&self, docs: &[Document], last_seq: u64) -> Result<String> {
        fs::create_dir_all(&self.dir)?;
        let unix_ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let file_name = format!("snapshot-{unix_ts}.jsonl");
        let path = self.dir.join(&file_name);

        {
            let mut file = File::create(&path)?;
            for doc in docs {
                let mut line = serde_json::to_string(doc)?;
                line.push('\n');
                file.write_all(line.as_bytes())?;
            }
            file.sync_all()?;
        }

        let manifest = Manifest {
            last_seq,
            active_snapshot: Some(file_name.clone()),
            snapshot_time_utc: Some(chrono::Utc::now().to_rfc3339()),
        };
        self.write_manifest_atomically(&manifest)?;

        tracing::info!(file = %file_name, last_seq, "snapshot created");
        Ok(file_name)
    }

    fn write_manifest_atomically(&self, manifest: &Manifest) -> Result<()> {
        let tmp_path = self.manifest_path().with_extension("json.tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            let body = serde_json::to_vec_pretty(manifest)?;
            tmp.write_all(&body)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, self.manifest_path())?;
        Ok(())
    }

    /// Returns the manifest if it exists and parses; `None` if absent or
    /// corrupt (§7 — a corrupt manifest discards the snapshot step but is
    /// not itself a fatal error).
    pub fn try_read_manifest(&self) -> Option<Manifest> {
        let bytes = fs::read(self.manifest_path()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Streams the active snapshot's documents if the manifest is present,
    /// valid, and names an existing file. Individually corrupt lines are
    /// skipped (§7).
    pub fn read_active_snapshot_lines(&self) -> Result<Vec<Document>> {
        let Some(manifest) = self.try_read_manifest() else {
            return Ok(Vec::new());
        };
        let Some(name) = manifest.active_snapshot else {
            return Ok(Vec::new());
        };
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(path)?);
        let mut docs = Vec::new();
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break,
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Document>(&line) {
                Ok(doc) => docs.push(doc),
                Err(e) => tracing::warn!(error = %e, "skipping corrupt snapshot line"),
            }
        }
        Ok(docs)
    }
}
