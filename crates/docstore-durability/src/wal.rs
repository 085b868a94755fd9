//! Write-Ahead Log (§4.D): an append-only, line-delimited JSON journal per
//! database, with three configurable durability levels.

use docstore_core::config::{DurabilityLevel, COMMIT_FSYNC_THRESHOLD_BYTES};
use docstore_core::error::Result;
use docstore_core::types::Document;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// One WAL line (§4.D). `doc` is present for `put`, absent for `del`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalRecord {
    pub op: WalOp,
    pub id: String,
    pub rev: String,
    pub seq: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub doc: Option<Document>,
    pub ts: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WalOp {
    Put,
    Del,
}

impl WalRecord {
    pub fn put(id: impl Into<String>, rev: impl Into<String>, seq: u64, doc: Document) -> Self {
        WalRecord {
            op: WalOp::Put,
            id: id.into(),
            rev: rev.into(),
            seq,
            doc: Some(doc),
            ts: now_iso8601(),
        }
    }

    pub fn del(id: impl Into<String>, rev: impl Into<String>, seq: u64) -> Self {
        WalRecord {
            op: WalOp::Del,
            id: id.into(),
            rev: rev.into(),
            seq,
            doc: None,
            ts: now_iso8601(),
        }
    }
}

fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339()
}

struct Inner {
    file: File,
    bytes_since_fsync: u64,
}

/// Append-only WAL file. Writes are serialized by an internal mutex; the
/// reader is only ever used single-threaded, at recovery (§4.D
/// "Concurrency").
pub struct Wal {
    path: PathBuf,
    mode: DurabilityLevel,
    inner: Mutex<Inner>,
}

impl Wal {
    pub fn open(path: impl AsRef<Path>, mode: DurabilityLevel) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Wal {
            path,
            mode,
            inner: Mutex::new(Inner { file, bytes_since_fsync: 0 }),
        })
    }

    pub fn append(&self, record: &WalRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut inner = self.inner.lock();
        inner.file.write_all(line.as_bytes())?;
        inner.file.flush()?;
        inner.bytes_since_fsync += line.len() as u64;

        match self.mode {
            DurabilityLevel::Relaxed => {}
            DurabilityLevel::Commit => {
                if inner.bytes_since_fsync >= COMMIT_FSYNC_THRESHOLD_BYTES {
                    inner.file.sync_data()?;
                    inner.bytes_since_fsync = 0;
                }
            }
            DurabilityLevel::Strong => {
                inner.file.sync_data()?;
                inner.bytes_since_fsync = 0;
            }
        }
        tracing::trace!(op = ?record.op, id = %record.id, seq = record.seq, "wal append");
        Ok(())
    }

    /// Close, truncate, and reopen for append — used right after a
    /// snapshot makes the prior WAL contents redundant.
    pub fn rotate(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(true)
            .truncate(true)
            .open(&self.path)?;
        inner.bytes_since_fsync = 0;
        tracing::info!(path = %self.path.display(), "wal rotated");
        Ok(())
    }

    pub fn size_bytes(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    /// Streaming read for recovery: tolerant of a trailing partial line
    /// (ignored) and of individually corrupt lines (skipped, per §7 —
    /// recovery stays resilient rather than failing outright).
    pub fn read_all_lines(path: impl AsRef<Path>) -> Result<Vec<WalRecord>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(_) => break, // trailing partial / unreadable line: stop here
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping corrupt WAL line");
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_core::types::Document;
    use tempfile::tempdir;

    #[test]
    fn append_then_read_all_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let wal = Wal::open(&path, DurabilityLevel::Strong).unwrap();
        wal.append(&WalRecord::put("x", "1-aaa", 1, Document::new("x"))).unwrap();
        wal.append(&WalRecord::del("x", "2-bbb", 2)).unwrap();

        let records = Wal::read_all_lines(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].op, WalOp::Put);
        assert_eq!(records[1].op, WalOp::Del);
        assert_eq!(records[1].doc, None);
    }

    #[test]
    fn trailing_partial_line_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        {
            let wal = Wal::open(&path, DurabilityLevel::Strong).unwrap();
            wal.append(&WalRecord::put("x", "1-aaa", 1, Document::new("x"))).unwrap();
        }
        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        f.write_all(b"{\"op\":\"put\",\"id\":\"truncate").unwrap();

        let records = Wal::read_all_lines(&path).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn corrupt_middle_line_is_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        {
            let wal = Wal::open(&path, DurabilityLevel::Strong).unwrap();
            wal.append(&WalRecord::put("a", "1-aaa", 1, Document::new("a"))).unwrap();
        }
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(f, "not valid json at all").unwrap();
        }
        {
            let wal = Wal::open(&path, DurabilityLevel::Strong).unwrap();
            wal.append(&WalRecord::put("b", "1-bbb", 2, Document::new("b"))).unwrap();
        }

        let records = Wal::read_all_lines(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "a");
        assert_eq!(records[1].id, "b");
    }

    #[test]
    fn rotate_truncates_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let wal = Wal::open(&path, DurabilityLevel::Strong).unwrap();
        wal.append(&WalRecord::put("x", "1-aaa", 1, Document::new("x"))).unwrap();
        assert!(wal.size_bytes().unwrap() > 0);
        wal.rotate().unwrap();
        assert_eq!(wal.size_bytes().unwrap(), 0);
    }
}
