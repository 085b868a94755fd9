//! Engine configuration.
//!
//! Loading this from a config file or CLI flags is out of scope (§1); an
//! embedder constructs it programmatically and passes it to
//! `docstore_engine::DurableDocumentService::open`.

use std::path::PathBuf;

/// Durability level for WAL appends (§4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityLevel {
    /// Flush to the OS after each append; no explicit fsync.
    Relaxed,
    /// Flush each append; fsync once >= 1 MiB has been written since the
    /// last fsync.
    Commit,
    /// fsync after every append.
    Strong,
}

impl Default for DurabilityLevel {
    fn default() -> Self {
        DurabilityLevel::Commit
    }
}

/// Bytes written since the last fsync before `Commit` mode forces one.
pub const COMMIT_FSYNC_THRESHOLD_BYTES: u64 = 1024 * 1024;

/// Engine-wide configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory; one subdirectory per database (§6.2).
    pub root_dir: PathBuf,
    pub durability: DurabilityLevel,
    /// Snapshot trigger: every Nth accepted mutation (§4.F).
    pub snapshot_every_n_operations: u64,
    /// Snapshot trigger: WAL size on disk, in MiB (§4.F).
    pub snapshot_max_wal_size_mb: u64,
}

impl Config {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Config {
            root_dir: root_dir.into(),
            durability: DurabilityLevel::default(),
            snapshot_every_n_operations: 1000,
            snapshot_max_wal_size_mb: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::new("/tmp/does-not-matter");
        assert_eq!(cfg.durability, DurabilityLevel::Commit);
        assert_eq!(cfg.snapshot_every_n_operations, 1000);
        assert_eq!(cfg.snapshot_max_wal_size_mb, 64);
    }
}
