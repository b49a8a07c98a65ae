//! AOF handle
//!
//! Owns the open log file for the lifetime of the process. The handle is an
//! ordinary value: several logs can be open at once (one per test, for example).

use super::log_file::LogFile;
use super::reader::ReplayState;
use super::syncer::Syncer;
use super::{AofError, Durability};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// State shared between the handle and its background syncer
pub(super) struct Shared {
    pub(super) path: PathBuf,
    pub(super) durability: Durability,
    /// The write guard: every byte that reaches the log goes through this lock
    pub(super) log: Mutex<LogFile>,
    pub(super) frames_appended: AtomicU64,
    pub(super) syncs: AtomicU64,
}

impl Shared {
    /// Flush and fsync under the guard
    pub(super) fn sync(&self) -> Result<(), AofError> {
        let mut log = self.log.lock();
        if log.sync()? {
            self.syncs.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// An open append-only file
pub struct Aof {
    pub(super) shared: Arc<Shared>,
    pub(super) replay_state: ReplayState,
    syncer: Option<Syncer>,
}

/// Point-in-time statistics about an open AOF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AofStats {
    /// Logical size in bytes, including bytes still buffered
    pub size_bytes: u64,
    /// Frames appended through this handle
    pub frames_appended: u64,
    /// fsync calls issued through this handle
    pub syncs: u64,
    /// Whether the most recent append succeeded
    pub last_write_ok: bool,
}

impl Aof {
    /// Open (or create) the AOF at `path`
    pub fn open<P: AsRef<Path>>(path: P, durability: Durability) -> Result<Self, AofError> {
        let path = path.as_ref().to_path_buf();
        let log = LogFile::open(&path)?;
        info!(
            "AOF opened at {:?} ({} bytes, durability {:?})",
            path,
            log.len(),
            durability
        );

        let shared = Arc::new(Shared {
            path,
            durability,
            log: Mutex::new(log),
            frames_appended: AtomicU64::new(0),
            syncs: AtomicU64::new(0),
        });

        let syncer = durability
            .sync_interval()
            .map(|interval| Syncer::spawn(shared.clone(), interval))
            .transpose()?;

        Ok(Aof {
            shared,
            replay_state: ReplayState::Start,
            syncer,
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Durability policy applied to appends
    pub fn durability(&self) -> Durability {
        self.shared.durability
    }

    /// Force all appended frames to stable storage
    pub fn sync(&self) -> Result<(), AofError> {
        self.shared.sync()
    }

    /// Current statistics
    pub fn stats(&self) -> AofStats {
        let log = self.shared.log.lock();
        AofStats {
            size_bytes: log.len(),
            frames_appended: self.shared.frames_appended.load(Ordering::Relaxed),
            syncs: self.shared.syncs.load(Ordering::Relaxed),
            last_write_ok: log.last_write_ok,
        }
    }

    /// Flush, sync and release the file
    pub fn close(mut self) -> Result<(), AofError> {
        self.syncer.take();
        self.shared.log.lock().close()?;
        info!("AOF closed at {:?}", self.shared.path);
        Ok(())
    }
}

impl Drop for Aof {
    fn drop(&mut self) {
        // Stop the syncer before the final flush so it cannot race it
        self.syncer.take();
        if let Err(e) = self.shared.log.lock().flush_pending() {
            error!("Failed to flush AOF {:?} on drop: {}", self.shared.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aof::Operation;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("new.aof");
        assert!(!path.exists());

        let aof = Aof::open(&path, Durability::Flush).unwrap();
        assert!(path.exists());
        assert_eq!(aof.stats().size_bytes, 0);
        aof.close().unwrap();
    }

    #[test]
    fn test_open_missing_directory_fails_with_io() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("x.aof");
        assert!(matches!(
            Aof::open(&path, Durability::Flush),
            Err(AofError::Io(_))
        ));
    }

    #[test]
    fn test_buffered_frames_reach_disk_on_close() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("buffered.aof");

        let aof = Aof::open(&path, Durability::None).unwrap();
        aof.append(&Operation::new("SET", ["k", "v"])).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
        assert!(aof.stats().size_bytes > 0);

        aof.close().unwrap();
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_buffered_frames_reach_disk_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dropped.aof");

        {
            let aof = Aof::open(&path, Durability::None).unwrap();
            aof.append(&Operation::new("SET", ["k", "v"])).unwrap();
        }
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_periodic_syncer_syncs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("periodic.aof");

        let aof = Aof::open(&path, Durability::SyncPeriodic(Duration::from_millis(10))).unwrap();
        aof.append(&Operation::new("SET", ["k", "v"])).unwrap();

        let mut synced = false;
        for _ in 0..200 {
            if aof.stats().syncs > 0 {
                synced = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(synced, "background syncer never ran");
        aof.close().unwrap();
    }

    #[test]
    fn test_two_logs_coexist() {
        let dir = TempDir::new().unwrap();
        let a = Aof::open(dir.path().join("a.aof"), Durability::Flush).unwrap();
        let b = Aof::open(dir.path().join("b.aof"), Durability::Flush).unwrap();

        a.append(&Operation::new("SET", ["k", "1"])).unwrap();
        assert_eq!(a.stats().frames_appended, 1);
        assert_eq!(b.stats().frames_appended, 0);
    }
}
