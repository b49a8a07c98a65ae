//! AOF rewrite
//!
//! Replaces the log with a compact one holding only the operations needed to
//! rebuild the current state. The new file is fully written, synced and opened
//! before it is renamed over the old one, so a crash or error at any point
//! leaves one complete log that the handle still writes to.

use super::log_file::LogFile;
use super::{codec, Aof, AofError, Operation};
use bytes::BytesMut;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

impl Aof {
    /// Rewrite the log so it contains exactly `ops`
    ///
    /// Holds the write guard for the whole rewrite: appends issued meanwhile
    /// wait and land in the new file.
    pub fn rewrite<I>(&self, ops: I) -> Result<u64, AofError>
    where
        I: IntoIterator<Item = Operation>,
    {
        let mut log = self.shared.log.lock();
        let old_len = log.len();
        let tmp_path = rewrite_path(&self.shared.path);

        // Nothing may fail after the rename: the old descriptor then points at
        // an unlinked file
        let prepared = write_compacted(&tmp_path, ops).and_then(|written| {
            let new_log = LogFile::open(&tmp_path)?;
            fs::rename(&tmp_path, &self.shared.path)?;
            Ok((written, new_log))
        });

        let (written, new_log) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&tmp_path) {
                    warn!("Could not remove {:?}: {}", tmp_path, cleanup);
                }
                error!("AOF rewrite of {:?} failed, keeping the current log: {}", self.shared.path, e);
                return Err(e);
            }
        };

        sync_parent_dir(&self.shared.path);
        // Frames still buffered for the old file are already reflected in `ops`
        *log = new_log;

        info!(
            "AOF rewritten at {:?}: {} -> {} bytes",
            self.shared.path, old_len, written
        );
        Ok(written)
    }
}

fn rewrite_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".rewrite");
    path.with_file_name(name)
}

/// Write every operation to a fresh file and sync it; returns the file size
fn write_compacted<I>(path: &Path, ops: I) -> Result<u64, AofError>
where
    I: IntoIterator<Item = Operation>,
{
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    let mut writer = BufWriter::new(file);
    let mut buf = BytesMut::new();
    let mut written = 0u64;

    for op in ops {
        codec::check_frame_size(&op)?;
        buf.clear();
        codec::encode_to(&mut buf, &op);
        writer.write_all(&buf)?;
        written += buf.len() as u64;
    }

    let file = writer.into_inner().map_err(|e| AofError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(written)
}

/// Make the rename itself durable
#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Err(e) = fs::File::open(parent).and_then(|dir| dir.sync_all()) {
        warn!("Could not sync directory {:?} after AOF rewrite: {}", parent, e);
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aof::Durability;
    use tempfile::TempDir;

    #[test]
    fn test_rewrite_replaces_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rewrite.aof");

        let aof = Aof::open(&path, Durability::Flush).unwrap();
        for i in 0..20 {
            aof.append(&Operation::new("SET", ["counter".to_string(), i.to_string()]))
                .unwrap();
        }
        let before = aof.stats().size_bytes;

        let after = aof
            .rewrite(vec![Operation::new("SET", ["counter", "19"])])
            .unwrap();
        assert!(after < before);
        assert_eq!(aof.stats().size_bytes, after);

        // Appends continue in the new file
        aof.append(&Operation::new("DEL", ["counter"])).unwrap();
        aof.close().unwrap();

        let mut aof = Aof::open(&path, Durability::Flush).unwrap();
        let mut seen = Vec::new();
        aof.replay(|op| seen.push(op)).unwrap();
        assert_eq!(
            seen,
            vec![
                Operation::new("SET", ["counter", "19"]),
                Operation::new("DEL", ["counter"]),
            ]
        );
        assert!(!rewrite_path(&path).exists());
    }

    #[test]
    fn test_rewrite_to_empty_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty_rewrite.aof");

        let aof = Aof::open(&path, Durability::SyncEveryWrite).unwrap();
        aof.append(&Operation::new("SET", ["a", "1"])).unwrap();
        assert_eq!(aof.rewrite(Vec::new()).unwrap(), 0);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    fn replay_ops(path: &Path) -> Vec<Operation> {
        let mut aof = Aof::open(path, Durability::Flush).unwrap();
        let mut seen = Vec::new();
        aof.replay(|op| seen.push(op)).unwrap();
        seen
    }

    #[test]
    fn test_failed_rewrite_keeps_live_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blocked.aof");

        let aof = Aof::open(&path, Durability::Flush).unwrap();
        aof.append(&Operation::new("SET", ["a", "1"])).unwrap();

        // A directory where the temporary file should go makes the rewrite fail
        fs::create_dir(rewrite_path(&path)).unwrap();
        assert!(aof.rewrite(vec![Operation::new("SET", ["a", "1"])]).is_err());

        // Appends still reach the file at `path`
        aof.append(&Operation::new("SET", ["b", "2"])).unwrap();
        aof.close().unwrap();

        assert_eq!(
            replay_ops(&path),
            vec![
                Operation::new("SET", ["a", "1"]),
                Operation::new("SET", ["b", "2"]),
            ]
        );
    }

    #[test]
    fn test_rewrite_with_oversized_operation_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("oversized.aof");

        let aof = Aof::open(&path, Durability::Flush).unwrap();
        aof.append(&Operation::new("SET", ["a", "1"])).unwrap();

        let huge = Operation::new(
            "SET",
            [
                bytes::Bytes::from_static(b"big"),
                bytes::Bytes::from(vec![0u8; codec::MAX_BODY_LEN]),
            ],
        );
        assert!(matches!(
            aof.rewrite(vec![Operation::new("SET", ["b", "2"]), huge]),
            Err(AofError::FrameTooLarge { .. })
        ));
        assert!(!rewrite_path(&path).exists());

        aof.append(&Operation::new("SET", ["c", "3"])).unwrap();
        aof.close().unwrap();
        assert_eq!(
            replay_ops(&path),
            vec![
                Operation::new("SET", ["a", "1"]),
                Operation::new("SET", ["c", "3"]),
            ]
        );
    }

    #[test]
    fn test_rewrite_path_sits_next_to_log() {
        let path = Path::new("/var/lib/oxikv/data.aof");
        assert_eq!(
            rewrite_path(path),
            PathBuf::from("/var/lib/oxikv/data.aof.rewrite")
        );
    }
}
