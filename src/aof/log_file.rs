//! Open log file plus its user-space write buffer

use super::{codec, Durability, Operation};
use bytes::BytesMut;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::{error, warn};

/// Pending bytes above this size are written out even under `Durability::None`
const PENDING_FLUSH_THRESHOLD: usize = 64 * 1024;

/// The AOF file and the bytes not yet handed to the OS
///
/// Only ever accessed through the handle's mutex.
pub(super) struct LogFile {
    file: File,
    pending: BytesMut,
    /// Bytes known to be in the file (excludes `pending`)
    flushed_len: u64,
    /// Whether the file has writes not yet fsynced
    dirty: bool,
    pub(super) last_write_ok: bool,
}

impl LogFile {
    /// Open (creating if absent) for reading and appending
    pub(super) fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let flushed_len = file.metadata()?.len();

        Ok(LogFile {
            file,
            pending: BytesMut::with_capacity(PENDING_FLUSH_THRESHOLD),
            flushed_len,
            dirty: false,
            last_write_ok: true,
        })
    }

    /// Logical length: bytes on disk plus bytes still buffered
    pub(super) fn len(&self) -> u64 {
        self.flushed_len + self.pending.len() as u64
    }

    /// A second descriptor on the same file, for reading
    pub(super) fn reader_handle(&self) -> io::Result<File> {
        self.file.try_clone()
    }

    /// Encode and write one frame according to the durability policy
    ///
    /// On failure the frame is dropped from the buffer and the file is cut back
    /// to its last good length, so no partial frame is left behind.
    pub(super) fn write_frame(&mut self, op: &Operation, durability: Durability) -> io::Result<u64> {
        let mark = self.pending.len();
        let frame_start = self.flushed_len + mark as u64;
        codec::encode_to(&mut self.pending, op);
        let frame_len = (self.pending.len() - mark) as u64;

        let result = match durability {
            Durability::None if self.pending.len() < PENDING_FLUSH_THRESHOLD => Ok(()),
            Durability::None | Durability::Flush | Durability::SyncPeriodic(_) => self.flush_pending(),
            Durability::SyncEveryWrite => self.sync().map(|_| ()),
        };

        if let Err(e) = result {
            if self.pending.len() > mark {
                self.pending.truncate(mark);
            } else if self.flushed_len > frame_start {
                // Frame reached the file but the sync failed
                self.flushed_len = frame_start;
                self.rollback();
            }
            self.last_write_ok = false;
            return Err(e);
        }

        self.last_write_ok = true;
        Ok(frame_len)
    }

    /// Hand buffered bytes to the OS
    pub(super) fn flush_pending(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.file.write_all(&self.pending) {
            error!("AOF write of {} bytes failed: {}", self.pending.len(), e);
            self.rollback();
            return Err(e);
        }

        self.flushed_len += self.pending.len() as u64;
        self.pending.clear();
        self.dirty = true;
        Ok(())
    }

    /// Flush and force everything to stable storage
    ///
    /// Returns whether an fsync was actually issued.
    pub(super) fn sync(&mut self) -> io::Result<bool> {
        self.flush_pending()?;
        if !self.dirty {
            return Ok(false);
        }
        self.file.sync_data()?;
        self.dirty = false;
        Ok(true)
    }

    /// Cut the file down to `len` bytes (used to drop a torn tail)
    pub(super) fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.flush_pending()?;
        self.file.set_len(len)?;
        self.file.sync_all()?;
        self.flushed_len = len;
        self.dirty = false;
        Ok(())
    }

    /// Remove whatever part of the pending bytes reached the file
    fn rollback(&mut self) {
        if let Err(e) = self.file.set_len(self.flushed_len) {
            warn!(
                "Could not roll AOF back to {} bytes after failed write: {}",
                self.flushed_len, e
            );
        }
    }

    /// Write pending bytes and sync the whole file (data and metadata)
    pub(super) fn close(&mut self) -> io::Result<()> {
        self.flush_pending()?;
        self.file.sync_all()?;
        self.dirty = false;
        Ok(())
    }
}
