//! Append-Only File (AOF) persistence module
//!
//! Provides durability by logging every write operation to disk before it is
//! applied. Each operation is written as a length-prefixed, checksummed frame;
//! on startup the log is replayed to rebuild the in-memory state.

mod codec;
mod error;
mod handle;
mod log_file;
mod operation;
mod reader;
mod rewrite;
mod syncer;
mod writer;

pub use codec::{check_frame_size, decode, encode, encode_to, encoded_len};
pub use error::{AofError, DecodeError};
pub use handle::{Aof, AofStats};
pub use operation::Operation;
pub use reader::{ReplayReport, ReplayState};

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// AOF sync policy, as written in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPolicy {
    /// Keep frames in a user-space buffer; the OS sees them when the buffer fills
    No,
    /// Hand every frame to the OS (survives a process crash)
    Flush,
    /// Sync to stable storage after every write (safest, slowest)
    Always,
    /// Sync on a background timer (balanced)
    #[default]
    Everysec,
}

/// Durability applied to each appended frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// Buffer only, may be lost on crash
    None,
    /// Flush to OS buffers on every write
    Flush,
    /// fsync on every write
    SyncEveryWrite,
    /// Flush on every write, fsync from a background thread at this interval
    SyncPeriodic(Duration),
}

impl Durability {
    /// Interval of the background syncer, if this policy uses one
    pub fn sync_interval(&self) -> Option<Duration> {
        match self {
            Durability::SyncPeriodic(interval) => Some(*interval),
            _ => None,
        }
    }
}

/// AOF configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AofConfig {
    /// Whether to enable AOF
    pub enabled: bool,
    /// Path to the AOF file
    pub path: PathBuf,
    /// Sync policy
    pub appendfsync: SyncPolicy,
    /// Interval used by the `everysec` policy
    pub sync_interval_ms: u64,
}

impl AofConfig {
    /// Durability policy derived from `appendfsync`
    pub fn durability(&self) -> Durability {
        match self.appendfsync {
            SyncPolicy::No => Durability::None,
            SyncPolicy::Flush => Durability::Flush,
            SyncPolicy::Always => Durability::SyncEveryWrite,
            SyncPolicy::Everysec => {
                Durability::SyncPeriodic(Duration::from_millis(self.sync_interval_ms.max(1)))
            }
        }
    }
}

impl Default for AofConfig {
    fn default() -> Self {
        AofConfig {
            enabled: true,
            path: PathBuf::from("oxikv.aof"),
            appendfsync: SyncPolicy::default(),
            sync_interval_ms: 1000,
        }
    }
}
