//! AOF error types

use std::io;
use thiserror::Error;

/// Errors raised while decoding a single frame
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stream ended before the frame was complete (torn write)
    #[error("incomplete frame: needed {needed} bytes, got {available}")]
    Incomplete { needed: u64, available: u64 },

    /// The frame's structure is inconsistent
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The underlying reader failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors surfaced by the AOF handle
#[derive(Debug, Error)]
pub enum AofError {
    /// Filesystem or device failure
    #[error("AOF I/O error: {0}")]
    Io(#[from] io::Error),

    /// Structural corruption found before the end of the log
    #[error("corrupt AOF at byte offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// The operation does not fit in a single frame
    #[error("operation needs a {len} byte frame body, limit is {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// Replay was requested on a handle that already replayed
    #[error("AOF has already been replayed on this handle")]
    AlreadyReplayed,
}
