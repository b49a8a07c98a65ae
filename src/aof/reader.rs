//! AOF reader
//!
//! Replays the log from the start, handing every decoded operation to the caller.

use super::{codec, Aof, AofError, DecodeError, Operation};
use base64::{engine::general_purpose, Engine as _};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use tracing::{error, info, warn};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// How many bytes of a corrupt region to include in the diagnostic
const CORRUPT_PREVIEW_LEN: u64 = 32;

/// Progress of the replay on a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    /// Not replayed yet
    Start,
    /// Decoding frames
    Reading,
    /// Reached a clean end or a tolerated torn tail
    Done,
    /// Stopped on structural corruption
    Failed,
}

/// Outcome of a successful replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Operations handed to `apply`
    pub applied: usize,
    /// Bytes of complete frames read
    pub bytes_read: u64,
    /// Bytes of a torn trailing frame cut from the file
    pub truncated_bytes: u64,
}

impl Aof {
    /// Replay every complete frame in order
    ///
    /// A torn frame at the very end of the log (a write interrupted by a crash)
    /// is discarded and cut from the file so later appends start on a frame
    /// boundary. A malformed frame anywhere stops the replay with
    /// `AofError::Corrupt`; nothing after it is applied.
    ///
    /// Takes the handle exclusively, so no append can run concurrently.
    pub fn replay<F>(&mut self, mut apply: F) -> Result<ReplayReport, AofError>
    where
        F: FnMut(Operation),
    {
        if self.replay_state != ReplayState::Start {
            return Err(AofError::AlreadyReplayed);
        }
        self.replay_state = ReplayState::Reading;

        match self.replay_frames(&mut apply) {
            Ok(report) => {
                self.replay_state = ReplayState::Done;
                info!(
                    "AOF replayed from {:?}: {} operations, {} bytes",
                    self.shared.path, report.applied, report.bytes_read
                );
                Ok(report)
            }
            Err(e) => {
                self.replay_state = ReplayState::Failed;
                Err(e)
            }
        }
    }

    /// Current replay state
    pub fn replay_state(&self) -> ReplayState {
        self.replay_state
    }

    fn replay_frames(&mut self, apply: &mut dyn FnMut(Operation)) -> Result<ReplayReport, AofError> {
        let (file, file_len) = {
            let mut log = self.shared.log.lock();
            log.flush_pending()?;
            (log.reader_handle()?, log.len())
        };

        let mut report = ReplayReport::default();
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
        reader.seek(SeekFrom::Start(0))?;

        loop {
            let offset = report.bytes_read;
            match codec::decode(&mut reader) {
                Ok(Some(op)) => {
                    report.bytes_read += codec::encoded_len(&op) as u64;
                    report.applied += 1;
                    apply(op);
                }
                Ok(None) => break,
                Err(DecodeError::Incomplete { needed, available }) => {
                    let torn = file_len - offset;
                    warn!(
                        "AOF {:?} ends with a torn frame at offset {} ({} of {} bytes present); discarding {} bytes",
                        self.shared.path, offset, available, needed, torn
                    );
                    self.shared.log.lock().truncate(offset)?;
                    report.truncated_bytes = torn;
                    break;
                }
                Err(DecodeError::Malformed(reason)) => {
                    let preview = preview_at(reader.into_inner(), offset);
                    error!(
                        "Corrupt AOF {:?} at offset {}: {}. Bytes at offset (B64): {}",
                        self.shared.path, offset, reason, preview
                    );
                    return Err(AofError::Corrupt { offset, reason });
                }
                Err(DecodeError::Io(e)) => return Err(AofError::Io(e)),
            }
        }

        Ok(report)
    }
}

/// Base64 of the first bytes at `offset`, for the corruption diagnostic
fn preview_at(mut file: File, offset: u64) -> String {
    let mut buf = Vec::new();
    let read = file
        .seek(SeekFrom::Start(offset))
        .and_then(|_| (&mut file).take(CORRUPT_PREVIEW_LEN).read_to_end(&mut buf));
    match read {
        Ok(_) => general_purpose::STANDARD.encode(&buf),
        Err(e) => format!("<unreadable: {}>", e),
    }
}
