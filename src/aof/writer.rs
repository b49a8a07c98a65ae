//! AOF writer
//!
//! Appends operations to the end of the log under the write guard.

use super::{codec, Aof, AofError, Durability, Operation};
use std::sync::atomic::Ordering;
use tracing::{error, trace, warn};

impl Aof {
    /// Append one operation to the log
    ///
    /// Blocks while another append, sync or rewrite holds the guard. Returns
    /// only after the frame has been written and the durability policy
    /// applied. On error the operation must be treated as not committed.
    ///
    /// An operation too large to decode again is refused before anything is
    /// written.
    pub fn append(&self, op: &Operation) -> Result<(), AofError> {
        if let Err(e) = codec::check_frame_size(op) {
            warn!("Refusing to append {}: {}", op, e);
            return Err(e);
        }

        let mut log = self.shared.log.lock();

        match log.write_frame(op, self.shared.durability) {
            Ok(frame_len) => {
                if self.shared.durability == Durability::SyncEveryWrite {
                    self.shared.syncs.fetch_add(1, Ordering::Relaxed);
                }
                self.shared.frames_appended.fetch_add(1, Ordering::Relaxed);
                trace!("AOF appended {} ({} bytes)", op, frame_len);
                Ok(())
            }
            Err(e) => {
                error!("Failed to append {} to AOF {:?}: {}", op, self.shared.path, e);
                Err(AofError::Io(e))
            }
        }
    }
}
