//! Background fsync for the periodic durability policy

use super::handle::Shared;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// A thread that syncs the log every `interval`
///
/// Dropping the syncer stops the thread and waits for it to exit.
pub(super) struct Syncer {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Syncer {
    pub(super) fn spawn(shared: Arc<Shared>, interval: Duration) -> io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("aof-syncer".to_string())
            .spawn(move || {
                debug!("AOF syncer started ({:?} interval)", interval);
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if let Err(e) = shared.sync() {
                                warn!("Periodic AOF sync of {:?} failed: {}", shared.path, e);
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("AOF syncer stopped");
            })?;

        Ok(Syncer {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }
}

impl Drop for Syncer {
    fn drop(&mut self) {
        // Disconnecting the channel wakes the thread immediately
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("AOF syncer thread panicked");
            }
        }
    }
}
