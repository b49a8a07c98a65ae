//! Connection handling
//!
//! Reads requests off one client stream, runs them through the shared
//! dispatcher and writes the replies back in order.

use crate::dispatch::Dispatcher;
use crate::protocol::{RequestParser, RespValue};
use base64::{engine::general_purpose, Engine as _};
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Connection handler
///
/// Generic over the byte stream so it can be driven by a `TcpStream` or a
/// mock in tests.
pub struct Connection<S> {
    stream: S,

    /// Read buffer
    read_buffer: BytesMut,

    /// Write buffer
    write_buffer: BytesMut,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new connection handler
    pub fn new(stream: S) -> Self {
        Connection {
            stream,
            read_buffer: BytesMut::with_capacity(4096),
            write_buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Handle the connection
    ///
    /// Returns when the client closes the connection or sends a malformed
    /// request, which is answered with an error first.
    pub async fn handle(&mut self, dispatcher: Arc<Mutex<Dispatcher>>) -> anyhow::Result<()> {
        loop {
            let n = self.stream.read_buf(&mut self.read_buffer).await?;

            if n == 0 {
                if self.read_buffer.is_empty() {
                    return Ok(());
                }
                anyhow::bail!("connection reset by peer");
            }

            debug!("Read {} bytes", n);

            // Answer every complete request in the buffer, in order
            self.write_buffer.clear();
            loop {
                match RequestParser::parse(&mut self.read_buffer) {
                    Ok(Some(args)) => {
                        let response = {
                            let mut disp = dispatcher.lock().await;
                            dispatch_blocking(&mut disp, &args)
                        };
                        debug!("Response: {}", response);
                        response.encode_to(&mut self.write_buffer);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let shown = &self.read_buffer[..self.read_buffer.len().min(64)];
                        warn!(
                            "Protocol error: {}. Request start (B64): {}",
                            e,
                            general_purpose::STANDARD.encode(shown)
                        );
                        RespValue::error(format!("ERR protocol error: {}", e))
                            .encode_to(&mut self.write_buffer);
                        self.stream.write_all(&self.write_buffer).await?;
                        self.stream.flush().await?;
                        return Ok(());
                    }
                }
            }

            self.stream.write_all(&self.write_buffer).await?;
            self.stream.flush().await?;
        }
    }
}

/// Run one command, letting the runtime move other tasks off this worker
/// while it blocks on an AOF sync
fn dispatch_blocking(dispatcher: &mut Dispatcher, args: &[Bytes]) -> RespValue {
    match Handle::current().runtime_flavor() {
        RuntimeFlavor::MultiThread => tokio::task::block_in_place(|| dispatcher.dispatch(args)),
        _ => dispatcher.dispatch(args),
    }
}
