//! Server module
//!
//! Accepts TCP connections and hands each one to its own task. All
//! connections share one dispatcher, so commands (and their AOF appends) are
//! applied one at a time.

mod connection;

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info};

pub use connection::Connection;

/// Replay the AOF, then serve clients until Ctrl-C
///
/// The log is replayed before the listener is bound, so no client ever sees
/// a partially loaded store. On Ctrl-C the log is flushed, synced and closed.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::open(&config.aof)
        .with_context(|| format!("failed to load AOF {:?}", config.aof.path))?;
    let dispatcher = Arc::new(Mutex::new(dispatcher));

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tokio::select! {
        result = run_with_dispatcher(listener, dispatcher.clone()) => result?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("Shutdown requested");
        }
    }

    dispatcher
        .lock()
        .await
        .shutdown()
        .context("failed to close the AOF")?;
    info!("oxikv stopped");
    Ok(())
}

/// Serve clients from an already bound listener
pub async fn run_with_dispatcher(
    listener: TcpListener,
    dispatcher: Arc<Mutex<Dispatcher>>,
) -> anyhow::Result<()> {
    info!("oxikv RESP server listening on {}", listener.local_addr()?);

    loop {
        let (socket, addr) = listener.accept().await?;
        info!("New RESP connection from {}", addr);

        let dispatcher = dispatcher.clone();

        tokio::spawn(async move {
            let mut connection = Connection::new(socket);

            if let Err(e) = connection.handle(dispatcher).await {
                error!("Connection error from {}: {}", addr, e);
            }

            info!("Connection closed: {}", addr);
        });
    }
}
