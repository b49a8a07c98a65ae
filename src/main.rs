use oxikv::{server, AofError, ServerConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("oxikv {} starting...", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => match ServerConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("{:#}", e);
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };

    if let Err(e) = server::run(config).await {
        if let Some(AofError::Corrupt { offset, .. }) = e.downcast_ref::<AofError>() {
            error!(
                "The append-only file is corrupt at byte {}; refusing to start",
                offset
            );
        }
        error!("{:#}", e);
        std::process::exit(1);
    }
}
