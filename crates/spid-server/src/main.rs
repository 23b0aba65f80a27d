//! # SPID service provider
//!
//! Main entry point for the SPID handshake server.

#![forbid(unsafe_code)]

use spid_server::{Server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("SPID service provider starting...");

    let config = ServerConfig::from_env()?;
    Server::new(config)?.run().await
}
