//! # spid-server
//!
//! Axum front end for a SPID service provider.
//!
//! Serves the identity provider selection page and starts login and logout
//! handshakes, handing the browser an auto-submitting form addressed to the
//! chosen IdP. The assertion consumer that processes IdP responses is a
//! separate component.
//!
//! ## Usage
//!
//! ```ignore
//! use spid_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! let server = Server::new(config)?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod cookies;
pub mod handlers;
pub mod pages;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use router::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

/// The SPID service provider server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// This loads the IdP registry and the signing credential.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            state: AppState::from_config(config)?,
        })
    }

    /// Runs the server until it receives a shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Runs the server until `shutdown` completes.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let config = self.state.config();
        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on http://{}", listener.local_addr()?);

        #[cfg(unix)]
        spawn_credential_reloader(self.state.clone());

        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the application state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Creates a test router without starting the server.
    pub fn test_router(&self) -> Router {
        create_router(self.state.clone())
    }
}

/// Reloads the signing credential on SIGHUP.
#[cfg(unix)]
fn spawn_credential_reloader(state: AppState) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "SIGHUP handler unavailable; credential reload disabled"
                );
                return;
            }
        };
        while hangup.recv().await.is_some() {
            let reloading = state.clone();
            let reloaded =
                tokio::task::spawn_blocking(move || reloading.orchestrator().keys().reload()).await;
            match reloaded {
                Ok(Ok(credential)) => {
                    tracing::info!(subject = credential.subject(), "signing credential reloaded");
                }
                Ok(Err(e)) => {
                    tracing::error!(
                        error = %e,
                        "credential reload failed; keeping previous credential"
                    );
                }
                Err(e) => tracing::error!(error = %e, "credential reload task failed"),
            }
        }
    });
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
