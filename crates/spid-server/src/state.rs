//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use anyhow::Context;
use spid_handshake::{
    CorrelationStore, FileKeyProvider, HandshakeOrchestrator, SpidRequestBuilder, StaticDirectory,
};

use crate::config::ServerConfig;

/// Orchestrator wired to file-backed configuration.
pub type SpidOrchestrator =
    HandshakeOrchestrator<StaticDirectory, FileKeyProvider, SpidRequestBuilder>;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Handshake orchestrator.
    pub orchestrator: Arc<SpidOrchestrator>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: ServerConfig, orchestrator: SpidOrchestrator) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Loads the IdP registry and signing credential named by `config`.
    pub fn from_config(config: ServerConfig) -> anyhow::Result<Self> {
        let directory = StaticDirectory::from_file(&config.idp_registry_path)?;
        let keys = FileKeyProvider::load(&config.certificate_path, &config.private_key_path)
            .context("loading signing credential")?;
        let store = CorrelationStore::new(config.cookie_secret.expose(), config.cookie_ttl())
            .context("configuring correlation cookie")?;
        let builder = SpidRequestBuilder::new(&config.entity_id)
            .with_attribute_consuming_index(config.attribute_consuming_index);

        tracing::info!(
            entity_id = %config.entity_id,
            environment = %config.environment,
            providers = directory.len(),
            "SPID service provider configured"
        );

        let orchestrator =
            HandshakeOrchestrator::new(Arc::new(directory), Arc::new(keys), builder, store);
        Ok(Self::new(config, orchestrator))
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the handshake orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &SpidOrchestrator {
        &self.orchestrator
    }
}
