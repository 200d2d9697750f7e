//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use kc_saml_sp::endpoints::SpState;
use kc_saml_sp::event::TracingEventLogger;
use kc_saml_sp::storage::SharedMessageStorageFactory;
use kc_saml_sp::{MetadataStore, SsoEntryPoint};

use crate::config::ServerConfig;
use crate::providers::SamlProviders;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,

    /// Metadata store.
    pub metadata: Arc<dyn MetadataStore>,

    /// The authentication-initiation pipeline.
    pub entry_point: Arc<SsoEntryPoint>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: ServerConfig, providers: SamlProviders) -> Self {
        let metadata: Arc<dyn MetadataStore> = providers.metadata;
        let entry_point = SsoEntryPoint::with_standard_initiators(
            metadata.clone(),
            providers.keys,
            Arc::new(SharedMessageStorageFactory::new()),
            Arc::new(TracingEventLogger),
        )
        .with_options(providers.options)
        .with_anchor_fallback(providers.anchor_fallback);

        Self {
            config,
            metadata,
            entry_point: Arc::new(entry_point),
        }
    }

    /// Gets the state for the service provider endpoints.
    pub fn sp_state(&self) -> SpState {
        SpState::new(self.entry_point.clone()).with_context_path(self.config.context_path.as_str())
    }

    /// Returns the server configuration.
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }
}
