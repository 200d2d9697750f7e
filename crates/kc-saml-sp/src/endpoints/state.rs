//! Shared state of the service provider endpoints.

use std::sync::Arc;

use crate::entry_point::SsoEntryPoint;

/// State handed to the login handler.
#[derive(Clone)]
pub struct SpState {
    /// The authentication-initiation pipeline.
    pub entry_point: Arc<SsoEntryPoint>,
    /// Path the router is mounted under, without a trailing slash.
    pub context_path: String,
}

impl SpState {
    /// Creates state for a router mounted at the root.
    pub fn new(entry_point: Arc<SsoEntryPoint>) -> Self {
        Self {
            entry_point,
            context_path: String::new(),
        }
    }

    /// Sets the path the router is mounted under.
    #[must_use]
    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into().trim_end_matches('/').to_string();
        self
    }
}
