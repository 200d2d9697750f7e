//! Server configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults.

use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host to bind to.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Base URL for the server (used in generated URLs).
    pub base_url: String,

    /// Path the SAML endpoints are mounted under.
    pub context_path: String,

    /// JSON file describing entities, credentials and profile options.
    pub federation_file: PathBuf,

    /// Log level.
    pub log_level: String,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let host = std::env::var("KC_SP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("KC_SP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let base_url = std::env::var("KC_SP_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let context_path = std::env::var("KC_SP_CONTEXT_PATH")
            .map(|path| match path.trim_matches('/') {
                "" => String::new(),
                trimmed => format!("/{trimmed}"),
            })
            .unwrap_or_default();

        let federation_file = std::env::var("KC_SP_FEDERATION_FILE")
            .map(PathBuf::from)
            .map_err(|_| anyhow::anyhow!("KC_SP_FEDERATION_FILE environment variable is required"))?;

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            host,
            port,
            base_url,
            context_path,
            federation_file,
            log_level,
        })
    }

    /// Creates a configuration for testing.
    #[must_use]
    pub fn for_testing(federation_file: impl Into<PathBuf>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            base_url: "http://localhost:8080".to_string(),
            context_path: String::new(),
            federation_file: federation_file.into(),
            log_level: "debug".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            context_path: String::new(),
            federation_file: PathBuf::from("federation.json"),
            log_level: "info".to_string(),
        }
    }
}
