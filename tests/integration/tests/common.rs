//! Common test utilities and fixtures.

use std::net::TcpListener;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::{redirect::Policy, Client};
use tokio::sync::oneshot;
use tokio::time::sleep;

use kc_server::{Server, ServerConfig};

/// Entity id of the hosted SP.
pub const SP_ENTITY_ID: &str = "https://sp.example.org/saml";

/// Entity id of the default IDP.
pub const DEFAULT_IDP: &str = "https://idp.example/entity";

/// Entity id of the second IDP.
pub const OTHER_IDP: &str = "https://other.example";

const SP_CERT: &str = include_str!("../../../crates/kc-saml-sp/testdata/sp-signing.crt");
const SP_KEY: &str = include_str!("../../../crates/kc-saml-sp/testdata/sp-signing.key");

/// Builds a federation with the hosted SP and two IDPs.
pub fn federation(discovery_enabled: bool) -> serde_json::Value {
    serde_json::json!({
        "hostedSp": SP_ENTITY_ID,
        "defaultIdp": DEFAULT_IDP,
        "entities": [
            {
                "entityId": SP_ENTITY_ID,
                "roles": [{
                    "role": "sp",
                    "assertionConsumerServices": [
                        {
                            "index": 0,
                            "isDefault": true,
                            "binding": "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
                            "location": "https://sp.example.org/saml/SSO"
                        },
                        {
                            "index": 1,
                            "binding": "urn:oasis:names:tc:SAML:2.0:bindings:PAOS",
                            "location": "https://sp.example.org/saml/SSO/ECP"
                        }
                    ]
                }],
                "extended": {
                    "local": true,
                    "alias": "sp1",
                    "idpDiscoveryEnabled": discovery_enabled,
                    "ecpEnabled": true
                }
            },
            {
                "entityId": DEFAULT_IDP,
                "roles": [{
                    "role": "idp",
                    "singleSignOnServices": [{
                        "binding": "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
                        "location": "https://idp.example/sso"
                    }]
                }]
            },
            {
                "entityId": OTHER_IDP,
                "roles": [{
                    "role": "idp",
                    "singleSignOnServices": [{
                        "binding": "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
                        "location": "https://other.example/sso"
                    }]
                }]
            }
        ],
        "credentials": [
            { "alias": "sp-signing", "certificate": SP_CERT, "privateKey": SP_KEY, "default": true }
        ]
    })
}

/// Test environment that manages the server.
pub struct TestEnv {
    /// Base URL of the running server.
    pub base_url: String,
    /// HTTP client that does not follow redirects.
    pub client: Client,
    /// Federation file backing the server.
    federation_file: PathBuf,
    /// Server shutdown signal.
    _shutdown_tx: oneshot::Sender<()>,
}

impl TestEnv {
    /// Starts a server with the default federation.
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_federation(federation(false)).await
    }

    /// Starts a server backed by the given federation file contents.
    pub async fn with_federation(federation: serde_json::Value) -> anyhow::Result<Self> {
        // Initialize tracing for tests
        let _ = tracing_subscriber::fmt()
            .with_env_filter("kc_server=debug,kc_saml_sp=debug")
            .try_init();

        let federation_file =
            std::env::temp_dir().join(format!("kc-sp-federation-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&federation_file, serde_json::to_vec_pretty(&federation)?)?;

        // Find available port for server
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let server_port = listener.local_addr()?.port();
        drop(listener);

        let base_url = format!("http://127.0.0.1:{}", server_port);

        let mut config = ServerConfig::for_testing(&federation_file);
        config.port = server_port;
        config.base_url = base_url.clone();

        // Create shutdown channel
        let (_shutdown_tx, shutdown_rx) = oneshot::channel();

        // Start server
        let server = Server::new(config)?;
        tokio::spawn(async move {
            tokio::select! {
                result = server.run() => {
                    if let Err(e) = result {
                        tracing::error!("Server error: {}", e);
                    }
                }
                _ = shutdown_rx => {
                    tracing::info!("Server shutdown requested");
                }
            }
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(Policy::none())
            .build()?;

        wait_for_server(&client, &base_url).await?;

        Ok(Self {
            base_url,
            client,
            federation_file,
            _shutdown_tx,
        })
    }

    /// Returns the login URL.
    pub fn login_url(&self) -> String {
        format!("{}/saml/login", self.base_url)
    }

    /// Sends a login request and returns the `Location` header of the redirect.
    pub async fn login_redirect(&self, query: &[(&str, &str)]) -> anyhow::Result<url::Url> {
        let response = self.client.get(self.login_url()).query(query).send().await?;
        anyhow::ensure!(
            response.status().as_u16() == 302,
            "Expected redirect, got {}",
            response.status()
        );
        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| anyhow::anyhow!("redirect without Location header"))?;
        Ok(url::Url::parse(&self.base_url)?.join(location)?)
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.federation_file);
    }
}

/// Returns the value of a query parameter of `url`.
pub fn query_param(url: &url::Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Waits for the server to be ready.
async fn wait_for_server(client: &Client, base_url: &str) -> anyhow::Result<()> {
    let health_url = format!("{}/health", base_url);
    let max_attempts = 50;

    for attempt in 1..=max_attempts {
        match client.get(&health_url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Server ready after {} attempts", attempt);
                return Ok(());
            }
            Ok(response) => {
                tracing::debug!(
                    "Server not ready (status {}), attempt {}/{}",
                    response.status(),
                    attempt,
                    max_attempts
                );
            }
            Err(e) => {
                tracing::debug!(
                    "Server not ready ({}), attempt {}/{}",
                    e,
                    attempt,
                    max_attempts
                );
            }
        }
        sleep(Duration::from_millis(100)).await;
    }

    anyhow::bail!("Server did not become ready in time")
}
