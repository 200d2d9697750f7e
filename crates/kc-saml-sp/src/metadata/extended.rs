//! Per-entity configuration that SAML metadata cannot express.

use serde::{Deserialize, Serialize};

fn default_security_profile() -> String {
    "metaiop".to_string()
}

fn default_ssl_security_profile() -> String {
    "pkix".to_string()
}

fn default_hostname_verification() -> String {
    "default".to_string()
}

/// Extended metadata of a local or remote entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedMetadata {
    /// Whether the entity is hosted by this deployment.
    #[serde(default)]
    pub local: bool,

    /// Alias used in `/alias/<name>` request paths.
    #[serde(default)]
    pub alias: Option<String>,

    /// Trust model for message signatures (`metaiop` or `pkix`).
    #[serde(default = "default_security_profile")]
    pub security_profile: String,

    /// Trust model for TLS connections (`metaiop` or `pkix`).
    #[serde(default = "default_ssl_security_profile")]
    pub ssl_security_profile: String,

    /// Hostname verification policy for TLS connections.
    #[serde(default = "default_hostname_verification")]
    pub ssl_hostname_verification: String,

    /// Alias of the signing credential.
    #[serde(default)]
    pub signing_key: Option<String>,

    /// Alias of the encryption credential.
    #[serde(default)]
    pub encryption_key: Option<String>,

    /// Alias of the TLS client credential.
    #[serde(default)]
    pub tls_key: Option<String>,

    /// Key store aliases trusted as PKIX anchors for this entity.
    ///
    /// `None` and an empty list differ: only `None` lets the anchor fallback
    /// policy apply.
    #[serde(default)]
    pub trusted_keys: Option<Vec<String>>,

    /// Whether users pick their IDP through a discovery service.
    #[serde(default)]
    pub idp_discovery_enabled: bool,

    /// Discovery service URL.
    #[serde(default)]
    pub idp_discovery_url: Option<String>,

    /// Whether the Enhanced Client/Proxy profile is accepted.
    #[serde(default)]
    pub ecp_enabled: bool,

    /// Assertion consumer service index requested by default.
    #[serde(default)]
    pub assertion_consumer_index: Option<u32>,

    /// Signature algorithm URI for outbound requests.
    #[serde(default)]
    pub signing_algorithm: Option<String>,
}

impl Default for ExtendedMetadata {
    fn default() -> Self {
        Self {
            local: false,
            alias: None,
            security_profile: default_security_profile(),
            ssl_security_profile: default_ssl_security_profile(),
            ssl_hostname_verification: default_hostname_verification(),
            signing_key: None,
            encryption_key: None,
            tls_key: None,
            trusted_keys: None,
            idp_discovery_enabled: false,
            idp_discovery_url: None,
            ecp_enabled: false,
            assertion_consumer_index: None,
            signing_algorithm: None,
        }
    }
}

impl ExtendedMetadata {
    /// Creates configuration for an entity hosted by this deployment.
    #[must_use]
    pub fn local() -> Self {
        Self {
            local: true,
            ..Self::default()
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let parsed: ExtendedMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, ExtendedMetadata::default());
        assert_eq!(parsed.security_profile, "metaiop");
        assert_eq!(parsed.ssl_security_profile, "pkix");
        assert_eq!(parsed.ssl_hostname_verification, "default");
        assert!(parsed.trusted_keys.is_none());
    }

    #[test]
    fn camel_case_keys() {
        let parsed: ExtendedMetadata = serde_json::from_str(
            r#"{
                "local": true,
                "alias": "sp1",
                "securityProfile": "pkix",
                "signingKey": "sp-signing",
                "trustedKeys": [],
                "idpDiscoveryEnabled": true,
                "idpDiscoveryUrl": "https://disco.example/ds",
                "ecpEnabled": true,
                "assertionConsumerIndex": 2
            }"#,
        )
        .unwrap();

        assert!(parsed.local);
        assert_eq!(parsed.alias.as_deref(), Some("sp1"));
        assert_eq!(parsed.security_profile, "pkix");
        assert_eq!(parsed.signing_key.as_deref(), Some("sp-signing"));
        assert_eq!(parsed.trusted_keys, Some(Vec::new()));
        assert!(parsed.idp_discovery_enabled);
        assert!(parsed.ecp_enabled);
        assert_eq!(parsed.assertion_consumer_index, Some(2));
    }
}
