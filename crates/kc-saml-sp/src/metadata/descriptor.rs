//! SAML 2.0 metadata descriptors.
//!
//! The structures mirror `md:EntityDescriptor` and deserialize from the JSON
//! federation document with camelCase keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::credential::certificate_der;
use crate::error::SpResult;
use crate::types::{SamlBinding, SAMLP_NS};

/// Role an entity plays in a SAML exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityRole {
    /// Service provider.
    Sp,
    /// Identity provider.
    Idp,
}

impl fmt::Display for EntityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sp => f.write_str("SP"),
            Self::Idp => f.write_str("IDP"),
        }
    }
}

/// A protocol endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Binding URI.
    pub binding: String,
    /// Endpoint URL.
    pub location: String,
    /// `hoksso:ProtocolBinding` of Holder-of-Key endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hok_protocol_binding: Option<String>,
}

impl Endpoint {
    /// Returns the parsed binding.
    #[must_use]
    pub fn parsed_binding(&self) -> Option<SamlBinding> {
        SamlBinding::from_uri(&self.binding)
    }
}

/// An endpoint addressed by index, such as an assertion consumer service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedEndpoint {
    /// Endpoint index.
    pub index: u32,
    /// Explicit `isDefault` flag, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    /// Binding URI.
    pub binding: String,
    /// Endpoint URL.
    pub location: String,
    /// `hoksso:ProtocolBinding` of Holder-of-Key endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hok_protocol_binding: Option<String>,
}

impl IndexedEndpoint {
    /// Returns the parsed binding.
    #[must_use]
    pub fn parsed_binding(&self) -> Option<SamlBinding> {
        SamlBinding::from_uri(&self.binding)
    }
}

/// Purpose of a published key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyUsage {
    /// Signing key.
    Signing,
    /// Encryption key.
    Encryption,
}

/// Key material published in metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfo {
    /// `ds:KeyName` values.
    #[serde(default)]
    pub key_names: Vec<String>,
    /// `ds:X509Certificate` values, PEM or bare base64.
    #[serde(default)]
    pub x509_certificates: Vec<String>,
}

impl KeyInfo {
    /// Decodes the published certificates.
    pub fn certificates_der(&self) -> SpResult<Vec<Vec<u8>>> {
        self.x509_certificates
            .iter()
            .map(|cert| certificate_der(cert))
            .collect()
    }
}

/// `md:KeyDescriptor`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDescriptor {
    /// Key usage; absent means the key serves both purposes.
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<KeyUsage>,
    /// The key material.
    #[serde(default)]
    pub key_info: KeyInfo,
}

impl KeyDescriptor {
    /// Returns true if the key may be used to verify signatures.
    #[must_use]
    pub fn is_signing(&self) -> bool {
        matches!(self.usage, None | Some(KeyUsage::Signing))
    }
}

fn default_protocol_support() -> Vec<String> {
    vec![SAMLP_NS.to_string()]
}

/// `md:SPSSODescriptor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpSsoDescriptor {
    /// Supported protocols.
    #[serde(rename = "protocolSupportEnumeration", default = "default_protocol_support")]
    pub protocol_support: Vec<String>,
    /// Published keys.
    #[serde(default)]
    pub key_descriptors: Vec<KeyDescriptor>,
    /// Whether this SP signs its authentication requests.
    #[serde(default)]
    pub authn_requests_signed: bool,
    /// Whether this SP wants signed assertions.
    #[serde(default)]
    pub want_assertions_signed: bool,
    /// Supported name identifier formats.
    #[serde(default)]
    pub name_id_formats: Vec<String>,
    /// Assertion consumer services.
    #[serde(default)]
    pub assertion_consumer_services: Vec<IndexedEndpoint>,
}

impl SpSsoDescriptor {
    /// Returns the assertion consumer service with `index`.
    #[must_use]
    pub fn assertion_consumer_service(&self, index: u32) -> Option<&IndexedEndpoint> {
        self.assertion_consumer_services
            .iter()
            .find(|acs| acs.index == index)
    }

    /// Returns the default assertion consumer service.
    ///
    /// The first endpoint flagged `isDefault="true"` wins, then the first
    /// endpoint without the flag, then the first endpoint.
    #[must_use]
    pub fn default_assertion_consumer_service(&self) -> Option<&IndexedEndpoint> {
        let services = &self.assertion_consumer_services;
        services
            .iter()
            .find(|acs| acs.is_default == Some(true))
            .or_else(|| services.iter().find(|acs| acs.is_default.is_none()))
            .or_else(|| services.first())
    }

    /// Returns the first assertion consumer service using `binding`.
    #[must_use]
    pub fn assertion_consumer_service_for(&self, binding: SamlBinding) -> Option<&IndexedEndpoint> {
        self.assertion_consumer_services
            .iter()
            .find(|acs| acs.binding == binding.uri())
    }
}

/// `md:IDPSSODescriptor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpSsoDescriptor {
    /// Supported protocols.
    #[serde(rename = "protocolSupportEnumeration", default = "default_protocol_support")]
    pub protocol_support: Vec<String>,
    /// Published keys.
    #[serde(default)]
    pub key_descriptors: Vec<KeyDescriptor>,
    /// Whether this IDP requires signed authentication requests.
    #[serde(default)]
    pub want_authn_requests_signed: bool,
    /// Supported name identifier formats.
    #[serde(default)]
    pub name_id_formats: Vec<String>,
    /// Single sign-on services.
    #[serde(default)]
    pub single_sign_on_services: Vec<Endpoint>,
}

impl IdpSsoDescriptor {
    /// Returns the first single sign-on service using `binding`.
    #[must_use]
    pub fn single_sign_on_service(&self, binding: SamlBinding) -> Option<&Endpoint> {
        self.single_sign_on_services
            .iter()
            .find(|sso| sso.binding == binding.uri())
    }
}

/// A role descriptor of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RoleDescriptor {
    /// Service provider role.
    Sp(SpSsoDescriptor),
    /// Identity provider role.
    Idp(IdpSsoDescriptor),
}

impl RoleDescriptor {
    /// Returns the role this descriptor describes.
    #[must_use]
    pub const fn role(&self) -> EntityRole {
        match self {
            Self::Sp(_) => EntityRole::Sp,
            Self::Idp(_) => EntityRole::Idp,
        }
    }

    /// Returns true if the role supports `protocol`.
    #[must_use]
    pub fn supports_protocol(&self, protocol: &str) -> bool {
        let supported = match self {
            Self::Sp(sp) => &sp.protocol_support,
            Self::Idp(idp) => &idp.protocol_support,
        };
        supported.iter().any(|p| p == protocol)
    }

    /// Returns the published keys.
    #[must_use]
    pub fn key_descriptors(&self) -> &[KeyDescriptor] {
        match self {
            Self::Sp(sp) => &sp.key_descriptors,
            Self::Idp(idp) => &idp.key_descriptors,
        }
    }

    /// Returns the SP descriptor, if this is one.
    #[must_use]
    pub const fn as_sp(&self) -> Option<&SpSsoDescriptor> {
        match self {
            Self::Sp(sp) => Some(sp),
            Self::Idp(_) => None,
        }
    }

    /// Returns the IDP descriptor, if this is one.
    #[must_use]
    pub const fn as_idp(&self) -> Option<&IdpSsoDescriptor> {
        match self {
            Self::Idp(idp) => Some(idp),
            Self::Sp(_) => None,
        }
    }
}

/// `md:EntityDescriptor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDescriptor {
    /// Entity identifier.
    pub entity_id: String,
    /// Role descriptors.
    #[serde(default)]
    pub roles: Vec<RoleDescriptor>,
}

impl EntityDescriptor {
    /// Returns the descriptor for `role` supporting `protocol`.
    #[must_use]
    pub fn role_descriptor(&self, role: EntityRole, protocol: &str) -> Option<&RoleDescriptor> {
        self.roles
            .iter()
            .find(|descriptor| descriptor.role() == role && descriptor.supports_protocol(protocol))
    }

    /// Returns the SAML 2.0 SP descriptor.
    #[must_use]
    pub fn sp_descriptor(&self) -> Option<&SpSsoDescriptor> {
        self.role_descriptor(EntityRole::Sp, SAMLP_NS)
            .and_then(RoleDescriptor::as_sp)
    }

    /// Returns the SAML 2.0 IDP descriptor.
    #[must_use]
    pub fn idp_descriptor(&self) -> Option<&IdpSsoDescriptor> {
        self.role_descriptor(EntityRole::Idp, SAMLP_NS)
            .and_then(RoleDescriptor::as_idp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acs(index: u32, is_default: Option<bool>) -> IndexedEndpoint {
        IndexedEndpoint {
            index,
            is_default,
            binding: SamlBinding::HttpPost.uri().to_string(),
            location: format!("https://sp.example.org/acs/{index}"),
            hok_protocol_binding: None,
        }
    }

    fn sp_with(services: Vec<IndexedEndpoint>) -> SpSsoDescriptor {
        SpSsoDescriptor {
            protocol_support: default_protocol_support(),
            key_descriptors: Vec::new(),
            authn_requests_signed: false,
            want_assertions_signed: false,
            name_id_formats: Vec::new(),
            assertion_consumer_services: services,
        }
    }

    #[test]
    fn explicit_default_consumer_wins() {
        let sp = sp_with(vec![acs(0, None), acs(1, Some(true))]);
        assert_eq!(sp.default_assertion_consumer_service().unwrap().index, 1);
    }

    #[test]
    fn unflagged_consumer_beats_explicit_non_default() {
        let sp = sp_with(vec![acs(0, Some(false)), acs(1, None)]);
        assert_eq!(sp.default_assertion_consumer_service().unwrap().index, 1);
    }

    #[test]
    fn first_consumer_is_last_resort() {
        let sp = sp_with(vec![acs(3, Some(false)), acs(4, Some(false))]);
        assert_eq!(sp.default_assertion_consumer_service().unwrap().index, 3);
        assert!(sp_with(Vec::new()).default_assertion_consumer_service().is_none());
    }

    #[test]
    fn deserializes_tagged_roles() {
        let json = r#"{
            "entityId": "https://idp.example/entity",
            "roles": [{
                "role": "idp",
                "wantAuthnRequestsSigned": true,
                "keyDescriptors": [{"use": "signing", "keyInfo": {"keyNames": ["idp-key"]}}],
                "singleSignOnServices": [{
                    "binding": "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
                    "location": "https://idp.example/sso"
                }]
            }]
        }"#;
        let entity: EntityDescriptor = serde_json::from_str(json).unwrap();

        assert!(entity.sp_descriptor().is_none());
        let idp = entity.idp_descriptor().unwrap();
        assert!(idp.want_authn_requests_signed);
        assert_eq!(idp.protocol_support, vec![SAMLP_NS.to_string()]);
        assert_eq!(idp.key_descriptors[0].usage, Some(KeyUsage::Signing));
        assert_eq!(
            idp.single_sign_on_service(SamlBinding::HttpRedirect).unwrap().location,
            "https://idp.example/sso"
        );
        assert!(idp.single_sign_on_service(SamlBinding::HttpPost).is_none());
    }

    #[test]
    fn role_lookup_requires_protocol_support() {
        let entity = EntityDescriptor {
            entity_id: "urn:sp".to_string(),
            roles: vec![RoleDescriptor::Sp(SpSsoDescriptor {
                protocol_support: vec!["urn:oasis:names:tc:SAML:1.1:protocol".to_string()],
                ..sp_with(Vec::new())
            })],
        };
        assert!(entity.role_descriptor(EntityRole::Sp, SAMLP_NS).is_none());
        assert!(entity
            .role_descriptor(EntityRole::Sp, "urn:oasis:names:tc:SAML:1.1:protocol")
            .is_some());
    }

    #[test]
    fn key_usage_defaults_to_both() {
        assert!(KeyDescriptor::default().is_signing());
        let encryption = KeyDescriptor {
            usage: Some(KeyUsage::Encryption),
            ..KeyDescriptor::default()
        };
        assert!(!encryption.is_signing());
    }
}
