//! Credentials and key stores.
//!
//! A [`Credential`] bundles a certificate chain with an optional private key
//! under a logical alias. The [`KeyStore`] trait resolves aliases to
//! credentials for signing, decryption and TLS.

mod pem;
mod store;

pub use pem::*;
pub use store::*;

use std::fmt;
use std::sync::Arc;

use x509_parser::prelude::{FromDer, GeneralName, X509Certificate};

use crate::error::{SpError, SpResult};
use crate::signature::{sign_data, SignatureAlgorithm};

/// A named certificate chain with an optional private key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Alias of the credential in its key store.
    pub name: String,
    /// Entity the credential belongs to, when known.
    pub entity_id: Option<String>,
    /// DER certificates, leaf first.
    pub certificate_chain: Vec<Vec<u8>>,
    private_key: Option<Arc<Vec<u8>>>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("entity_id", &self.entity_id)
            .field("certificates", &self.certificate_chain.len())
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Credential {
    /// Creates a credential from DER certificates (leaf first).
    #[must_use]
    pub fn new(name: impl Into<String>, certificate_chain: Vec<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            entity_id: None,
            certificate_chain,
            private_key: None,
        }
    }

    /// Loads a credential from a PEM certificate chain and optional PKCS#8 key.
    pub fn from_pem(
        name: impl Into<String>,
        certificate_pem: &str,
        private_key_pem: Option<&str>,
    ) -> SpResult<Self> {
        let name = name.into();
        let chain = pem_blocks(certificate_pem, "CERTIFICATE")?;
        if chain.is_empty() {
            return Err(SpError::InvalidCredential(format!(
                "credential {name} contains no certificate"
            )));
        }
        let mut credential = Self::new(name, chain);
        if let Some(key_pem) = private_key_pem {
            credential = credential.with_private_key(pem_to_der(key_pem, "PRIVATE KEY")?);
        }
        Ok(credential)
    }

    /// Attaches a PKCS#8 DER private key.
    #[must_use]
    pub fn with_private_key(mut self, private_key_der: Vec<u8>) -> Self {
        self.private_key = Some(Arc::new(private_key_der));
        self
    }

    /// Sets the owning entity.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Returns true if the credential can sign and decrypt.
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// Returns the end-entity certificate.
    #[must_use]
    pub fn leaf_certificate(&self) -> Option<&[u8]> {
        self.certificate_chain.first().map(Vec::as_slice)
    }

    /// Returns the raw subject public key of the leaf certificate.
    pub fn public_key(&self) -> SpResult<Vec<u8>> {
        let leaf = self.leaf()?;
        let (_, cert) = parse_certificate(leaf)?;
        Ok(cert.public_key().subject_public_key.data.to_vec())
    }

    /// Returns the names the leaf certificate is issued to.
    pub fn subject_names(&self) -> SpResult<CertificateNames> {
        let (_, cert) = parse_certificate(self.leaf()?)?;
        Ok(CertificateNames::from_certificate(&cert))
    }

    /// Signs `data` with the private key.
    pub fn sign(&self, data: &[u8], algorithm: SignatureAlgorithm) -> SpResult<Vec<u8>> {
        let key = self.private_key.as_ref().ok_or_else(|| {
            SpError::InvalidCredential(format!("credential {} has no private key", self.name))
        })?;
        sign_data(key, data, algorithm)
    }

    fn leaf(&self) -> SpResult<&[u8]> {
        self.leaf_certificate().ok_or_else(|| {
            SpError::InvalidCredential(format!("credential {} has no certificate", self.name))
        })
    }
}

/// Identities a certificate is issued to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateNames {
    /// Full subject distinguished name.
    pub subject_dn: String,
    /// Subject common names.
    pub common_names: Vec<String>,
    /// `dNSName` subject alternative names.
    pub dns_names: Vec<String>,
    /// `uniformResourceIdentifier` subject alternative names.
    pub uris: Vec<String>,
}

impl CertificateNames {
    /// Collects the subject and alternative names of a parsed certificate.
    #[must_use]
    pub fn from_certificate(cert: &X509Certificate<'_>) -> Self {
        let mut names = Self {
            subject_dn: cert.subject().to_string(),
            common_names: cert
                .subject()
                .iter_common_name()
                .filter_map(|cn| cn.as_str().ok())
                .map(String::from)
                .collect(),
            ..Self::default()
        };

        if let Ok(Some(san_ext)) = cert.subject_alternative_name() {
            for name in &san_ext.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => names.dns_names.push((*dns).to_string()),
                    GeneralName::URI(uri) => names.uris.push((*uri).to_string()),
                    _ => {}
                }
            }
        }
        names
    }

    /// Returns true if any name equals `name`.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.subject_dn == name
            || self.common_names.iter().any(|cn| cn == name)
            || self.dns_names.iter().any(|dns| dns.eq_ignore_ascii_case(name))
            || self.uris.iter().any(|uri| uri == name)
    }
}

/// Parses a DER certificate.
pub(crate) fn parse_certificate(der: &[u8]) -> SpResult<(&[u8], X509Certificate<'_>)> {
    X509Certificate::from_der(der)
        .map_err(|e| SpError::InvalidCredential(format!("failed to parse X.509 certificate: {e:?}")))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Credentials backed by the PEM files under `testdata/`.

    use super::Credential;

    pub(crate) const SP_SIGNING_CERT: &str = include_str!("../../testdata/sp-signing.crt");
    pub(crate) const SP_SIGNING_KEY: &str = include_str!("../../testdata/sp-signing.key");
    pub(crate) const SP_ENCRYPTION_CERT: &str = include_str!("../../testdata/sp-encryption.crt");
    pub(crate) const SP_ENCRYPTION_KEY: &str = include_str!("../../testdata/sp-encryption.key");
    pub(crate) const SP_TLS_CERT: &str = include_str!("../../testdata/sp-tls.crt");
    pub(crate) const SP_TLS_KEY: &str = include_str!("../../testdata/sp-tls.key");
    pub(crate) const CA_CERT: &str = include_str!("../../testdata/ca.crt");
    pub(crate) const IDP_CERT: &str = include_str!("../../testdata/idp.crt");
    pub(crate) const IDP_KEY: &str = include_str!("../../testdata/idp.key");
    pub(crate) const OTHER_IDP_CERT: &str = include_str!("../../testdata/other-idp.crt");
    pub(crate) const ROGUE_CERT: &str = include_str!("../../testdata/rogue.crt");

    pub(crate) fn sp_signing_credential() -> Credential {
        Credential::from_pem("sp-signing", SP_SIGNING_CERT, Some(SP_SIGNING_KEY)).unwrap()
    }

    pub(crate) fn sp_encryption_credential() -> Credential {
        Credential::from_pem("sp-encryption", SP_ENCRYPTION_CERT, Some(SP_ENCRYPTION_KEY)).unwrap()
    }

    pub(crate) fn sp_tls_credential() -> Credential {
        Credential::from_pem("sp-tls", SP_TLS_CERT, Some(SP_TLS_KEY)).unwrap()
    }

    pub(crate) fn ca_credential() -> Credential {
        Credential::from_pem("federation-ca", CA_CERT, None).unwrap()
    }

    pub(crate) fn idp_credential() -> Credential {
        Credential::from_pem("idp", IDP_CERT, Some(IDP_KEY)).unwrap()
    }

    pub(crate) fn rogue_credential() -> Credential {
        Credential::from_pem("rogue", ROGUE_CERT, None).unwrap()
    }

    /// Base64 body of a PEM certificate, as published in metadata.
    pub(crate) fn metadata_certificate(pem: &str) -> String {
        pem.lines()
            .filter(|line| !line.starts_with("-----"))
            .collect::<String>()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::signature::verify_data;

    #[test]
    fn loads_certificate_and_key() {
        let credential = sp_signing_credential();
        assert_eq!(credential.name, "sp-signing");
        assert_eq!(credential.certificate_chain.len(), 1);
        assert!(credential.has_private_key());
        assert!(!ca_credential().has_private_key());
    }

    #[test]
    fn debug_redacts_private_key() {
        let debug = format!("{:?}", sp_signing_credential());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("BEGIN"));
    }

    #[test]
    fn subject_names_include_alternative_names() {
        let names = idp_credential().subject_names().unwrap();
        assert_eq!(names.common_names, vec!["idp.example.com".to_string()]);
        assert_eq!(names.dns_names, vec!["idp.example.com".to_string()]);
        assert_eq!(names.uris, vec!["https://idp.example/entity".to_string()]);
        assert!(names.subject_dn.contains("CN=idp.example.com"));
        assert!(names.matches("https://idp.example/entity"));
        assert!(names.matches("IDP.example.com"));
        assert!(!names.matches("https://other.example"));
    }

    #[test]
    fn signature_verifies_with_own_public_key() {
        let credential = sp_signing_credential();
        let sig = credential.sign(b"payload", SignatureAlgorithm::RsaSha256).unwrap();

        assert!(verify_data(
            &credential.public_key().unwrap(),
            b"payload",
            &sig,
            SignatureAlgorithm::RsaSha256
        ));
        assert!(!verify_data(
            &idp_credential().public_key().unwrap(),
            b"payload",
            &sig,
            SignatureAlgorithm::RsaSha256
        ));
    }

    #[test]
    fn signing_without_key_fails() {
        let err = ca_credential()
            .sign(b"payload", SignatureAlgorithm::RsaSha256)
            .unwrap_err();
        assert!(matches!(err, SpError::InvalidCredential(_)));
    }

    #[test]
    fn empty_pem_is_rejected() {
        assert!(Credential::from_pem("empty", "", None).is_err());
    }
}
