//! Trust engines.
//!
//! A trust engine decides whether a credential presented by a peer can be
//! trusted, either because its key is published in the peer's metadata
//! (explicit key) or because its certificate chains up to a configured
//! anchor (PKIX).

use std::collections::BTreeSet;
use std::sync::Arc;

use x509_parser::prelude::*;

use crate::context::PeerEntity;
use crate::credential::{parse_certificate, Credential, KeyStore};
use crate::error::SpResult;
use crate::metadata::{KeyDescriptor, MetadataStore};
use crate::signature::{verify_data, SignatureAlgorithm};
use crate::types::SAMLP_NS;

use super::AnchorFallback;

/// Longest certificate path walked during PKIX evaluation.
const MAX_PATH_LENGTH: usize = 10;

/// A trust engine; exactly one trust model per security surface.
#[derive(Clone)]
pub enum TrustEngine {
    /// Trusts keys published in the peer's metadata.
    ExplicitKey(ExplicitKeyTrustEngine),
    /// Trusts certificates chaining to the peer's anchors.
    Pkix(PkixTrustEngine),
}

impl std::fmt::Debug for TrustEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExplicitKey(_) => f.write_str("TrustEngine::ExplicitKey"),
            Self::Pkix(engine) => write!(f, "TrustEngine::Pkix({:?})", engine.anchor_fallback),
        }
    }
}

impl TrustEngine {
    /// Returns true for the PKIX model.
    #[must_use]
    pub const fn is_pkix(&self) -> bool {
        matches!(self, Self::Pkix(_))
    }

    /// Returns true if `candidate` is trusted for `peer`.
    pub fn validate(&self, candidate: &Credential, peer: &PeerEntity) -> SpResult<bool> {
        match self {
            Self::ExplicitKey(engine) => engine.validate(candidate, peer),
            Self::Pkix(engine) => engine.validate(candidate, peer),
        }
    }

    /// Verifies a raw signature made by `peer`.
    ///
    /// The explicit-key model tries every published key when no candidate is
    /// given. The PKIX model needs the signer's certificate.
    pub fn verify_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        algorithm: SignatureAlgorithm,
        candidate: Option<&Credential>,
        peer: &PeerEntity,
    ) -> SpResult<bool> {
        if let Some(candidate) = candidate {
            if !self.validate(candidate, peer)? {
                tracing::debug!(credential = %candidate.name, peer = %peer.entity_id, "Signing credential is not trusted");
                return Ok(false);
            }
            return Ok(verify_data(&candidate.public_key()?, data, signature, algorithm));
        }

        match self {
            Self::ExplicitKey(engine) => Ok(engine
                .trusted_keys(peer)?
                .iter()
                .any(|key| verify_data(key, data, signature, algorithm))),
            Self::Pkix(_) => {
                tracing::debug!(peer = %peer.entity_id, "PKIX signature check without signer certificate");
                Ok(false)
            }
        }
    }
}

/// Published certificates of the peer's SAML 2.0 role.
fn peer_key_descriptors(metadata: &dyn MetadataStore, peer: &PeerEntity) -> Vec<KeyDescriptor> {
    metadata
        .role_descriptor(&peer.entity_id, peer.role, SAMLP_NS)
        .map(|role| role.key_descriptors().to_vec())
        .unwrap_or_default()
}

/// Trust engine accepting only keys from peer metadata.
#[derive(Clone)]
pub struct ExplicitKeyTrustEngine {
    metadata: Arc<dyn MetadataStore>,
}

impl ExplicitKeyTrustEngine {
    /// Creates an engine reading keys from `metadata`.
    #[must_use]
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Returns the public keys the peer publishes for signing.
    pub fn trusted_keys(&self, peer: &PeerEntity) -> SpResult<Vec<Vec<u8>>> {
        let mut keys = Vec::new();
        for descriptor in peer_key_descriptors(self.metadata.as_ref(), peer)
            .iter()
            .filter(|d| d.is_signing())
        {
            for der in descriptor.key_info.certificates_der()? {
                let (_, cert) = parse_certificate(&der)?;
                keys.push(cert.public_key().subject_public_key.data.to_vec());
            }
        }
        Ok(keys)
    }

    /// Returns true if the candidate's key is published by the peer.
    pub fn validate(&self, candidate: &Credential, peer: &PeerEntity) -> SpResult<bool> {
        let key = candidate.public_key()?;
        Ok(self.trusted_keys(peer)?.contains(&key))
    }
}

/// Anchors and names a PKIX evaluation runs against.
#[derive(Debug, Clone, Default)]
pub struct PkixValidationInformation {
    /// Trust anchors (DER certificates).
    pub anchors: Vec<Vec<u8>>,
    /// Names the end-entity certificate must carry one of. Always holds the
    /// peer entity id.
    pub trusted_names: BTreeSet<String>,
}

/// Trust engine validating certificate paths.
#[derive(Clone)]
pub struct PkixTrustEngine {
    metadata: Arc<dyn MetadataStore>,
    key_store: Arc<dyn KeyStore>,
    anchor_fallback: AnchorFallback,
}

impl PkixTrustEngine {
    /// Creates an engine resolving anchors from metadata and the key store.
    #[must_use]
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        key_store: Arc<dyn KeyStore>,
        anchor_fallback: AnchorFallback,
    ) -> Self {
        Self {
            metadata,
            key_store,
            anchor_fallback,
        }
    }

    /// Collects the anchors and trusted names for `peer`.
    ///
    /// Anchors are the peer's published certificates plus its configured
    /// trusted keys. A peer without a trusted key list falls under the anchor
    /// fallback policy.
    pub fn resolve_information(&self, peer: &PeerEntity) -> SpResult<PkixValidationInformation> {
        let mut info = PkixValidationInformation::default();
        info.trusted_names.insert(peer.entity_id.clone());

        for descriptor in peer_key_descriptors(self.metadata.as_ref(), peer)
            .iter()
            .filter(|d| d.is_signing())
        {
            info.anchors.extend(descriptor.key_info.certificates_der()?);
            info.trusted_names
                .extend(descriptor.key_info.key_names.iter().cloned());
        }

        let extended = self.metadata.extended_metadata(&peer.entity_id).unwrap_or_default();
        let aliases = match &extended.trusted_keys {
            Some(aliases) => aliases.clone(),
            None => match self.anchor_fallback {
                AnchorFallback::AllLocalCredentials => {
                    tracing::warn!(
                        peer = %peer.entity_id,
                        "No trusted keys configured for peer, trusting every key store credential as PKIX anchor"
                    );
                    self.key_store.available_credentials()
                }
                AnchorFallback::Disabled => Vec::new(),
            },
        };

        for alias in aliases {
            match self.key_store.credential(&alias) {
                Some(credential) => info.anchors.extend(credential.certificate_chain.iter().cloned()),
                None => tracing::warn!(alias = %alias, "Trusted key not found in key store"),
            }
        }
        Ok(info)
    }

    /// Returns true if the candidate's names and chain satisfy the peer's
    /// validation information.
    pub fn validate(&self, candidate: &Credential, peer: &PeerEntity) -> SpResult<bool> {
        let info = self.resolve_information(peer)?;

        let names = candidate.subject_names()?;
        if !info.trusted_names.iter().any(|name| names.matches(name)) {
            tracing::debug!(credential = %candidate.name, peer = %peer.entity_id, "Certificate names do not match peer");
            return Ok(false);
        }

        Ok(validate_path(&candidate.certificate_chain, &info.anchors))
    }
}

fn parse_all(ders: &[Vec<u8>]) -> Vec<(&[u8], X509Certificate<'_>)> {
    ders.iter()
        .filter_map(|der| {
            parse_certificate(der)
                .ok()
                .map(|(_, cert)| (der.as_slice(), cert))
        })
        .collect()
}

/// Walks from the leaf of `chain` to one of `anchors`.
///
/// Every certificate on the path must be within its validity period and
/// signed by the next one. The path ends at an anchor, either because the
/// certificate is byte-identical to it or because the anchor issued it.
fn validate_path(chain: &[Vec<u8>], anchors: &[Vec<u8>]) -> bool {
    let chain_certs = parse_all(chain);
    if chain_certs.is_empty() || chain_certs.len() != chain.len() {
        return false;
    }
    let anchor_certs = parse_all(anchors);

    let mut current = &chain_certs[0];
    for _ in 0..MAX_PATH_LENGTH {
        let (der, cert) = current;
        if !cert.validity().is_valid() {
            tracing::debug!(subject = %cert.subject(), "Certificate outside its validity period");
            return false;
        }
        if anchor_certs.iter().any(|(anchor, _)| anchor == der) {
            return true;
        }

        let issued_by = |issuer: &X509Certificate<'_>| {
            cert.issuer().as_raw() == issuer.subject().as_raw()
                && cert.verify_signature(Some(issuer.public_key())).is_ok()
        };

        if let Some((_, anchor)) = anchor_certs.iter().find(|(_, anchor)| issued_by(anchor)) {
            let valid = anchor.validity().is_valid();
            if !valid {
                tracing::debug!(anchor = %anchor.subject(), "Trust anchor outside its validity period");
            }
            return valid;
        }

        match chain_certs[1..].iter().find(|(_, next)| issued_by(next)) {
            Some(next) => current = next,
            None => {
                tracing::debug!(subject = %cert.subject(), "No trusted issuer found");
                return false;
            }
        }
    }
    false
}
