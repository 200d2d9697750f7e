//! Trust context assembly.
//!
//! For every request the [`TrustContextBuilder`] binds the local credentials
//! (decryption, signing, TLS) and builds the engines deciding which peer
//! credentials are trusted:
//!
//! - **Signature trust engine** - message signatures, chosen by `securityProfile`
//! - **Transport trust engine** - TLS certificates, chosen by `sslSecurityProfile`
//! - **Hostname verification** - chosen by `sslHostnameVerification`
//!
//! Profiles named `pkix` select certificate path validation; every other
//! value selects the explicit-key model (`metaiop`).

mod decrypter;
mod engine;
mod hostname;

pub use decrypter::*;
pub use engine::*;
pub use hostname::*;

use std::sync::Arc;

use crate::context::LocalEntity;
use crate::credential::{Credential, KeyStore};
use crate::error::SpResult;
use crate::metadata::{ExtendedMetadata, MetadataStore};
use crate::transport::InboundRequest;

/// Trust model of a security surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityProfile {
    /// Metadata interoperability: trust exactly the keys in peer metadata.
    MetaIop,
    /// Certificate path validation to configured anchors.
    Pkix,
}

impl SecurityProfile {
    /// Resolves a profile name; only `pkix` (any case) selects PKIX.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("pkix") {
            Self::Pkix
        } else {
            Self::MetaIop
        }
    }
}

/// What PKIX anchors a peer without configured trusted keys gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnchorFallback {
    /// Every credential in the local key store becomes an anchor.
    #[default]
    AllLocalCredentials,
    /// Only certificates from the peer's metadata are anchors.
    Disabled,
}

/// Cryptographic state of one request.
#[derive(Debug, Clone)]
pub struct TrustContext {
    /// Decrypter bound to the local encryption credential.
    pub decrypter: Decrypter,
    /// Credential signing outbound messages.
    pub signing_credential: Arc<Credential>,
    /// Client credential for TLS connections to the peer.
    pub local_transport_credential: Option<Arc<Credential>>,
    /// Certificate chain the peer presented on this connection.
    pub peer_transport_credential: Option<Credential>,
    /// Engine for message signatures.
    pub signature_trust_engine: TrustEngine,
    /// Engine for TLS certificates.
    pub transport_trust_engine: TrustEngine,
    /// Hostname verification for TLS connections.
    pub hostname_verification: HostnameVerification,
}

/// Builds [`TrustContext`] values from the key and metadata stores.
#[derive(Clone)]
pub struct TrustContextBuilder {
    metadata: Arc<dyn MetadataStore>,
    key_store: Arc<dyn KeyStore>,
    anchor_fallback: AnchorFallback,
}

impl TrustContextBuilder {
    /// Creates a builder with the default anchor fallback.
    #[must_use]
    pub fn new(metadata: Arc<dyn MetadataStore>, key_store: Arc<dyn KeyStore>) -> Self {
        Self {
            metadata,
            key_store,
            anchor_fallback: AnchorFallback::default(),
        }
    }

    /// Sets the PKIX anchor fallback policy.
    #[must_use]
    pub const fn with_anchor_fallback(mut self, anchor_fallback: AnchorFallback) -> Self {
        self.anchor_fallback = anchor_fallback;
        self
    }

    /// Returns the PKIX anchor fallback policy.
    #[must_use]
    pub const fn anchor_fallback(&self) -> AnchorFallback {
        self.anchor_fallback
    }

    /// Builds the full trust context for the local entity of a request.
    ///
    /// # Errors
    ///
    /// Fails when a local credential cannot be resolved.
    pub fn build(&self, local: &LocalEntity, request: &InboundRequest) -> SpResult<TrustContext> {
        let extended = local.extended.as_ref();
        let context = TrustContext {
            decrypter: self.build_decrypter(local)?,
            signing_credential: self.build_signing_credential(extended)?,
            local_transport_credential: self.build_transport_credential(extended)?,
            peer_transport_credential: peer_transport_credential(request),
            signature_trust_engine: self.build_signature_trust_engine(&extended.security_profile),
            transport_trust_engine: self.build_transport_trust_engine(&extended.ssl_security_profile),
            hostname_verification: HostnameVerification::from_name(&extended.ssl_hostname_verification),
        };
        tracing::debug!(
            entity_id = %local.entity_id,
            signing = %context.signing_credential.name,
            decryption = %context.decrypter.credential().name,
            signature_pkix = context.signature_trust_engine.is_pkix(),
            transport_pkix = context.transport_trust_engine.is_pkix(),
            hostname_verification = context.hostname_verification.name(),
            "Trust context built"
        );
        Ok(context)
    }

    /// Binds a decrypter to the encryption credential, or the default one.
    pub fn build_decrypter(&self, local: &LocalEntity) -> SpResult<Decrypter> {
        let credential = self
            .key_store
            .credential_or_default(local.extended.encryption_key.as_deref())?;
        Ok(Decrypter::new(credential, vec![local.entity_id.clone()]))
    }

    /// Resolves the signing credential, or the default one.
    pub fn build_signing_credential(&self, extended: &ExtendedMetadata) -> SpResult<Arc<Credential>> {
        self.key_store
            .credential_or_default(extended.signing_key.as_deref())
    }

    /// Resolves the TLS client credential, if an alias is configured.
    pub fn build_transport_credential(
        &self,
        extended: &ExtendedMetadata,
    ) -> SpResult<Option<Arc<Credential>>> {
        extended
            .tls_key
            .as_deref()
            .map(|alias| self.key_store.credential_or_default(Some(alias)))
            .transpose()
    }

    /// Builds the engine for message signatures.
    #[must_use]
    pub fn build_signature_trust_engine(&self, security_profile: &str) -> TrustEngine {
        self.trust_engine(SecurityProfile::from_name(security_profile))
    }

    /// Builds the engine for TLS certificates.
    #[must_use]
    pub fn build_transport_trust_engine(&self, ssl_security_profile: &str) -> TrustEngine {
        self.trust_engine(SecurityProfile::from_name(ssl_security_profile))
    }

    fn trust_engine(&self, profile: SecurityProfile) -> TrustEngine {
        match profile {
            SecurityProfile::Pkix => TrustEngine::Pkix(PkixTrustEngine::new(
                Arc::clone(&self.metadata),
                Arc::clone(&self.key_store),
                self.anchor_fallback,
            )),
            SecurityProfile::MetaIop => {
                TrustEngine::ExplicitKey(ExplicitKeyTrustEngine::new(Arc::clone(&self.metadata)))
            }
        }
    }
}

/// The client certificate chain presented on the inbound connection.
fn peer_transport_credential(request: &InboundRequest) -> Option<Credential> {
    let chain = request.client_certificates();
    if chain.is_empty() {
        None
    } else {
        Some(Credential::new("peer-tls", chain.to_vec()))
    }
}
