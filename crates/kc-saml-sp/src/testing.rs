//! Federation fixture shared by unit tests.

use std::sync::Arc;

use crate::context::{PeerEntity, RequestContext};
use crate::credential::test_support::*;
use crate::credential::InMemoryKeyStore;
use crate::entity::EntityResolver;
use crate::metadata::{
    Endpoint, EntityDescriptor, EntityRole, ExtendedMetadata, IdpSsoDescriptor, IndexedEndpoint, InMemoryMetadataStore,
    KeyDescriptor, KeyInfo, KeyUsage, RoleDescriptor, SpSsoDescriptor,
};
use crate::storage::{InMemoryMessageStorage, MessageStorage};
use crate::transport::InboundRequest;
use crate::trust::TrustContextBuilder;
use crate::types::{SamlBinding, SAMLP_NS};

pub(crate) const HOSTED_SP: &str = "https://sp.example.org/saml";
pub(crate) const IDP_ENTITY: &str = "https://idp.example/entity";
pub(crate) const OTHER_IDP_ENTITY: &str = "https://other.example";

pub(crate) const ACS_POST: u32 = 0;
pub(crate) const ACS_ARTIFACT: u32 = 1;
pub(crate) const ACS_HOK: u32 = 2;
pub(crate) const ACS_PAOS: u32 = 3;
pub(crate) const ACS_REDIRECT: u32 = 4;

pub(crate) struct Federation {
    pub metadata: Arc<InMemoryMetadataStore>,
    pub keys: Arc<InMemoryKeyStore>,
}

fn acs(index: u32, binding: SamlBinding, path: &str) -> IndexedEndpoint {
    IndexedEndpoint {
        index,
        is_default: None,
        binding: binding.uri().to_string(),
        location: format!("{HOSTED_SP}/{path}"),
        hok_protocol_binding: None,
    }
}

fn key(usage: Option<KeyUsage>, names: &[&str], pem: Option<&str>) -> KeyDescriptor {
    KeyDescriptor {
        usage,
        key_info: KeyInfo {
            key_names: names.iter().map(|n| (*n).to_string()).collect(),
            x509_certificates: pem.map(metadata_certificate).into_iter().collect(),
        },
    }
}

pub(crate) fn sp_descriptor() -> EntityDescriptor {
    let mut hok = acs(ACS_HOK, SamlBinding::HolderOfKey, "HoKSSO");
    hok.hok_protocol_binding = Some(SamlBinding::HttpPost.uri().to_string());

    EntityDescriptor {
        entity_id: HOSTED_SP.to_string(),
        roles: vec![RoleDescriptor::Sp(SpSsoDescriptor {
            protocol_support: vec![SAMLP_NS.to_string()],
            key_descriptors: vec![
                key(Some(KeyUsage::Signing), &[], Some(SP_SIGNING_CERT)),
                key(Some(KeyUsage::Encryption), &[], Some(SP_ENCRYPTION_CERT)),
            ],
            authn_requests_signed: false,
            want_assertions_signed: true,
            name_id_formats: Vec::new(),
            assertion_consumer_services: vec![
                acs(ACS_POST, SamlBinding::HttpPost, "SSO"),
                acs(ACS_ARTIFACT, SamlBinding::HttpArtifact, "SSO/artifact"),
                hok,
                acs(ACS_PAOS, SamlBinding::Paos, "SSO/ecp"),
                acs(ACS_REDIRECT, SamlBinding::HttpRedirect, "SSO/redirect"),
            ],
        })],
    }
}

pub(crate) fn sp_extended() -> ExtendedMetadata {
    ExtendedMetadata {
        signing_key: Some("sp-signing".to_string()),
        encryption_key: Some("sp-encryption".to_string()),
        ..ExtendedMetadata::local().with_alias("sp1")
    }
}

/// An IDP offering Redirect, POST and Holder-of-Key single sign-on.
pub(crate) fn idp_descriptor(entity_id: &str, certificate_pem: Option<&str>) -> EntityDescriptor {
    let sso = |binding: SamlBinding, path: &str| Endpoint {
        binding: binding.uri().to_string(),
        location: format!("{entity_id}/sso/{path}"),
        hok_protocol_binding: None,
    };
    let mut hok = sso(SamlBinding::HolderOfKey, "hok");
    hok.hok_protocol_binding = Some(SamlBinding::HttpRedirect.uri().to_string());

    EntityDescriptor {
        entity_id: entity_id.to_string(),
        roles: vec![RoleDescriptor::Idp(IdpSsoDescriptor {
            protocol_support: vec![SAMLP_NS.to_string()],
            key_descriptors: vec![key(None, &["idp-signing"], certificate_pem)],
            want_authn_requests_signed: false,
            name_id_formats: Vec::new(),
            single_sign_on_services: vec![
                sso(SamlBinding::HttpRedirect, "redirect"),
                sso(SamlBinding::HttpPost, "post"),
                hok,
            ],
        })],
    }
}

pub(crate) fn key_store() -> Arc<InMemoryKeyStore> {
    let keys = Arc::new(InMemoryKeyStore::new());
    keys.insert_default(sp_signing_credential());
    keys.insert(sp_encryption_credential());
    keys.insert(sp_tls_credential());
    keys.insert(ca_credential());
    keys
}

/// Hosted SP `sp1`, default IDP [`IDP_ENTITY`] and a second IDP.
pub(crate) fn federation() -> Federation {
    federation_with(sp_extended(), sp_descriptor())
}

pub(crate) fn federation_with(sp_extended: ExtendedMetadata, sp: EntityDescriptor) -> Federation {
    let metadata = Arc::new(InMemoryMetadataStore::new());
    metadata.add_entity(sp, sp_extended).unwrap();
    metadata
        .add_entity(idp_descriptor(IDP_ENTITY, Some(IDP_CERT)), ExtendedMetadata::default())
        .unwrap();
    metadata
        .add_entity(
            idp_descriptor(OTHER_IDP_ENTITY, Some(OTHER_IDP_CERT)),
            ExtendedMetadata::default(),
        )
        .unwrap();
    metadata.set_hosted_sp(HOSTED_SP).unwrap();
    metadata.set_default_idp(IDP_ENTITY).unwrap();

    Federation {
        metadata,
        keys: key_store(),
    }
}

impl Federation {
    pub(crate) fn resolver(&self) -> EntityResolver {
        EntityResolver::new(self.metadata.clone())
    }

    /// Context with local entity and trust resolved, peer unset.
    pub(crate) fn context(&self, request: InboundRequest) -> (RequestContext, Arc<InMemoryMessageStorage>) {
        let local = self.resolver().resolve_local(&request).unwrap();
        let trust = TrustContextBuilder::new(self.metadata.clone(), self.keys.clone())
            .build(&local, &request)
            .unwrap();
        let storage = Arc::new(InMemoryMessageStorage::new());
        let dyn_storage: Arc<dyn MessageStorage> = storage.clone();
        (RequestContext::new(request, local, trust, dyn_storage), storage)
    }
}

impl Federation {
    /// Context whose peer is `peer_id`, metadata loaded.
    pub(crate) fn context_with_peer(
        &self,
        request: InboundRequest,
        peer_id: &str,
    ) -> (RequestContext, Arc<InMemoryMessageStorage>) {
        let (mut context, storage) = self.context(request);
        let peer = PeerEntity {
            entity_id: peer_id.to_string(),
            role: EntityRole::Idp,
            user_selected: false,
        };
        let metadata = self.resolver().resolve_peer_role_metadata(&peer).unwrap();
        context.set_peer(peer).unwrap();
        context.set_peer_metadata(metadata).unwrap();
        (context, storage)
    }
}

/// Login request for the hosted SP.
pub(crate) fn login_request() -> InboundRequest {
    InboundRequest::new("/saml/login").with_remote_addr("192.0.2.10")
}
