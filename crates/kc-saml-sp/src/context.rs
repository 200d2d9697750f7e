//! Per-request state of an authentication initiation.

use std::sync::Arc;

use crate::error::{SpError, SpResult};
use crate::metadata::{EntityDescriptor, EntityRole, ExtendedMetadata, IdpSsoDescriptor, RoleDescriptor, SpSsoDescriptor};
use crate::storage::MessageStorage;
use crate::transport::InboundRequest;
use crate::trust::TrustContext;

/// The entity this deployment acts as for the request.
#[derive(Debug, Clone)]
pub struct LocalEntity {
    /// Entity id.
    pub entity_id: String,
    /// Role taken for this request.
    pub role: EntityRole,
    /// Entity descriptor snapshot.
    pub metadata: Arc<EntityDescriptor>,
    /// SAML 2.0 role descriptor for `role`.
    pub role_metadata: RoleDescriptor,
    /// Extended metadata snapshot.
    pub extended: Arc<ExtendedMetadata>,
}

impl LocalEntity {
    /// Returns the SP descriptor when acting as a service provider.
    #[must_use]
    pub const fn sp_descriptor(&self) -> Option<&SpSsoDescriptor> {
        self.role_metadata.as_sp()
    }
}

/// The remote entity the request is exchanged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntity {
    /// Entity id.
    pub entity_id: String,
    /// Role of the peer; always IDP for authentication initiation.
    pub role: EntityRole,
    /// Whether the user chose the peer through the `idp` parameter.
    pub user_selected: bool,
}

/// Metadata of the peer entity, loaded once the peer is needed.
#[derive(Debug, Clone)]
pub struct PeerMetadata {
    /// Entity descriptor snapshot.
    pub entity: Arc<EntityDescriptor>,
    /// SAML 2.0 role descriptor.
    pub role_metadata: RoleDescriptor,
    /// Extended metadata snapshot.
    pub extended: Arc<ExtendedMetadata>,
}

/// State of one authentication initiation.
///
/// Created at request start and consumed by a single profile selection.
/// The local entity and trust context are fixed at construction; the peer
/// can be set once.
pub struct RequestContext {
    request: InboundRequest,
    local: LocalEntity,
    peer: Option<PeerEntity>,
    peer_metadata: Option<PeerMetadata>,
    trust: TrustContext,
    message_storage: Arc<dyn MessageStorage>,
}

impl RequestContext {
    /// Creates a context for a resolved local entity.
    #[must_use]
    pub fn new(
        request: InboundRequest,
        local: LocalEntity,
        trust: TrustContext,
        message_storage: Arc<dyn MessageStorage>,
    ) -> Self {
        Self {
            request,
            local,
            peer: None,
            peer_metadata: None,
            trust,
            message_storage,
        }
    }

    /// Returns the inbound request.
    #[must_use]
    pub const fn request(&self) -> &InboundRequest {
        &self.request
    }

    /// Returns the local entity.
    #[must_use]
    pub const fn local(&self) -> &LocalEntity {
        &self.local
    }

    /// Returns the local entity id.
    #[must_use]
    pub fn local_entity_id(&self) -> &str {
        &self.local.entity_id
    }

    /// Returns the local extended metadata.
    #[must_use]
    pub fn local_extended(&self) -> &ExtendedMetadata {
        &self.local.extended
    }

    /// Returns the peer, if resolved.
    #[must_use]
    pub const fn peer(&self) -> Option<&PeerEntity> {
        self.peer.as_ref()
    }

    /// Returns the peer entity id, if resolved.
    #[must_use]
    pub fn peer_entity_id(&self) -> Option<&str> {
        self.peer.as_ref().map(|peer| peer.entity_id.as_str())
    }

    /// Returns true if the user picked the peer.
    #[must_use]
    pub fn peer_user_selected(&self) -> bool {
        self.peer.as_ref().is_some_and(|peer| peer.user_selected)
    }

    /// Binds the peer entity.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::PeerAlreadySet`] if a peer is already bound.
    pub fn set_peer(&mut self, peer: PeerEntity) -> SpResult<()> {
        if let Some(existing) = &self.peer {
            return Err(SpError::PeerAlreadySet(existing.entity_id.clone()));
        }
        self.peer = Some(peer);
        Ok(())
    }

    /// Returns the peer metadata, if loaded.
    #[must_use]
    pub const fn peer_metadata(&self) -> Option<&PeerMetadata> {
        self.peer_metadata.as_ref()
    }

    /// Stores the metadata of the bound peer.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::NoIdentityProvider`] if no peer is bound and
    /// [`SpError::Internal`] if the metadata describes another entity.
    pub fn set_peer_metadata(&mut self, metadata: PeerMetadata) -> SpResult<()> {
        let peer = self.peer.as_ref().ok_or(SpError::NoIdentityProvider)?;
        if metadata.entity.entity_id != peer.entity_id {
            return Err(SpError::Internal(format!(
                "metadata of {} cannot describe peer {}",
                metadata.entity.entity_id, peer.entity_id
            )));
        }
        self.peer_metadata = Some(metadata);
        Ok(())
    }

    /// Returns the IDP descriptor of the peer.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::NoIdentityProvider`] when no peer metadata is loaded
    /// and [`SpError::PeerNotFound`] when the peer is not an IDP.
    pub fn peer_idp_descriptor(&self) -> SpResult<&IdpSsoDescriptor> {
        let metadata = self.peer_metadata.as_ref().ok_or(SpError::NoIdentityProvider)?;
        metadata
            .role_metadata
            .as_idp()
            .ok_or_else(|| SpError::PeerNotFound {
                entity_id: metadata.entity.entity_id.clone(),
                role: EntityRole::Idp,
            })
    }

    /// Returns the local SP descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::RoleNotFound`] when the local entity acts as IDP.
    pub fn local_sp_descriptor(&self) -> SpResult<&SpSsoDescriptor> {
        self.local.sp_descriptor().ok_or_else(|| SpError::RoleNotFound {
            entity_id: self.local.entity_id.clone(),
            role: EntityRole::Sp,
        })
    }

    /// Returns the trust context.
    #[must_use]
    pub const fn trust(&self) -> &TrustContext {
        &self.trust
    }

    /// Returns the message storage.
    #[must_use]
    pub fn message_storage(&self) -> &Arc<dyn MessageStorage> {
        &self.message_storage
    }
}
