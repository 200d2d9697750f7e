//! Resolution of the local and peer entities of a request.

use std::sync::Arc;

use crate::context::{LocalEntity, PeerEntity, PeerMetadata};
use crate::error::{SpError, SpResult};
use crate::metadata::{EntityRole, MetadataStore};
use crate::transport::InboundRequest;
use crate::types::SAMLP_NS;

/// Path marker introducing a local entity alias.
const ALIAS_MARKER: &str = "/alias/";

/// Request parameter naming a user-selected IDP.
pub const IDP_PARAMETER: &str = "idp";

/// Derives local and peer entities from the request and metadata.
#[derive(Clone)]
pub struct EntityResolver {
    metadata: Arc<dyn MetadataStore>,
}

impl EntityResolver {
    /// Creates a resolver over `metadata`.
    #[must_use]
    pub fn new(metadata: Arc<dyn MetadataStore>) -> Self {
        Self { metadata }
    }

    /// Determines the local entity id and role.
    ///
    /// A pre-bound attribute wins, then an `/alias/<name>[/idp|/sp]` path
    /// segment, then the hosted SP.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::UnknownAlias`] for an unmapped alias and
    /// [`SpError::NoLocalEntity`] when nothing identifies the local entity.
    pub fn resolve_local_entity(&self, request: &InboundRequest) -> SpResult<(String, EntityRole)> {
        if let Some(entity_id) = request
            .attributes()
            .local_entity_id
            .as_deref()
            .filter(|id| !id.is_empty())
        {
            tracing::debug!(entity_id, "Using pre-bound local entity");
            return Ok((entity_id.to_string(), EntityRole::Sp));
        }

        if let Some((alias, role)) = parse_alias_path(request.path()) {
            let entity_id = self
                .metadata
                .entity_id_for_alias(alias)
                .ok_or_else(|| SpError::UnknownAlias(alias.to_string()))?;
            tracing::debug!(alias, entity_id = %entity_id, role = %role, "Local entity resolved from alias");
            return Ok((entity_id, role));
        }

        let entity_id = self
            .metadata
            .hosted_sp_name()
            .filter(|id| !id.is_empty())
            .ok_or(SpError::NoLocalEntity)?;
        tracing::debug!(entity_id = %entity_id, "Using hosted SP as local entity");
        Ok((entity_id, EntityRole::Sp))
    }

    /// Loads the metadata snapshots of the local entity.
    ///
    /// # Errors
    ///
    /// Fails if the entity or its SAML 2.0 descriptor for `role` is missing.
    pub fn resolve_local_role_metadata(&self, entity_id: &str, role: EntityRole) -> SpResult<LocalEntity> {
        let metadata = self
            .metadata
            .entity_descriptor(entity_id)
            .ok_or_else(|| SpError::EntityNotFound(entity_id.to_string()))?;
        let role_metadata = self
            .metadata
            .role_descriptor(entity_id, role, SAMLP_NS)
            .ok_or_else(|| SpError::RoleNotFound {
                entity_id: entity_id.to_string(),
                role,
            })?;
        let extended = self.metadata.extended_metadata(entity_id).unwrap_or_default();

        Ok(LocalEntity {
            entity_id: entity_id.to_string(),
            role,
            metadata,
            role_metadata,
            extended,
        })
    }

    /// Resolves the local entity and its metadata.
    pub fn resolve_local(&self, request: &InboundRequest) -> SpResult<LocalEntity> {
        let (entity_id, role) = self.resolve_local_entity(request)?;
        self.resolve_local_role_metadata(&entity_id, role)
    }

    /// Determines the peer IDP.
    ///
    /// A pre-bound attribute wins, then the `idp` parameter (user-selected),
    /// then the default IDP. Returns `None` when none applies.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::InvalidIdentityProvider`] if the `idp` parameter
    /// names an entity that is not a known IDP.
    pub fn resolve_peer_entity(&self, request: &InboundRequest) -> SpResult<Option<PeerEntity>> {
        if let Some(entity_id) = request
            .attributes()
            .peer_entity_id
            .as_deref()
            .filter(|id| !id.is_empty())
        {
            return Ok(Some(peer(entity_id, false)));
        }

        if let Some(entity_id) = request.parameter(IDP_PARAMETER).filter(|id| !id.is_empty()) {
            if !self.metadata.is_idp_valid(entity_id) {
                tracing::warn!(entity_id, "Requested identity provider is not known");
                return Err(SpError::InvalidIdentityProvider(entity_id.to_string()));
            }
            tracing::debug!(entity_id, "Using user selected identity provider");
            return Ok(Some(peer(entity_id, true)));
        }

        match self.metadata.default_idp() {
            Some(entity_id) => Ok(Some(peer(&entity_id, false))),
            None => {
                tracing::debug!("No default identity provider, peer left unresolved");
                Ok(None)
            }
        }
    }

    /// Loads the metadata snapshots of the peer.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::PeerNotFound`] if the entity or its SAML 2.0
    /// descriptor for the peer role is missing.
    pub fn resolve_peer_role_metadata(&self, peer: &PeerEntity) -> SpResult<PeerMetadata> {
        let not_found = || SpError::PeerNotFound {
            entity_id: peer.entity_id.clone(),
            role: peer.role,
        };
        let entity = self
            .metadata
            .entity_descriptor(&peer.entity_id)
            .ok_or_else(not_found)?;
        let role_metadata = self
            .metadata
            .role_descriptor(&peer.entity_id, peer.role, SAMLP_NS)
            .ok_or_else(not_found)?;
        let extended = self.metadata.extended_metadata(&peer.entity_id).unwrap_or_default();

        Ok(PeerMetadata {
            entity,
            role_metadata,
            extended,
        })
    }
}

fn peer(entity_id: &str, user_selected: bool) -> PeerEntity {
    PeerEntity {
        entity_id: entity_id.to_string(),
        role: EntityRole::Idp,
        user_selected,
    }
}

/// Splits `/alias/<name>[/<role>]` into alias and role.
///
/// The role is IDP only when the last segment is `idp`.
fn parse_alias_path(path: &str) -> Option<(&str, EntityRole)> {
    let start = path.find(ALIAS_MARKER)? + ALIAS_MARKER.len();
    let rest = &path[start..];
    match rest.rsplit_once('/') {
        Some((alias, role)) if role.eq_ignore_ascii_case("idp") => Some((alias, EntityRole::Idp)),
        Some((alias, _)) => Some((alias, EntityRole::Sp)),
        None => Some((rest, EntityRole::Sp)),
    }
}
