//! Metadata store abstraction and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{SpError, SpResult};

use super::{EntityDescriptor, EntityRole, ExtendedMetadata, RoleDescriptor};

/// Source of entity metadata.
///
/// Lookups are synchronous and must be safe for concurrent callers.
pub trait MetadataStore: Send + Sync {
    /// Returns the descriptor of `entity_id`.
    fn entity_descriptor(&self, entity_id: &str) -> Option<Arc<EntityDescriptor>>;

    /// Returns the role descriptor of `entity_id` for `role` and `protocol`.
    fn role_descriptor(
        &self,
        entity_id: &str,
        role: EntityRole,
        protocol: &str,
    ) -> Option<RoleDescriptor> {
        self.entity_descriptor(entity_id)?
            .role_descriptor(role, protocol)
            .cloned()
    }

    /// Returns the extended metadata of `entity_id`.
    fn extended_metadata(&self, entity_id: &str) -> Option<Arc<ExtendedMetadata>>;

    /// Maps an alias to its entity id.
    fn entity_id_for_alias(&self, alias: &str) -> Option<String>;

    /// Returns the IDP used when the request names none.
    fn default_idp(&self) -> Option<String>;

    /// Returns the SP hosted by this deployment.
    fn hosted_sp_name(&self) -> Option<String>;

    /// Returns the entity ids of every known identity provider.
    fn idp_entity_names(&self) -> Vec<String>;

    /// Returns true if `entity_id` is a known identity provider.
    fn is_idp_valid(&self, entity_id: &str) -> bool {
        self.idp_entity_names().iter().any(|idp| idp == entity_id)
    }
}

#[derive(Debug, Default)]
struct Entries {
    order: Vec<String>,
    entities: HashMap<String, Arc<EntityDescriptor>>,
    extended: HashMap<String, Arc<ExtendedMetadata>>,
    aliases: HashMap<String, String>,
    hosted_sp: Option<String>,
    default_idp: Option<String>,
}

/// In-memory metadata store.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    entries: RwLock<Entries>,
}

impl InMemoryMetadataStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entity and its extended metadata.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::InvalidMetadata`] if the entity id is empty or the
    /// alias is already taken by another entity.
    pub fn add_entity(&self, entity: EntityDescriptor, extended: ExtendedMetadata) -> SpResult<()> {
        if entity.entity_id.is_empty() {
            return Err(SpError::InvalidMetadata("entity id must not be empty".to_string()));
        }

        let mut entries = self.entries.write();
        let entity_id = entity.entity_id.clone();

        if let Some(alias) = &extended.alias {
            if let Some(owner) = entries.aliases.get(alias).filter(|owner| **owner != entity_id) {
                return Err(SpError::InvalidMetadata(format!(
                    "alias {alias} is used by both {owner} and {entity_id}"
                )));
            }
        }

        // A replaced entity gives up its previous alias.
        entries.aliases.retain(|_, owner| *owner != entity_id);
        if let Some(alias) = &extended.alias {
            entries.aliases.insert(alias.clone(), entity_id.clone());
        }

        if !entries.entities.contains_key(&entity_id) {
            entries.order.push(entity_id.clone());
        }
        tracing::debug!(entity_id = %entity_id, local = extended.local, "Metadata entity registered");
        entries.entities.insert(entity_id.clone(), Arc::new(entity));
        entries.extended.insert(entity_id, Arc::new(extended));
        Ok(())
    }

    /// Selects the SP hosted by this deployment.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::EntityNotFound`] if the entity is unknown.
    pub fn set_hosted_sp(&self, entity_id: &str) -> SpResult<()> {
        let mut entries = self.entries.write();
        if !entries.entities.contains_key(entity_id) {
            return Err(SpError::EntityNotFound(entity_id.to_string()));
        }
        entries.hosted_sp = Some(entity_id.to_string());
        Ok(())
    }

    /// Selects the default identity provider.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::RoleNotFound`] if the entity has no IDP role.
    pub fn set_default_idp(&self, entity_id: &str) -> SpResult<()> {
        let mut entries = self.entries.write();
        let is_idp = entries
            .entities
            .get(entity_id)
            .is_some_and(|entity| entity.idp_descriptor().is_some());
        if !is_idp {
            return Err(SpError::RoleNotFound {
                entity_id: entity_id.to_string(),
                role: EntityRole::Idp,
            });
        }
        entries.default_idp = Some(entity_id.to_string());
        Ok(())
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn entity_descriptor(&self, entity_id: &str) -> Option<Arc<EntityDescriptor>> {
        self.entries.read().entities.get(entity_id).cloned()
    }

    fn extended_metadata(&self, entity_id: &str) -> Option<Arc<ExtendedMetadata>> {
        self.entries.read().extended.get(entity_id).cloned()
    }

    fn entity_id_for_alias(&self, alias: &str) -> Option<String> {
        self.entries.read().aliases.get(alias).cloned()
    }

    fn default_idp(&self) -> Option<String> {
        let entries = self.entries.read();
        entries.default_idp.clone().or_else(|| {
            entries
                .order
                .iter()
                .find(|id| {
                    entries
                        .entities
                        .get(*id)
                        .is_some_and(|entity| entity.idp_descriptor().is_some())
                })
                .cloned()
        })
    }

    fn hosted_sp_name(&self) -> Option<String> {
        self.entries.read().hosted_sp.clone()
    }

    fn idp_entity_names(&self) -> Vec<String> {
        let entries = self.entries.read();
        entries
            .order
            .iter()
            .filter(|id| {
                entries
                    .entities
                    .get(*id)
                    .is_some_and(|entity| entity.idp_descriptor().is_some())
            })
            .cloned()
            .collect()
    }
}
