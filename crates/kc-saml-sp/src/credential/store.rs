//! Key store abstraction.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{SpError, SpResult};

use super::Credential;

/// Resolves credentials by alias.
///
/// Implementations must be safe for concurrent reads.
pub trait KeyStore: Send + Sync {
    /// Returns the credential stored under `alias`.
    fn credential(&self, alias: &str) -> Option<Arc<Credential>>;

    /// Returns the credential used when no alias is configured.
    fn default_credential(&self) -> Option<Arc<Credential>>;

    /// Returns the aliases of every stored credential.
    fn available_credentials(&self) -> Vec<String>;

    /// Resolves `alias`, or the default credential when no alias is given.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::CredentialNotFound`] for an unknown alias and
    /// [`SpError::NoDefaultCredential`] when neither is available.
    fn credential_or_default(&self, alias: Option<&str>) -> SpResult<Arc<Credential>> {
        match alias {
            Some(alias) => self
                .credential(alias)
                .ok_or_else(|| SpError::CredentialNotFound(alias.to_string())),
            None => self.default_credential().ok_or(SpError::NoDefaultCredential),
        }
    }
}

/// In-memory key store.
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    credentials: RwLock<BTreeMap<String, Arc<Credential>>>,
    default_alias: RwLock<Option<String>>,
}

impl InMemoryKeyStore {
    /// Creates an empty key store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a credential under its own name.
    pub fn insert(&self, credential: Credential) {
        self.credentials
            .write()
            .insert(credential.name.clone(), Arc::new(credential));
    }

    /// Adds a credential and makes it the default.
    pub fn insert_default(&self, credential: Credential) {
        *self.default_alias.write() = Some(credential.name.clone());
        self.insert(credential);
    }

    /// Selects the default credential by alias.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::CredentialNotFound`] if no credential has that alias.
    pub fn set_default(&self, alias: &str) -> SpResult<()> {
        if !self.credentials.read().contains_key(alias) {
            return Err(SpError::CredentialNotFound(alias.to_string()));
        }
        *self.default_alias.write() = Some(alias.to_string());
        Ok(())
    }
}

impl KeyStore for InMemoryKeyStore {
    fn credential(&self, alias: &str) -> Option<Arc<Credential>> {
        self.credentials.read().get(alias).cloned()
    }

    fn default_credential(&self) -> Option<Arc<Credential>> {
        let alias = self.default_alias.read().clone()?;
        self.credential(&alias)
    }

    fn available_credentials(&self) -> Vec<String> {
        self.credentials.read().keys().cloned().collect()
    }
}
