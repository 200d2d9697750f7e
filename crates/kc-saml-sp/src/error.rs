//! Service provider error types.
//!
//! Errors are grouped into kinds that decide how a failed authentication
//! initiation is reported: configuration problems cannot be fixed by the
//! user, resolution problems are tied to the request itself.

use thiserror::Error;

use crate::metadata::EntityRole;

/// Result type for service provider operations.
pub type SpResult<T> = Result<T, SpError>;

/// Broad classification of an [`SpError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local metadata, credentials or endpoints are missing or inconsistent.
    Configuration,
    /// The peer entity could not be determined for this request.
    Resolution,
    /// Sending the message or persisting correlation state failed.
    Transport,
    /// Unexpected internal failure.
    Internal,
}

/// Errors raised while initiating SAML authentication.
#[derive(Debug, Error)]
pub enum SpError {
    /// No local entity could be determined and no hosted SP is configured.
    #[error("no local entity could be determined for this request")]
    NoLocalEntity,

    /// The alias in the request path is not mapped to any entity.
    #[error("no local entity found for alias {0}, verify your configuration")]
    UnknownAlias(String),

    /// The entity descriptor is missing from the metadata store.
    #[error("entity descriptor not found: {0}")]
    EntityNotFound(String),

    /// The entity exists but has no descriptor for the requested role.
    #[error("no {role} descriptor found for entity {entity_id}")]
    RoleNotFound {
        /// The entity that was looked up.
        entity_id: String,
        /// The role that was requested.
        role: EntityRole,
    },

    /// Metadata could not be loaded or is inconsistent.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// A credential alias is not present in the key store.
    #[error("credential not found for alias: {0}")]
    CredentialNotFound(String),

    /// Neither an alias nor a default credential is configured.
    #[error("no default credential is configured")]
    NoDefaultCredential,

    /// Key material could not be parsed or used.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The configured assertion consumer index does not exist.
    #[error("assertion consumer service with index {index} isn't available for SP {entity_id}")]
    UnknownConsumerIndex {
        /// The configured index.
        index: u32,
        /// The local SP entity.
        entity_id: String,
    },

    /// The local SP publishes no usable assertion consumer service.
    #[error("no assertion consumer service available for SP {0}")]
    NoConsumerService(String),

    /// The IDP publishes no single sign-on service the profile can use.
    #[error("no supported single sign-on service found for IDP {0}")]
    NoSingleSignOnService(String),

    /// A binding was requested that the profile cannot produce.
    #[error("unsupported binding: {0}")]
    UnsupportedBinding(String),

    /// No identity provider was selected and no default exists.
    #[error("no identity provider is available for authentication")]
    NoIdentityProvider,

    /// The requested identity provider is not a known IDP.
    #[error("identity provider is not valid: {0}")]
    InvalidIdentityProvider(String),

    /// The peer entity is unknown or lacks the descriptor for its role.
    #[error("peer {role} {entity_id} not found")]
    PeerNotFound {
        /// The peer that was looked up.
        entity_id: String,
        /// The role the peer was expected to have.
        role: EntityRole,
    },

    /// The peer entity was already bound to the request context.
    #[error("peer entity already set to {0}")]
    PeerAlreadySet(String),

    /// No encrypted key could be resolved for decryption.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Deflate compression error.
    #[error("deflate error: {0}")]
    Deflate(String),

    /// Sending the outbound message failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Message storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SpError {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoLocalEntity
            | Self::UnknownAlias(_)
            | Self::EntityNotFound(_)
            | Self::RoleNotFound { .. }
            | Self::InvalidMetadata(_)
            | Self::CredentialNotFound(_)
            | Self::NoDefaultCredential
            | Self::InvalidCredential(_)
            | Self::UnknownConsumerIndex { .. }
            | Self::NoConsumerService(_)
            | Self::NoSingleSignOnService(_)
            | Self::UnsupportedBinding(_) => ErrorKind::Configuration,
            Self::NoIdentityProvider | Self::InvalidIdentityProvider(_) | Self::PeerNotFound { .. } => {
                ErrorKind::Resolution
            }
            Self::Transport(_) | Self::Storage(_) => ErrorKind::Transport,
            Self::PeerAlreadySet(_)
            | Self::Decryption(_)
            | Self::SignatureCreation(_)
            | Self::XmlParse(_)
            | Self::Deflate(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if authentication cannot be initiated because of local configuration.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration)
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidIdentityProvider(_) => 400,
            Self::UnknownAlias(_) | Self::NoIdentityProvider | Self::PeerNotFound { .. } => 404,
            Self::Transport(_) | Self::Storage(_) => 502,
            _ => 500,
        }
    }
}

impl From<quick_xml::Error> for SpError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<std::io::Error> for SpError {
    fn from(err: std::io::Error) -> Self {
        Self::Deflate(err.to_string())
    }
}
