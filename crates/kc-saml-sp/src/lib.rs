//! SAML 2.0 Service Provider authentication initiation for Keycloak Rust.
//!
//! Given a request that needs authentication, this crate decides how to
//! authenticate the user against an identity provider and produces the
//! outbound message:
//!
//! - **Entity resolution** - local entity from attributes, alias paths or the
//!   hosted SP; peer IDP from attributes, the `idp` parameter or the default
//! - **Trust context** - decrypter, signing and TLS credentials, PKIX or
//!   explicit-key trust engines, hostname verification
//! - **Profile selection** - ECP, IDP discovery, Web Browser SSO or
//!   Holder-of-Key SSO
//! - **Bindings** - HTTP-Redirect (optionally signed), HTTP-POST and PAOS
//!
//! # Architecture
//!
//! - [`metadata`] - Entity descriptors, extended metadata and the metadata store
//! - [`credential`] - Credentials and the key store
//! - [`entity`] - Local and peer entity resolution
//! - [`trust`] - Trust context construction
//! - [`profile`] - Profile options, selection and the SSO initiators
//! - [`entry_point`] - The per-request pipeline
//! - [`endpoints`] - Axum handler for the login endpoint
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use kc_saml_sp::endpoints::{sp_router, SpState};
//! use kc_saml_sp::SsoEntryPoint;
//!
//! let entry_point = SsoEntryPoint::with_standard_initiators(metadata, keys, storage, logger);
//! let app = sp_router().with_state(SpState::new(Arc::new(entry_point)));
//! ```
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [SAML 2.0 Profiles](https://docs.oasis-open.org/security/saml/v2.0/saml-profiles-2.0-os.pdf)
//! - [SAML 2.0 Metadata](https://docs.oasis-open.org/security/saml/v2.0/saml-metadata-2.0-os.pdf)
//! - [Holder-of-Key Web Browser SSO](https://docs.oasis-open.org/security/saml/Post2.0/sstc-saml-holder-of-key-browser-sso.html)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod context;
pub mod credential;
pub mod endpoints;
pub mod entity;
pub mod entry_point;
pub mod error;
pub mod event;
pub mod metadata;
pub mod profile;
pub mod signature;
pub mod storage;
pub mod transport;
pub mod trust;
pub mod types;

#[cfg(test)]
mod testing;

pub use context::{LocalEntity, PeerEntity, RequestContext};
pub use credential::{Credential, InMemoryKeyStore, KeyStore};
pub use entry_point::SsoEntryPoint;
pub use error::{ErrorKind, SpError, SpResult};
pub use metadata::{EntityDescriptor, EntityRole, ExtendedMetadata, InMemoryMetadataStore, MetadataStore};
pub use profile::{ProfileDecision, ProfileOptions, ProfileSelector};
pub use transport::{InboundRequest, OutboundResponse, RequestAttributes};
