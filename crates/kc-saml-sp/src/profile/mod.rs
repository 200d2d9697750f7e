//! Profile selection and the SSO initiators.
//!
//! The [`ProfileSelector`] decides between ECP, IDP discovery, Web Browser
//! SSO and Holder-of-Key SSO, then hands the request context to the matching
//! [`SsoInitiator`].

mod discovery;
mod ecp;
mod hok;
mod initiator;
mod options;
mod selector;
mod websso;

pub use discovery::*;
pub use ecp::*;
pub use hok::*;
pub use initiator::*;
pub use options::*;
pub use selector::*;
pub use websso::*;

use crate::error::{SpError, SpResult};
use crate::metadata::{IndexedEndpoint, SpSsoDescriptor};

/// Picks the assertion consumer service with `index`, or the default one.
///
/// # Errors
///
/// Returns [`SpError::UnknownConsumerIndex`] for an index the SP does not
/// publish and [`SpError::NoConsumerService`] when it publishes none.
pub fn consumer_service<'a>(
    sp: &'a SpSsoDescriptor,
    index: Option<u32>,
    entity_id: &str,
) -> SpResult<&'a IndexedEndpoint> {
    match index {
        Some(index) => sp
            .assertion_consumer_service(index)
            .ok_or_else(|| SpError::UnknownConsumerIndex {
                index,
                entity_id: entity_id.to_string(),
            }),
        None => sp
            .default_assertion_consumer_service()
            .ok_or_else(|| SpError::NoConsumerService(entity_id.to_string())),
    }
}
