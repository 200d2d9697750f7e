//! Entity metadata.
//!
//! - [`EntityDescriptor`] and the role descriptors it carries
//! - [`ExtendedMetadata`] for deployment settings outside SAML metadata
//! - [`MetadataStore`] for lookups by entity id and alias

mod descriptor;
mod extended;
mod store;

pub use descriptor::*;
pub use extended::*;
pub use store::*;
