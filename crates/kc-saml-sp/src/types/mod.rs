//! SAML 2.0 types and constants used when initiating authentication.

mod authn_request;
mod constants;

pub use authn_request::*;
pub use constants::*;
