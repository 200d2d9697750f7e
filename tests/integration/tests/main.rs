//! End-to-End Integration Tests
//!
//! These tests start the SAML SP server on an ephemeral port with a
//! federation file written to a temporary directory.

mod common;
mod sso_initiation;
