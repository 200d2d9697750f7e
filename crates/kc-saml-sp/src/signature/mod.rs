//! Detached signatures for the HTTP-Redirect binding.
//!
//! Requests sent with the Redirect binding are signed over the query string
//! (`SAMLRequest`, `RelayState`, `SigAlg`) rather than over the XML. The same
//! octets are reconstructed when a detached signature is verified.
//!
//! # Signing Algorithms
//!
//! - RSA-SHA256 (default)
//! - RSA-SHA384
//! - RSA-SHA512

mod signer;
mod validator;

pub use signer::*;
pub use validator::*;

use crate::types::signature_algorithms;

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// RSA with SHA-256.
    #[default]
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
}

impl SignatureAlgorithm {
    /// Returns the URI for this signature algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => signature_algorithms::RSA_SHA256,
            Self::RsaSha384 => signature_algorithms::RSA_SHA384,
            Self::RsaSha512 => signature_algorithms::RSA_SHA512,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            signature_algorithms::RSA_SHA256 => Some(Self::RsaSha256),
            signature_algorithms::RSA_SHA384 => Some(Self::RsaSha384),
            signature_algorithms::RSA_SHA512 => Some(Self::RsaSha512),
            _ => None,
        }
    }

    /// Resolves the algorithm configured for an entity, falling back to the default.
    #[must_use]
    pub fn from_config(uri: Option<&str>) -> Self {
        match uri {
            None => Self::default(),
            Some(uri) => Self::from_uri(uri).unwrap_or_else(|| {
                tracing::warn!("Unsupported signing algorithm {}, using RSA-SHA256", uri);
                Self::default()
            }),
        }
    }
}
