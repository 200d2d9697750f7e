//! SAML bindings for outbound authentication requests.
//!
//! - **HTTP-Redirect Binding** - Messages are deflated, base64-encoded, and URL-encoded
//! - **HTTP-POST Binding** - Messages are base64-encoded and sent in an auto-submitting form
//! - **PAOS Binding** - Messages are wrapped in a SOAP envelope for ECP clients
//!
//! # Usage
//!
//! ```rust,ignore
//! use kc_saml_sp::bindings::{HttpPostBinding, HttpRedirectBinding};
//!
//! let html = HttpPostBinding::encode_request(&request_xml, "https://idp.example.com/sso", Some("relay_state"));
//! let url = HttpRedirectBinding::encode_request(&request_xml, "https://idp.example.com/sso", Some("relay_state"))?;
//! ```

mod paos;
mod post;
mod redirect;

pub use paos::*;
pub use post::*;
pub use redirect::*;

pub(crate) use post::html_escape;

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// Request message.
    Request,
    /// Response message.
    Response,
}

impl SamlMessageType {
    /// Returns the form parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// Decoded SAML binding message.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// The decoded XML message.
    pub xml: String,
    /// The message type (request or response).
    pub message_type: SamlMessageType,
    /// The RelayState if present.
    pub relay_state: Option<String>,
    /// The signature (for redirect binding).
    pub signature: Option<String>,
    /// The signature algorithm (for redirect binding).
    pub sig_alg: Option<String>,
}
