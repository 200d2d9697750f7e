//! Inbound request view and outbound responses.
//!
//! [`InboundRequest`] captures what the engine needs from an HTTP request:
//! path, query parameters, headers, pre-bound entity attributes and the TLS
//! client certificate chain. [`OutboundResponse`] is the single message the
//! engine produces for a request.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use crate::types::ecp::PAOS_CONTENT_TYPE;

/// Entity ids bound to the request before the engine runs.
///
/// Inserted as a request extension by deployments that resolve entities
/// upstream, for example from a virtual host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestAttributes {
    /// Pre-bound local entity id.
    pub local_entity_id: Option<String>,
    /// Pre-bound peer entity id.
    pub peer_entity_id: Option<String>,
}

/// The inbound HTTP request.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    attributes: RequestAttributes,
    client_certificates: Vec<Vec<u8>>,
    context_path: String,
    remote_addr: Option<String>,
}

impl InboundRequest {
    /// Creates a request for `path` (without query string).
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Parses and stores a raw query string.
    #[must_use]
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = url::form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        self
    }

    /// Adds a single query parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Replaces the request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Appends a header; invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the pre-bound entity attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: RequestAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the client certificate chain (DER, leaf first).
    #[must_use]
    pub fn with_client_certificates(mut self, chain: Vec<Vec<u8>>) -> Self {
        self.client_certificates = chain;
        self
    }

    /// Sets the path prefix the application is mounted under.
    #[must_use]
    pub fn with_context_path(mut self, context_path: impl Into<String>) -> Self {
        self.context_path = context_path.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the peer address.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the first value of query parameter `name`.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns every value of header `name`, joined by commas.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self
            .headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(","))
        }
    }

    /// Returns the pre-bound entity attributes.
    #[must_use]
    pub const fn attributes(&self) -> &RequestAttributes {
        &self.attributes
    }

    /// Returns the client certificate chain.
    #[must_use]
    pub fn client_certificates(&self) -> &[Vec<u8>] {
        &self.client_certificates
    }

    /// Returns the context path, without trailing slash.
    #[must_use]
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Returns the peer address, if known.
    #[must_use]
    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }
}

/// The message sent back for an authentication initiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundResponse {
    /// HTTP 302 to `location`.
    Redirect {
        /// Target URL.
        location: String,
    },
    /// Auto-submitting HTML form.
    PostForm {
        /// The rendered page.
        html: String,
    },
    /// PAOS SOAP envelope for an ECP client.
    Paos {
        /// The SOAP envelope.
        envelope: String,
    },
}

impl OutboundResponse {
    /// Returns the redirect target, if this is a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Redirect { location } => Some(location),
            _ => None,
        }
    }
}

impl IntoResponse for OutboundResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect { location } => (
                StatusCode::FOUND,
                [
                    (header::LOCATION, location),
                    (header::CACHE_CONTROL, "no-cache, no-store".to_string()),
                    (header::PRAGMA, "no-cache".to_string()),
                ],
            )
                .into_response(),
            Self::PostForm { html } => (
                [
                    (header::CACHE_CONTROL, "no-cache, no-store"),
                    (header::PRAGMA, "no-cache"),
                ],
                Html(html),
            )
                .into_response(),
            Self::Paos { envelope } => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, PAOS_CONTENT_TYPE)],
                envelope,
            )
                .into_response(),
        }
    }
}
