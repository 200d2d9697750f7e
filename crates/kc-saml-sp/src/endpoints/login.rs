//! Login endpoint.
//!
//! Turns the HTTP request into an [`InboundRequest`] and runs the
//! authentication-initiation pipeline on it.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::bindings::html_escape;
use crate::error::SpError;
use crate::transport::{InboundRequest, RequestAttributes};

use super::state::SpState;

/// Certificate chain (DER, leaf first) the client presented over TLS.
///
/// Inserted as a request extension by a TLS-terminating layer.
#[derive(Debug, Clone, Default)]
pub struct ClientCertificateChain(pub Vec<Vec<u8>>);

/// GET handler starting SAML authentication.
pub async fn login(State(state): State<SpState>, request: Request) -> Response {
    let inbound = inbound_request(&state, &request);
    match state.entry_point.commence(inbound).await {
        Ok(response) => response.into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// Copies what the engine needs out of an HTTP request.
pub fn inbound_request(state: &SpState, request: &Request) -> InboundRequest {
    let uri = request.uri();
    let mut inbound = InboundRequest::new(uri.path())
        .with_query(uri.query().unwrap_or_default())
        .with_headers(request.headers().clone())
        .with_context_path(state.context_path.as_str());

    let extensions = request.extensions();
    if let Some(attributes) = extensions.get::<RequestAttributes>() {
        inbound = inbound.with_attributes(attributes.clone());
    }
    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        inbound = inbound.with_remote_addr(addr.ip().to_string());
    }
    if let Some(ClientCertificateChain(chain)) = extensions.get::<ClientCertificateChain>() {
        inbound = inbound.with_client_certificates(chain.clone());
    }
    inbound
}

/// Creates an error response.
fn error_response(err: &SpError) -> (StatusCode, Html<String>) {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = if err.is_configuration_error() {
        "Authentication cannot be initiated, the service provider is not configured correctly."
    } else {
        "Authentication could not be initiated."
    };
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><title>SAML Error</title></head>
<body>
<h1>SAML Error</h1>
<p>{}</p>
<p>{}</p>
</body>
</html>"#,
        message,
        html_escape(&err.to_string())
    );
    (status, Html(html))
}
