//! Web Browser SSO initiator.

use std::sync::Arc;

use async_trait::async_trait;

use super::{consumer_service, ProfileOptions, SsoInitiator, SsoProfile};
use crate::bindings::{HttpPostBinding, HttpRedirectBinding};
use crate::context::RequestContext;
use crate::error::{SpError, SpResult};
use crate::event::{Event, EventType, SamlEventLogger};
use crate::metadata::{Endpoint, IdpSsoDescriptor, IndexedEndpoint, SpSsoDescriptor};
use crate::signature::SignatureAlgorithm;
use crate::transport::OutboundResponse;
use crate::types::{AuthnRequest, SamlBinding};

/// Sends an `AuthnRequest` to the IDP through the browser.
pub struct WebSsoInitiator {
    logger: Arc<dyn SamlEventLogger>,
}

impl WebSsoInitiator {
    /// Creates an initiator reporting to `logger`.
    #[must_use]
    pub fn new(logger: Arc<dyn SamlEventLogger>) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl SsoInitiator for WebSsoInitiator {
    fn profile(&self) -> SsoProfile {
        SsoProfile::WebSso
    }

    async fn initiate(&self, context: &RequestContext, options: &ProfileOptions) -> SpResult<OutboundResponse> {
        let sp = context.local_sp_descriptor()?;
        let idp = context.peer_idp_descriptor()?;
        let idp_id = context.peer_entity_id().ok_or(SpError::NoIdentityProvider)?;

        let acs = consumer_service(sp, options.assertion_consumer_index(), context.local_entity_id())?;
        let response_binding = response_binding(acs)?;
        let sso = single_sign_on_service(idp, options.binding(), idp_id)?;
        let transport = sso
            .parsed_binding()
            .ok_or_else(|| SpError::UnsupportedBinding(sso.binding.clone()))?;

        let request = authn_request(context, options)
            .with_destination(sso.location.as_str())
            .with_acs_url(acs.location.as_str())
            .with_binding(response_binding);

        let sign = requires_signing(sp, idp);
        let response = encode(context, &request, transport, &sso.location, options.relay_state(), sign)?;
        context
            .message_storage()
            .store(&request.id, &request, options.message_ttl())
            .await?;

        tracing::debug!(
            request_id = %request.id,
            destination = %sso.location,
            binding = transport.uri(),
            "WebSSO request sent"
        );
        self.logger
            .log(
                sent_event(EventType::SsoRequestSent, context, &request)
                    .detail("binding", transport.uri())
                    .detail("destination", sso.location.as_str())
                    .detail("assertion_consumer_service", acs.location.as_str())
                    .build(),
            )
            .await;

        Ok(response)
    }
}

/// Response binding of a browser assertion consumer service.
fn response_binding(acs: &IndexedEndpoint) -> SpResult<SamlBinding> {
    let binding = match acs.parsed_binding() {
        Some(SamlBinding::HolderOfKey) => acs
            .hok_protocol_binding
            .as_deref()
            .map_or(Some(SamlBinding::HttpPost), SamlBinding::from_uri),
        other => other,
    };
    match binding {
        Some(binding @ (SamlBinding::HttpPost | SamlBinding::HttpArtifact)) => Ok(binding),
        _ => Err(SpError::UnsupportedBinding(format!(
            "assertion consumer service {} uses {}, only HTTP-POST and HTTP-Artifact are supported",
            acs.index, acs.binding
        ))),
    }
}

/// IDP SSO service for the preferred browser binding, else the other one.
fn single_sign_on_service<'a>(
    idp: &'a IdpSsoDescriptor,
    preferred: SamlBinding,
    idp_id: &str,
) -> SpResult<&'a Endpoint> {
    let preferred = if preferred.is_browser_request_binding() {
        preferred
    } else {
        tracing::warn!(binding = preferred.uri(), "Binding cannot carry a browser request, using HTTP-Redirect");
        SamlBinding::HttpRedirect
    };
    let fallback = match preferred {
        SamlBinding::HttpPost => SamlBinding::HttpRedirect,
        _ => SamlBinding::HttpPost,
    };
    idp.single_sign_on_service(preferred)
        .or_else(|| idp.single_sign_on_service(fallback))
        .ok_or_else(|| SpError::NoSingleSignOnService(idp_id.to_string()))
}

/// Request skeleton carrying the options shared by every profile.
pub(super) fn authn_request(context: &RequestContext, options: &ProfileOptions) -> AuthnRequest {
    let mut request = AuthnRequest::new(context.local_entity_id())
        .force_authn(options.force_authn())
        .is_passive(options.passive());
    if let Some(policy) = options.name_id_policy() {
        request = request.with_name_id_policy(policy);
    }
    if let Some(authn_context) = options.requested_authn_context() {
        request = request.with_authn_context(authn_context);
    }
    if let Some(name) = options.provider_name() {
        request = request.with_provider_name(name);
    }
    if let Some(relay_state) = options.relay_state() {
        request = request.with_relay_state(relay_state);
    }
    request
}

pub(super) fn requires_signing(sp: &SpSsoDescriptor, idp: &IdpSsoDescriptor) -> bool {
    sp.authn_requests_signed || idp.want_authn_requests_signed
}

/// Encodes `request` for a browser binding.
///
/// Redirect requests are signed over the query string when `sign` is set
/// and the signing credential holds a private key.
pub(super) fn encode(
    context: &RequestContext,
    request: &AuthnRequest,
    transport: SamlBinding,
    destination: &str,
    relay_state: Option<&str>,
    sign: bool,
) -> SpResult<OutboundResponse> {
    let xml = request.to_xml();
    match transport {
        SamlBinding::HttpRedirect => {
            let credential = &context.trust().signing_credential;
            let location = if sign && credential.has_private_key() {
                let algorithm = SignatureAlgorithm::from_config(context.local_extended().signing_algorithm.as_deref());
                HttpRedirectBinding::encode_signed_request(&xml, destination, relay_state, credential, algorithm)?
            } else {
                if sign {
                    tracing::warn!(
                        credential = %credential.name,
                        "Signing credential has no private key, sending unsigned request"
                    );
                }
                HttpRedirectBinding::encode_request(&xml, destination, relay_state)?
            };
            Ok(OutboundResponse::Redirect { location })
        }
        SamlBinding::HttpPost if sign => Err(SpError::UnsupportedBinding(
            "signed requests over HTTP-POST".to_string(),
        )),
        SamlBinding::HttpPost => Ok(OutboundResponse::PostForm {
            html: HttpPostBinding::encode_request(&xml, destination, relay_state),
        }),
        other => Err(SpError::UnsupportedBinding(other.uri().to_string())),
    }
}

pub(super) fn sent_event(
    event_type: EventType,
    context: &RequestContext,
    request: &AuthnRequest,
) -> crate::event::EventBuilder {
    Event::builder(event_type)
        .local_entity(context.local_entity_id())
        .peer_entity(context.peer_entity_id())
        .message(request.id.as_str())
        .ip_address(context.request().remote_addr())
}
