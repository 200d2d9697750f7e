//! Holder-of-Key Web Browser SSO initiator.

use std::sync::Arc;

use async_trait::async_trait;

use super::websso::{authn_request, encode, requires_signing, sent_event};
use super::{consumer_service, ProfileOptions, SsoInitiator, SsoProfile};
use crate::context::RequestContext;
use crate::error::{SpError, SpResult};
use crate::event::{EventType, SamlEventLogger};
use crate::metadata::{Endpoint, IndexedEndpoint};
use crate::transport::OutboundResponse;
use crate::types::SamlBinding;

/// Sends a Holder-of-Key `AuthnRequest` to the IDP's HoK SSO service.
///
/// The IDP endpoint's `hoksso:ProtocolBinding` decides how the request
/// travels; the consumer endpoint's one decides how the response returns.
pub struct HolderOfKeyInitiator {
    logger: Arc<dyn SamlEventLogger>,
}

impl HolderOfKeyInitiator {
    /// Creates an initiator reporting to `logger`.
    #[must_use]
    pub fn new(logger: Arc<dyn SamlEventLogger>) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl SsoInitiator for HolderOfKeyInitiator {
    fn profile(&self) -> SsoProfile {
        SsoProfile::HolderOfKey
    }

    async fn initiate(&self, context: &RequestContext, options: &ProfileOptions) -> SpResult<OutboundResponse> {
        let sp = context.local_sp_descriptor()?;
        let idp = context.peer_idp_descriptor()?;
        let idp_id = context.peer_entity_id().ok_or(SpError::NoIdentityProvider)?;

        let acs = consumer_service(sp, options.assertion_consumer_index(), context.local_entity_id())?;
        let response_binding = hok_response_binding(acs)?;
        let sso = idp
            .single_sign_on_service(SamlBinding::HolderOfKey)
            .ok_or_else(|| SpError::NoSingleSignOnService(idp_id.to_string()))?;
        let transport = hok_transport(sso)?;

        let request = authn_request(context, options)
            .with_destination(sso.location.as_str())
            .with_acs_url(acs.location.as_str())
            .with_holder_of_key(response_binding.uri());

        let sign = requires_signing(sp, idp);
        let response = encode(context, &request, transport, &sso.location, options.relay_state(), sign)?;
        context
            .message_storage()
            .store(&request.id, &request, options.message_ttl())
            .await?;

        tracing::debug!(
            request_id = %request.id,
            destination = %sso.location,
            "Holder-of-Key request sent"
        );
        self.logger
            .log(
                sent_event(EventType::HokSsoRequestSent, context, &request)
                    .detail("binding", transport.uri())
                    .detail("response_binding", response_binding.uri())
                    .detail("destination", sso.location.as_str())
                    .build(),
            )
            .await;

        Ok(response)
    }
}

fn hok_response_binding(acs: &IndexedEndpoint) -> SpResult<SamlBinding> {
    if acs.parsed_binding() != Some(SamlBinding::HolderOfKey) {
        return Err(SpError::UnsupportedBinding(format!(
            "assertion consumer service {} is not a Holder-of-Key endpoint",
            acs.index
        )));
    }
    match acs.hok_protocol_binding.as_deref().map(SamlBinding::from_uri) {
        None => Ok(SamlBinding::HttpPost),
        Some(Some(binding @ (SamlBinding::HttpPost | SamlBinding::HttpArtifact))) => Ok(binding),
        Some(_) => Err(SpError::UnsupportedBinding(format!(
            "Holder-of-Key consumer {} must answer over HTTP-POST or HTTP-Artifact",
            acs.index
        ))),
    }
}

fn hok_transport(sso: &Endpoint) -> SpResult<SamlBinding> {
    match sso.hok_protocol_binding.as_deref().map(SamlBinding::from_uri) {
        None => Ok(SamlBinding::HttpRedirect),
        Some(Some(binding)) if binding.is_browser_request_binding() => Ok(binding),
        Some(_) => Err(SpError::UnsupportedBinding(format!(
            "Holder-of-Key SSO service {} must accept HTTP-Redirect or HTTP-POST",
            sso.location
        ))),
    }
}
