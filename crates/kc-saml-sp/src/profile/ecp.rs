//! Enhanced Client/Proxy initiator.

use std::sync::Arc;

use async_trait::async_trait;

use super::websso::{authn_request, sent_event};
use super::{ProfileOptions, SsoInitiator, SsoProfile};
use crate::bindings::{EcpRequestHeader, PaosBinding};
use crate::context::RequestContext;
use crate::error::{SpError, SpResult};
use crate::event::{EventType, SamlEventLogger};
use crate::metadata::MetadataStore;
use crate::transport::OutboundResponse;
use crate::types::SamlBinding;

/// Answers an ECP client with a PAOS envelope wrapping an `AuthnRequest`.
///
/// The client picks the IDP itself; the envelope lists the allowed ones.
pub struct EcpInitiator {
    metadata: Arc<dyn MetadataStore>,
    logger: Arc<dyn SamlEventLogger>,
}

impl EcpInitiator {
    /// Creates an initiator listing IDPs from `metadata`.
    #[must_use]
    pub fn new(metadata: Arc<dyn MetadataStore>, logger: Arc<dyn SamlEventLogger>) -> Self {
        Self { metadata, logger }
    }

    fn idp_list(&self, options: &ProfileOptions) -> Vec<String> {
        if options.allowed_idps().is_empty() {
            self.metadata.idp_entity_names()
        } else {
            options.allowed_idps().to_vec()
        }
    }
}

#[async_trait]
impl SsoInitiator for EcpInitiator {
    fn profile(&self) -> SsoProfile {
        SsoProfile::Ecp
    }

    async fn initiate(&self, context: &RequestContext, options: &ProfileOptions) -> SpResult<OutboundResponse> {
        let sp = context.local_sp_descriptor()?;
        let acs = sp
            .assertion_consumer_service_for(SamlBinding::Paos)
            .ok_or_else(|| SpError::NoConsumerService(context.local_entity_id().to_string()))?;

        let request = authn_request(context, options)
            .with_acs_url(acs.location.as_str())
            .with_binding(SamlBinding::Paos);

        let header = EcpRequestHeader {
            response_consumer_url: acs.location.clone(),
            issuer: context.local_entity_id().to_string(),
            provider_name: options.provider_name().map(String::from),
            is_passive: options.passive(),
            idp_list: self.idp_list(options),
            relay_state: options.relay_state().map(String::from),
            message_id: None,
        };
        let envelope = PaosBinding::encode_request(&request.to_xml(), &header);
        context
            .message_storage()
            .store(&request.id, &request, options.message_ttl())
            .await?;

        tracing::debug!(request_id = %request.id, consumer = %acs.location, "ECP request sent");
        self.logger
            .log(
                sent_event(EventType::EcpRequestSent, context, &request)
                    .detail("assertion_consumer_service", acs.location.as_str())
                    .build(),
            )
            .await;

        Ok(OutboundResponse::Paos { envelope })
    }
}
