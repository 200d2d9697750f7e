//! Selection of the authentication profile for a request.

use std::sync::Arc;

use super::{consumer_service, discovery_url, is_discovery_return, InitiatorSet, ProfileOptions, SsoInitiator};
use crate::context::RequestContext;
use crate::entity::EntityResolver;
use crate::error::{SpError, SpResult};
use crate::event::{Event, EventType, SamlEventLogger};
use crate::transport::OutboundResponse;
use crate::types::ecp::{ECP_NS, PAOS_CONTENT_TYPE, PAOS_HEADER, PAOS_NS};
use crate::types::SamlBinding;

/// Outcome of profile selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileDecision {
    /// Answer the ECP client with a PAOS request.
    Ecp,
    /// Send the user to the discovery service.
    Discovery {
        /// Discovery URL including `entityID` and `returnIDParam`.
        url: String,
    },
    /// Web Browser SSO answered at the given consumer index.
    WebSso {
        /// Assertion consumer service index.
        consumer_index: u32,
    },
    /// Holder-of-Key SSO answered at the given consumer index.
    HolderOfKey {
        /// Assertion consumer service index.
        consumer_index: u32,
    },
}

/// Chooses between ECP, discovery, WebSSO and Holder-of-Key SSO and runs
/// the matching initiator.
pub struct ProfileSelector {
    initiators: InitiatorSet,
    entities: EntityResolver,
    logger: Arc<dyn SamlEventLogger>,
}

impl ProfileSelector {
    /// Creates a selector over the wired initiators.
    #[must_use]
    pub fn new(initiators: InitiatorSet, entities: EntityResolver, logger: Arc<dyn SamlEventLogger>) -> Self {
        Self {
            initiators,
            entities,
            logger,
        }
    }

    /// Returns the wired initiators.
    #[must_use]
    pub const fn initiators(&self) -> &InitiatorSet {
        &self.initiators
    }

    /// Returns true if the request comes from an ECP client the local
    /// entity is willing to serve.
    #[must_use]
    pub fn is_ecp(&self, context: &RequestContext) -> bool {
        if !context.local_extended().ecp_enabled {
            return false;
        }
        let request = context.request();
        let accepts_paos = request
            .header("accept")
            .is_some_and(|accept| accept.contains(PAOS_CONTENT_TYPE));
        let advertises_ecp = request
            .header(PAOS_HEADER)
            .is_some_and(|paos| paos.contains(PAOS_NS) && paos.contains(ECP_NS));
        if !(accepts_paos && advertises_ecp) {
            return false;
        }
        if self.initiators.ecp.is_none() {
            tracing::warn!(
                entity_id = context.local_entity_id(),
                "ECP is enabled but no ECP initiator is configured, ignoring ECP request"
            );
            return false;
        }
        true
    }

    /// Returns true if the user must pick an IDP at the discovery service.
    #[must_use]
    pub fn is_discovery_needed(context: &RequestContext) -> bool {
        !context.peer_user_selected()
            && context.local_extended().idp_discovery_enabled
            && !is_discovery_return(context)
    }

    /// Decides the profile without side effects.
    ///
    /// # Errors
    ///
    /// Fails when the assertion consumer service cannot be determined.
    pub fn decide(&self, context: &RequestContext, options: &ProfileOptions) -> SpResult<ProfileDecision> {
        if self.is_ecp(context) {
            return Ok(ProfileDecision::Ecp);
        }
        if Self::is_discovery_needed(context) {
            return Ok(ProfileDecision::Discovery {
                url: discovery_url(context),
            });
        }

        let sp = context.local_sp_descriptor()?;
        let index = options
            .assertion_consumer_index()
            .or(context.local_extended().assertion_consumer_index);
        let acs = consumer_service(sp, index, context.local_entity_id())?;

        if acs.parsed_binding() == Some(SamlBinding::HolderOfKey) {
            if self.initiators.holder_of_key.is_some() {
                return Ok(ProfileDecision::HolderOfKey {
                    consumer_index: acs.index,
                });
            }
            tracing::warn!(
                index = acs.index,
                "Holder-of-Key consumer selected but no Holder-of-Key initiator is configured, using WebSSO"
            );
        }
        Ok(ProfileDecision::WebSso {
            consumer_index: acs.index,
        })
    }

    /// Selects the profile and produces the outbound response.
    ///
    /// Failures are recorded as an initiation error event and returned.
    pub async fn select(&self, context: &mut RequestContext, options: &ProfileOptions) -> SpResult<OutboundResponse> {
        let result = self.dispatch(context, options).await;
        if let Err(err) = &result {
            tracing::warn!(
                entity_id = context.local_entity_id(),
                error = %err,
                "Unable to initiate authentication"
            );
            self.logger
                .log(
                    Event::builder(EventType::SsoInitiationError)
                        .failure(err.to_string())
                        .local_entity(context.local_entity_id())
                        .peer_entity(context.peer_entity_id())
                        .ip_address(context.request().remote_addr())
                        .detail("kind", format!("{:?}", err.kind()))
                        .build(),
                )
                .await;
        }
        result
    }

    async fn dispatch(&self, context: &mut RequestContext, options: &ProfileOptions) -> SpResult<OutboundResponse> {
        let decision = self.decide(context, options)?;
        tracing::debug!(?decision, entity_id = context.local_entity_id(), "Profile selected");

        match decision {
            ProfileDecision::Ecp => {
                let initiator = self
                    .initiators
                    .ecp
                    .as_ref()
                    .ok_or_else(|| SpError::Internal("ECP selected without initiator".to_string()))?;
                initiator.initiate(context, options).await
            }
            ProfileDecision::Discovery { url } => {
                self.logger
                    .log(
                        Event::builder(EventType::DiscoveryRedirect)
                            .local_entity(context.local_entity_id())
                            .ip_address(context.request().remote_addr())
                            .detail("location", url.as_str())
                            .build(),
                    )
                    .await;
                Ok(OutboundResponse::Redirect { location: url })
            }
            ProfileDecision::WebSso { consumer_index } => {
                self.run_sso(self.initiators.web_sso.as_ref(), context, options, consumer_index)
                    .await
            }
            ProfileDecision::HolderOfKey { consumer_index } => {
                let initiator = self
                    .initiators
                    .holder_of_key
                    .as_ref()
                    .ok_or_else(|| SpError::Internal("Holder-of-Key selected without initiator".to_string()))?;
                self.run_sso(initiator.as_ref(), context, options, consumer_index).await
            }
        }
    }

    async fn run_sso(
        &self,
        initiator: &dyn SsoInitiator,
        context: &mut RequestContext,
        options: &ProfileOptions,
        consumer_index: u32,
    ) -> SpResult<OutboundResponse> {
        self.load_peer_metadata(context)?;
        let options = options.clone().with_assertion_consumer_index(consumer_index);
        initiator.initiate(context, &options).await
    }

    fn load_peer_metadata(&self, context: &mut RequestContext) -> SpResult<()> {
        if context.peer_metadata().is_some() {
            return Ok(());
        }
        let peer = context.peer().cloned().ok_or(SpError::NoIdentityProvider)?;
        let metadata = self.entities.resolve_peer_role_metadata(&peer)?;
        context.set_peer_metadata(metadata)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::event::InMemoryEventLogger;
    use crate::metadata::{ExtendedMetadata, InMemoryMetadataStore};
    use crate::profile::SsoProfile;
    use crate::testing::*;
    use crate::transport::{InboundRequest, RequestAttributes};

    /// Records calls instead of sending anything.
    struct Recording {
        profile: SsoProfile,
        calls: Mutex<Vec<(Option<String>, Option<u32>)>>,
    }

    impl Recording {
        fn new(profile: SsoProfile) -> Arc<Self> {
            Arc::new(Self {
                profile,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(Option<String>, Option<u32>)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl SsoInitiator for Recording {
        fn profile(&self) -> SsoProfile {
            self.profile
        }

        async fn initiate(&self, context: &RequestContext, options: &ProfileOptions) -> SpResult<OutboundResponse> {
            self.calls.lock().push((
                context.peer_entity_id().map(String::from),
                options.assertion_consumer_index(),
            ));
            Ok(OutboundResponse::Redirect {
                location: format!("recorded:{}", self.profile),
            })
        }
    }

    struct Harness {
        selector: ProfileSelector,
        web_sso: Arc<Recording>,
        hok: Arc<Recording>,
        ecp: Arc<Recording>,
        logger: Arc<InMemoryEventLogger>,
    }

    fn harness(federation: &Federation, with_hok: bool, with_ecp: bool) -> Harness {
        let web_sso = Recording::new(SsoProfile::WebSso);
        let hok = Recording::new(SsoProfile::HolderOfKey);
        let ecp = Recording::new(SsoProfile::Ecp);
        let mut initiators = InitiatorSet::new(web_sso.clone());
        if with_hok {
            initiators = initiators.with_holder_of_key(hok.clone());
        }
        if with_ecp {
            initiators = initiators.with_ecp(ecp.clone());
        }
        let logger = Arc::new(InMemoryEventLogger::new());
        Harness {
            selector: ProfileSelector::new(initiators, federation.resolver(), logger.clone()),
            web_sso,
            hok,
            ecp,
            logger,
        }
    }

    /// Context with the peer resolved the way the entry point does it.
    fn context_for(federation: &Federation, request: InboundRequest) -> RequestContext {
        let peer = federation.resolver().resolve_peer_entity(&request).unwrap();
        let (mut context, _) = federation.context(request);
        if let Some(peer) = peer {
            context.set_peer(peer).unwrap();
        }
        context
    }

    fn discovery_federation() -> Federation {
        federation_with(
            ExtendedMetadata {
                idp_discovery_enabled: true,
                ecp_enabled: true,
                ..sp_extended()
            },
            sp_descriptor(),
        )
    }

    fn ecp_request() -> InboundRequest {
        login_request()
            .with_header("Accept", "text/html, application/vnd.paos+xml")
            .with_header("PAOS", r#"ver="urn:liberty:paos:2003-08";"urn:oasis:names:tc:SAML:2.0:profiles:SSO:ecp""#)
    }

    #[tokio::test]
    async fn default_idp_web_sso() {
        let federation = federation();
        let h = harness(&federation, true, true);
        let mut context = context_for(&federation, login_request());

        let response = h.selector.select(&mut context, &ProfileOptions::new()).await.unwrap();

        assert_eq!(response.location(), Some("recorded:WebSSO"));
        assert_eq!(h.web_sso.calls(), vec![(Some(IDP_ENTITY.to_string()), Some(ACS_POST))]);
        assert!(!context.peer_user_selected());
        assert!(context.peer_metadata().is_some());
        assert!(h.hok.calls().is_empty());
        assert!(h.ecp.calls().is_empty());
    }

    #[tokio::test]
    async fn user_selected_idp_skips_discovery() {
        let federation = discovery_federation();
        let h = harness(&federation, true, true);
        let request = login_request().with_parameter("idp", OTHER_IDP_ENTITY);
        let mut context = context_for(&federation, request);

        assert!(context.peer_user_selected());
        assert!(!ProfileSelector::is_discovery_needed(&context));
        h.selector.select(&mut context, &ProfileOptions::new()).await.unwrap();
        assert_eq!(h.web_sso.calls()[0].0.as_deref(), Some(OTHER_IDP_ENTITY));
    }

    #[tokio::test]
    async fn pre_bound_peer_is_not_user_selected() {
        let federation = federation();
        let request = login_request()
            .with_parameter("idp", OTHER_IDP_ENTITY)
            .with_attributes(RequestAttributes {
                local_entity_id: None,
                peer_entity_id: Some(IDP_ENTITY.to_string()),
            });
        let context = context_for(&federation, request);

        assert_eq!(context.peer_entity_id(), Some(IDP_ENTITY));
        assert!(!context.peer_user_selected());
    }

    #[tokio::test]
    async fn discovery_redirect() {
        let federation = discovery_federation();
        let h = harness(&federation, true, true);
        let mut context = context_for(&federation, login_request());

        let decision = h.selector.decide(&context, &ProfileOptions::new()).unwrap();
        let ProfileDecision::Discovery { url } = decision else {
            panic!("expected a discovery redirect");
        };
        assert!(url.starts_with("/saml/discovery?"));
        assert!(url.contains("entityID=https%3A%2F%2Fsp.example.org%2Fsaml"));
        assert!(url.contains("returnIDParam=idp"));

        let response = h.selector.select(&mut context, &ProfileOptions::new()).await.unwrap();
        assert_eq!(response.location(), Some(url.as_str()));
        assert!(h.web_sso.calls().is_empty());
        assert_eq!(h.logger.events()[0].event_type, EventType::DiscoveryRedirect);
    }

    #[test]
    fn discovery_return_disables_discovery() {
        let federation = discovery_federation();
        let context = context_for(&federation, login_request().with_query("disco=true"));
        assert!(!ProfileSelector::is_discovery_needed(&context));

        let context = context_for(&federation, login_request());
        assert!(ProfileSelector::is_discovery_needed(&context));
    }

    #[tokio::test]
    async fn ecp_wins_over_discovery() {
        let federation = discovery_federation();
        let h = harness(&federation, true, true);
        let mut context = context_for(&federation, ecp_request());

        assert_eq!(h.selector.decide(&context, &ProfileOptions::new()).unwrap(), ProfileDecision::Ecp);
        h.selector.select(&mut context, &ProfileOptions::new()).await.unwrap();
        assert_eq!(h.ecp.calls(), vec![(Some(IDP_ENTITY.to_string()), None)]);
    }

    #[test]
    fn ecp_without_initiator_falls_through() {
        let federation = discovery_federation();
        let h = harness(&federation, true, false);
        let context = context_for(&federation, ecp_request());

        assert!(!h.selector.is_ecp(&context));
        assert!(matches!(
            h.selector.decide(&context, &ProfileOptions::new()).unwrap(),
            ProfileDecision::Discovery { .. }
        ));
    }

    #[test]
    fn ecp_requires_enablement_and_both_headers() {
        let federation = federation();
        let h = harness(&federation, true, true);
        assert!(!h.selector.is_ecp(&context_for(&federation, ecp_request())));

        let federation = discovery_federation();
        let accept_only = login_request().with_header("Accept", PAOS_CONTENT_TYPE);
        assert!(!h.selector.is_ecp(&context_for(&federation, accept_only)));

        let paos_without_ecp = login_request()
            .with_header("Accept", PAOS_CONTENT_TYPE)
            .with_header("PAOS", r#"ver="urn:liberty:paos:2003-08""#);
        assert!(!h.selector.is_ecp(&context_for(&federation, paos_without_ecp)));
    }

    #[tokio::test]
    async fn hok_consumer_dispatches_to_hok() {
        let federation = federation_with(
            ExtendedMetadata {
                assertion_consumer_index: Some(ACS_HOK),
                ..sp_extended()
            },
            sp_descriptor(),
        );
        let h = harness(&federation, true, true);
        let mut context = context_for(&federation, login_request());

        let response = h.selector.select(&mut context, &ProfileOptions::new()).await.unwrap();
        assert_eq!(response.location(), Some("recorded:HoK WebSSO"));
        assert_eq!(h.hok.calls(), vec![(Some(IDP_ENTITY.to_string()), Some(ACS_HOK))]);
    }

    #[test]
    fn hok_consumer_without_initiator_uses_web_sso() {
        let federation = federation();
        let h = harness(&federation, false, true);
        let context = context_for(&federation, login_request());
        let options = ProfileOptions::new().with_assertion_consumer_index(ACS_HOK);

        assert_eq!(
            h.selector.decide(&context, &options).unwrap(),
            ProfileDecision::WebSso {
                consumer_index: ACS_HOK
            }
        );
    }

    #[test]
    fn options_index_overrides_configured_index() {
        let federation = federation_with(
            ExtendedMetadata {
                assertion_consumer_index: Some(ACS_HOK),
                ..sp_extended()
            },
            sp_descriptor(),
        );
        let h = harness(&federation, true, true);
        let context = context_for(&federation, login_request());
        let options = ProfileOptions::new().with_assertion_consumer_index(ACS_ARTIFACT);

        assert_eq!(
            h.selector.decide(&context, &options).unwrap(),
            ProfileDecision::WebSso {
                consumer_index: ACS_ARTIFACT
            }
        );
    }

    #[tokio::test]
    async fn unknown_consumer_index_is_reported() {
        let federation = federation();
        let h = harness(&federation, true, true);
        let mut context = context_for(&federation, login_request());
        let options = ProfileOptions::new().with_assertion_consumer_index(99);

        let err = h.selector.select(&mut context, &options).await.unwrap_err();
        assert!(err.is_configuration_error());
        assert!(h.web_sso.calls().is_empty());

        let events = h.logger.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::SsoInitiationError);
        assert!(events[0].error.as_deref().unwrap().contains("99"));
        assert_eq!(events[0].detail("kind"), Some("Configuration"));
    }

    #[tokio::test]
    async fn sso_without_peer_fails() {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        metadata.add_entity(sp_descriptor(), sp_extended()).unwrap();
        metadata.set_hosted_sp(HOSTED_SP).unwrap();
        let federation = Federation {
            metadata,
            keys: key_store(),
        };
        let h = harness(&federation, true, true);
        let mut context = context_for(&federation, login_request());
        assert!(context.peer().is_none());

        let err = h.selector.select(&mut context, &ProfileOptions::new()).await.unwrap_err();
        assert!(matches!(err, SpError::NoIdentityProvider));
        assert!(h.web_sso.calls().is_empty());
    }
}
