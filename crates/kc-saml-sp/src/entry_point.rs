//! The authentication-initiation pipeline.

use std::sync::Arc;

use crate::context::RequestContext;
use crate::credential::KeyStore;
use crate::entity::EntityResolver;
use crate::error::SpResult;
use crate::event::{Event, EventType, SamlEventLogger};
use crate::metadata::MetadataStore;
use crate::profile::{
    EcpInitiator, HolderOfKeyInitiator, InitiatorSet, ProfileOptions, ProfileSelector, WebSsoInitiator,
};
use crate::storage::MessageStorageFactory;
use crate::transport::{InboundRequest, OutboundResponse};
use crate::trust::{AnchorFallback, TrustContextBuilder};

/// Starts SAML authentication for requests needing a login.
///
/// Each call resolves the local entity, builds its trust context, binds the
/// peer IDP and lets the [`ProfileSelector`] produce the response.
pub struct SsoEntryPoint {
    entities: EntityResolver,
    trust: TrustContextBuilder,
    storage: Arc<dyn MessageStorageFactory>,
    selector: ProfileSelector,
    options: ProfileOptions,
    logger: Arc<dyn SamlEventLogger>,
}

impl SsoEntryPoint {
    /// Creates an entry point with the given initiators.
    #[must_use]
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        key_store: Arc<dyn KeyStore>,
        storage: Arc<dyn MessageStorageFactory>,
        initiators: InitiatorSet,
        logger: Arc<dyn SamlEventLogger>,
    ) -> Self {
        let entities = EntityResolver::new(metadata.clone());
        Self {
            selector: ProfileSelector::new(initiators, entities.clone(), logger.clone()),
            trust: TrustContextBuilder::new(metadata, key_store),
            entities,
            storage,
            options: ProfileOptions::default(),
            logger,
        }
    }

    /// Creates an entry point wired with WebSSO, Holder-of-Key and ECP.
    #[must_use]
    pub fn with_standard_initiators(
        metadata: Arc<dyn MetadataStore>,
        key_store: Arc<dyn KeyStore>,
        storage: Arc<dyn MessageStorageFactory>,
        logger: Arc<dyn SamlEventLogger>,
    ) -> Self {
        let initiators = InitiatorSet::new(Arc::new(WebSsoInitiator::new(logger.clone())))
            .with_holder_of_key(Arc::new(HolderOfKeyInitiator::new(logger.clone())))
            .with_ecp(Arc::new(EcpInitiator::new(metadata.clone(), logger.clone())));
        Self::new(metadata, key_store, storage, initiators, logger)
    }

    /// Sets the deployment-wide profile options.
    #[must_use]
    pub fn with_options(mut self, options: ProfileOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the PKIX anchor fallback policy.
    #[must_use]
    pub fn with_anchor_fallback(mut self, anchor_fallback: AnchorFallback) -> Self {
        self.trust = self.trust.with_anchor_fallback(anchor_fallback);
        self
    }

    /// Returns the deployment-wide profile options.
    #[must_use]
    pub const fn options(&self) -> &ProfileOptions {
        &self.options
    }

    /// Initiates authentication for `request`.
    ///
    /// # Errors
    ///
    /// Returns the first resolution, trust or initiation failure. Every
    /// failure is also recorded as an initiation error event.
    pub async fn commence(&self, request: InboundRequest) -> SpResult<OutboundResponse> {
        let remote_addr = request.remote_addr().map(String::from);
        let options = self.options.clone().for_request(&request);

        let mut context = match self.prepare(request) {
            Ok(context) => context,
            Err(err) => {
                tracing::warn!(error = %err, "Unable to resolve the request context");
                self.logger
                    .log(
                        Event::builder(EventType::SsoInitiationError)
                            .failure(err.to_string())
                            .ip_address(remote_addr.as_deref())
                            .detail("kind", format!("{:?}", err.kind()))
                            .build(),
                    )
                    .await;
                return Err(err);
            }
        };

        self.selector.select(&mut context, &options).await
    }

    fn prepare(&self, request: InboundRequest) -> SpResult<RequestContext> {
        let local = self.entities.resolve_local(&request)?;
        let trust = self.trust.build(&local, &request)?;
        let peer = self.entities.resolve_peer_entity(&request)?;
        let storage = self.storage.storage_for(&request);

        let mut context = RequestContext::new(request, local, trust, storage);
        if let Some(peer) = peer {
            context.set_peer(peer)?;
        }
        Ok(context)
    }
}
