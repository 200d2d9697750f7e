//! The initiator seam and the set of wired initiators.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::ProfileOptions;
use crate::context::RequestContext;
use crate::error::SpResult;
use crate::transport::OutboundResponse;

/// Authentication profile an initiator implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SsoProfile {
    /// Web Browser SSO.
    WebSso,
    /// Holder-of-Key Web Browser SSO.
    HolderOfKey,
    /// Enhanced Client/Proxy SSO.
    Ecp,
}

impl fmt::Display for SsoProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WebSso => "WebSSO",
            Self::HolderOfKey => "HoK WebSSO",
            Self::Ecp => "ECP",
        })
    }
}

/// Produces the outbound authentication request of one profile.
#[async_trait]
pub trait SsoInitiator: Send + Sync {
    /// Returns the profile this initiator implements.
    fn profile(&self) -> SsoProfile;

    /// Builds, records and encodes the authentication request.
    async fn initiate(&self, context: &RequestContext, options: &ProfileOptions) -> SpResult<OutboundResponse>;
}

/// Initiators available to the profile selector.
///
/// WebSSO is mandatory; the other profiles are optional.
#[derive(Clone)]
pub struct InitiatorSet {
    /// Web Browser SSO initiator.
    pub web_sso: Arc<dyn SsoInitiator>,
    /// Holder-of-Key initiator, if wired.
    pub holder_of_key: Option<Arc<dyn SsoInitiator>>,
    /// ECP initiator, if wired.
    pub ecp: Option<Arc<dyn SsoInitiator>>,
}

impl InitiatorSet {
    /// Creates a set with only WebSSO.
    #[must_use]
    pub fn new(web_sso: Arc<dyn SsoInitiator>) -> Self {
        Self {
            web_sso,
            holder_of_key: None,
            ecp: None,
        }
    }

    /// Wires a Holder-of-Key initiator.
    #[must_use]
    pub fn with_holder_of_key(mut self, initiator: Arc<dyn SsoInitiator>) -> Self {
        self.holder_of_key = Some(initiator);
        self
    }

    /// Wires an ECP initiator.
    #[must_use]
    pub fn with_ecp(mut self, initiator: Arc<dyn SsoInitiator>) -> Self {
        self.ecp = Some(initiator);
        self
    }
}

impl fmt::Debug for InitiatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitiatorSet")
            .field("web_sso", &self.web_sso.profile())
            .field("holder_of_key", &self.holder_of_key.as_ref().map(|i| i.profile()))
            .field("ecp", &self.ecp.as_ref().map(|i| i.profile()))
            .finish()
    }
}
