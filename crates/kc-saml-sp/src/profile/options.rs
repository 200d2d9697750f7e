//! Options shaping an outbound authentication request.

use std::time::Duration;

use crate::storage::DEFAULT_MESSAGE_TTL;
use crate::transport::InboundRequest;
use crate::types::{AuthnContextComparison, NameIdPolicy, RequestedAuthnContext, SamlBinding};

/// Request parameter carrying the relay state.
pub const RELAY_STATE_PARAMETER: &str = "RelayState";

/// Immutable options for one authentication request.
///
/// Deployment defaults are built once; per-request values are layered with
/// the consuming `with_*` methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileOptions {
    binding: SamlBinding,
    assertion_consumer_index: Option<u32>,
    relay_state: Option<String>,
    force_authn: bool,
    passive: bool,
    allow_create: Option<bool>,
    name_id_format: Option<String>,
    authn_contexts: Vec<String>,
    authn_context_comparison: AuthnContextComparison,
    provider_name: Option<String>,
    allowed_idps: Vec<String>,
    message_ttl: Duration,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            binding: SamlBinding::HttpRedirect,
            assertion_consumer_index: None,
            relay_state: None,
            force_authn: false,
            passive: false,
            allow_create: None,
            name_id_format: None,
            authn_contexts: Vec::new(),
            authn_context_comparison: AuthnContextComparison::Exact,
            provider_name: None,
            allowed_idps: Vec::new(),
            message_ttl: DEFAULT_MESSAGE_TTL,
        }
    }
}

impl ProfileOptions {
    /// Creates default options (HTTP-Redirect, no constraints).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the preferred binding for sending the request.
    #[must_use]
    pub const fn with_binding(mut self, binding: SamlBinding) -> Self {
        self.binding = binding;
        self
    }

    /// Sets the assertion consumer service index.
    #[must_use]
    pub const fn with_assertion_consumer_index(mut self, index: u32) -> Self {
        self.assertion_consumer_index = Some(index);
        self
    }

    /// Sets the relay state.
    #[must_use]
    pub fn with_relay_state(mut self, relay_state: impl Into<String>) -> Self {
        self.relay_state = Some(relay_state.into());
        self
    }

    /// Requires fresh authentication at the IDP.
    #[must_use]
    pub const fn with_force_authn(mut self, force_authn: bool) -> Self {
        self.force_authn = force_authn;
        self
    }

    /// Forbids user interaction at the IDP.
    #[must_use]
    pub const fn with_passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    /// Sets `AllowCreate` of the name ID policy.
    #[must_use]
    pub const fn with_allow_create(mut self, allow_create: bool) -> Self {
        self.allow_create = Some(allow_create);
        self
    }

    /// Sets the requested name ID format.
    #[must_use]
    pub fn with_name_id_format(mut self, format: impl Into<String>) -> Self {
        self.name_id_format = Some(format.into());
        self
    }

    /// Sets the requested authentication context classes and comparison.
    #[must_use]
    pub fn with_authn_contexts(mut self, contexts: Vec<String>, comparison: AuthnContextComparison) -> Self {
        self.authn_contexts = contexts;
        self.authn_context_comparison = comparison;
        self
    }

    /// Sets the provider name.
    #[must_use]
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Restricts the IDPs offered to ECP clients.
    #[must_use]
    pub fn with_allowed_idps(mut self, idps: Vec<String>) -> Self {
        self.allowed_idps = idps;
        self
    }

    /// Sets how long a sent request is kept for correlation.
    #[must_use]
    pub const fn with_message_ttl(mut self, ttl: Duration) -> Self {
        self.message_ttl = ttl;
        self
    }

    /// Layers the request's `RelayState` parameter over the configured one.
    #[must_use]
    pub fn for_request(self, request: &InboundRequest) -> Self {
        match request.parameter(RELAY_STATE_PARAMETER) {
            Some(relay_state) if !relay_state.is_empty() => self.with_relay_state(relay_state),
            _ => self,
        }
    }

    /// Returns how long a sent request is kept for correlation.
    #[must_use]
    pub const fn message_ttl(&self) -> Duration {
        self.message_ttl
    }

    /// Returns the preferred binding.
    #[must_use]
    pub const fn binding(&self) -> SamlBinding {
        self.binding
    }

    /// Returns the assertion consumer service index.
    #[must_use]
    pub const fn assertion_consumer_index(&self) -> Option<u32> {
        self.assertion_consumer_index
    }

    /// Returns the relay state.
    #[must_use]
    pub fn relay_state(&self) -> Option<&str> {
        self.relay_state.as_deref()
    }

    /// Returns true if fresh authentication is required.
    #[must_use]
    pub const fn force_authn(&self) -> bool {
        self.force_authn
    }

    /// Returns true if the IDP must not interact with the user.
    #[must_use]
    pub const fn passive(&self) -> bool {
        self.passive
    }

    /// Returns the provider name.
    #[must_use]
    pub fn provider_name(&self) -> Option<&str> {
        self.provider_name.as_deref()
    }

    /// Returns the IDPs offered to ECP clients.
    #[must_use]
    pub fn allowed_idps(&self) -> &[String] {
        &self.allowed_idps
    }

    /// Returns the name ID policy, if any constraint is set.
    #[must_use]
    pub fn name_id_policy(&self) -> Option<NameIdPolicy> {
        if self.name_id_format.is_none() && self.allow_create.is_none() {
            return None;
        }
        Some(NameIdPolicy {
            format: self.name_id_format.clone(),
            sp_name_qualifier: None,
            allow_create: self.allow_create,
        })
    }

    /// Returns the requested authentication context, if any class is set.
    #[must_use]
    pub fn requested_authn_context(&self) -> Option<RequestedAuthnContext> {
        if self.authn_contexts.is_empty() {
            return None;
        }
        Some(RequestedAuthnContext {
            comparison: self.authn_context_comparison,
            authn_context_class_refs: self.authn_contexts.clone(),
        })
    }
}
