//! SAML AuthnRequest types.
//!
//! Authentication request message sent by this service provider to an
//! identity provider.

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

use super::{AuthnContextClass, SamlBinding, HOK_WEBSSO_PROFILE_URI, SAMLP_NS, SAML_NS};

/// SAML Authentication Request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    #[serde(default = "default_version")]
    pub version: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the service provider issuing the request.
    pub issuer: String,

    /// The URL where the response should be sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_consumer_service_url: Option<String>,

    /// Index into the SP's assertion consumer service list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_consumer_service_index: Option<u32>,

    /// The IDP endpoint this request is sent to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Binding the IDP should use for the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_binding: Option<String>,

    /// Binding carried in `hoksso:ProtocolBinding` for Holder-of-Key requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hok_protocol_binding: Option<String>,

    /// Name ID policy constraints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id_policy: Option<NameIdPolicy>,

    /// Requested authentication context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_authn_context: Option<RequestedAuthnContext>,

    /// Whether the IdP must authenticate the user directly.
    #[serde(default)]
    pub force_authn: bool,

    /// Whether the IdP must not interact with the user.
    #[serde(default)]
    pub is_passive: bool,

    /// A human-readable name for the requester.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,

    /// The RelayState sent alongside the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_state: Option<String>,
}

fn default_version() -> String {
    "2.0".to_string()
}

impl AuthnRequest {
    /// Creates a new authentication request.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            version: default_version(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            assertion_consumer_service_url: None,
            assertion_consumer_service_index: None,
            destination: None,
            protocol_binding: None,
            hok_protocol_binding: None,
            name_id_policy: None,
            requested_authn_context: None,
            force_authn: false,
            is_passive: false,
            provider_name: None,
            relay_state: None,
        }
    }

    /// Sets the assertion consumer service URL.
    #[must_use]
    pub fn with_acs_url(mut self, url: impl Into<String>) -> Self {
        self.assertion_consumer_service_url = Some(url.into());
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the protocol binding for the response.
    #[must_use]
    pub fn with_binding(mut self, binding: SamlBinding) -> Self {
        self.protocol_binding = Some(binding.uri().to_string());
        self
    }

    /// Marks this request as Holder-of-Key, answered over `response_binding`.
    #[must_use]
    pub fn with_holder_of_key(mut self, response_binding: impl Into<String>) -> Self {
        self.protocol_binding = Some(HOK_WEBSSO_PROFILE_URI.to_string());
        self.hok_protocol_binding = Some(response_binding.into());
        self
    }

    /// Sets the name ID policy.
    #[must_use]
    pub fn with_name_id_policy(mut self, policy: NameIdPolicy) -> Self {
        self.name_id_policy = Some(policy);
        self
    }

    /// Sets the requested authentication context.
    #[must_use]
    pub fn with_authn_context(mut self, context: RequestedAuthnContext) -> Self {
        self.requested_authn_context = Some(context);
        self
    }

    /// Sets force authentication.
    #[must_use]
    pub const fn force_authn(mut self, force: bool) -> Self {
        self.force_authn = force;
        self
    }

    /// Sets passive authentication.
    #[must_use]
    pub const fn is_passive(mut self, passive: bool) -> Self {
        self.is_passive = passive;
        self
    }

    /// Sets the provider name.
    #[must_use]
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Sets the relay state.
    #[must_use]
    pub fn with_relay_state(mut self, state: impl Into<String>) -> Self {
        self.relay_state = Some(state.into());
        self
    }

    /// Returns the parsed protocol binding.
    #[must_use]
    pub fn parsed_binding(&self) -> Option<SamlBinding> {
        self.protocol_binding.as_deref().and_then(SamlBinding::from_uri)
    }

    /// Serializes this request to a `samlp:AuthnRequest` element.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut attributes = format!(
            r#"ID="{}" Version="{}" IssueInstant="{}""#,
            escape(self.id.as_str()),
            escape(self.version.as_str()),
            self.issue_instant.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        push_attribute(&mut attributes, "Destination", self.destination.as_deref());
        push_attribute(
            &mut attributes,
            "AssertionConsumerServiceURL",
            self.assertion_consumer_service_url.as_deref(),
        );
        if let Some(index) = self.assertion_consumer_service_index {
            attributes.push_str(&format!(r#" AssertionConsumerServiceIndex="{index}""#));
        }
        push_attribute(&mut attributes, "ProtocolBinding", self.protocol_binding.as_deref());
        if let Some(binding) = &self.hok_protocol_binding {
            attributes.push_str(&format!(
                r#" xmlns:hoksso="{}" hoksso:ProtocolBinding="{}""#,
                HOK_WEBSSO_PROFILE_URI,
                escape(binding.as_str())
            ));
        }
        if self.force_authn {
            attributes.push_str(r#" ForceAuthn="true""#);
        }
        if self.is_passive {
            attributes.push_str(r#" IsPassive="true""#);
        }
        push_attribute(&mut attributes, "ProviderName", self.provider_name.as_deref());

        let mut children = format!("<saml:Issuer>{}</saml:Issuer>", escape(self.issuer.as_str()));
        if let Some(policy) = &self.name_id_policy {
            children.push_str(&policy.to_xml());
        }
        if let Some(context) = &self.requested_authn_context {
            children.push_str(&context.to_xml());
        }

        format!(
            r#"<samlp:AuthnRequest xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" {attributes}>{children}</samlp:AuthnRequest>"#
        )
    }
}

fn push_attribute(attributes: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        attributes.push_str(&format!(r#" {name}="{}""#, escape(value)));
    }
}

/// Name ID policy of an authentication request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameIdPolicy {
    /// The requested name ID format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// The SP name qualifier for the name ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sp_name_qualifier: Option<String>,

    /// Whether the IDP may create a new identifier for the principal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_create: Option<bool>,
}

impl NameIdPolicy {
    fn to_xml(&self) -> String {
        let mut attributes = String::new();
        push_attribute(&mut attributes, "Format", self.format.as_deref());
        push_attribute(&mut attributes, "SPNameQualifier", self.sp_name_qualifier.as_deref());
        if let Some(allow_create) = self.allow_create {
            attributes.push_str(&format!(r#" AllowCreate="{allow_create}""#));
        }
        format!("<samlp:NameIDPolicy{attributes}/>")
    }
}

/// Requested authentication context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedAuthnContext {
    /// Comparison method for the authentication context.
    #[serde(default)]
    pub comparison: AuthnContextComparison,

    /// Acceptable authentication context class references.
    #[serde(default)]
    pub authn_context_class_refs: Vec<String>,
}

impl RequestedAuthnContext {
    /// Creates a context requiring exact match of a class reference.
    #[must_use]
    pub fn exact(class: AuthnContextClass) -> Self {
        Self {
            comparison: AuthnContextComparison::Exact,
            authn_context_class_refs: vec![class.uri().to_string()],
        }
    }

    /// Sets the comparison method.
    #[must_use]
    pub const fn with_comparison(mut self, comparison: AuthnContextComparison) -> Self {
        self.comparison = comparison;
        self
    }

    fn to_xml(&self) -> String {
        let refs: String = self
            .authn_context_class_refs
            .iter()
            .map(|class| format!("<saml:AuthnContextClassRef>{}</saml:AuthnContextClassRef>", escape(class.as_str())))
            .collect();
        format!(
            r#"<samlp:RequestedAuthnContext Comparison="{}">{refs}</samlp:RequestedAuthnContext>"#,
            self.comparison.as_str()
        )
    }
}

/// Authentication context comparison methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthnContextComparison {
    /// Exact match required.
    #[default]
    Exact,
    /// Match must be at least as strong.
    Minimum,
    /// Match must be at most as strong.
    Maximum,
    /// Match must be stronger than any listed context.
    Better,
}

impl AuthnContextComparison {
    /// Returns the string value for this comparison.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Better => "better",
        }
    }
}
