//! PAOS binding for the Enhanced Client/Proxy profile.
//!
//! The request is returned to the ECP client inside a SOAP 1.1 envelope
//! carrying the `paos:Request` and `ecp:Request` header blocks.

use quick_xml::escape::escape;

use crate::types::ecp::{ECP_NS, PAOS_NS, SOAP11_ACTOR_NEXT, SOAP11_NS};
use crate::types::SAML_NS;

/// Header values of an ECP request envelope.
#[derive(Debug, Clone, Default)]
pub struct EcpRequestHeader {
    /// Where the ECP client must deliver the IDP response.
    pub response_consumer_url: String,
    /// The requesting service provider.
    pub issuer: String,
    /// Human readable name of the requester.
    pub provider_name: Option<String>,
    /// Whether the IDP must not interact with the user.
    pub is_passive: bool,
    /// Identity providers the client may choose from.
    pub idp_list: Vec<String>,
    /// RelayState echoed back by the client.
    pub relay_state: Option<String>,
    /// Correlates the PAOS response with this request.
    pub message_id: Option<String>,
}

/// PAOS binding encoder.
pub struct PaosBinding;

impl PaosBinding {
    /// Wraps a serialized request in a SOAP envelope addressed to an ECP client.
    #[must_use]
    pub fn encode_request(request_xml: &str, header: &EcpRequestHeader) -> String {
        let message_id = header
            .message_id
            .as_deref()
            .map(|id| format!(r#" messageID="{}""#, escape(id)))
            .unwrap_or_default();
        let provider_name = header
            .provider_name
            .as_deref()
            .map(|name| format!(r#" ProviderName="{}""#, escape(name)))
            .unwrap_or_default();
        let idp_list = if header.idp_list.is_empty() {
            String::new()
        } else {
            let entries: String = header
                .idp_list
                .iter()
                .map(|idp| format!(r#"<samlp:IDPEntry ProviderID="{}"/>"#, escape(idp.as_str())))
                .collect();
            format!(r#"<samlp:IDPList xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol">{entries}</samlp:IDPList>"#)
        };
        let relay_state = header
            .relay_state
            .as_deref()
            .map(|rs| {
                format!(
                    r#"<ecp:RelayState xmlns:ecp="{ECP_NS}" S:mustUnderstand="1" S:actor="{SOAP11_ACTOR_NEXT}">{}</ecp:RelayState>"#,
                    escape(rs)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<S:Envelope xmlns:S="{SOAP11_NS}"><S:Header><paos:Request xmlns:paos="{PAOS_NS}" S:mustUnderstand="1" S:actor="{SOAP11_ACTOR_NEXT}" responseConsumerURL="{}" service="{ECP_NS}"{message_id}/><ecp:Request xmlns:ecp="{ECP_NS}" S:mustUnderstand="1" S:actor="{SOAP11_ACTOR_NEXT}" IsPassive="{}"{provider_name}><saml:Issuer xmlns:saml="{SAML_NS}">{}</saml:Issuer>{idp_list}</ecp:Request>{relay_state}</S:Header><S:Body>{request_xml}</S:Body></S:Envelope>"#,
            escape(header.response_consumer_url.as_str()),
            header.is_passive,
            escape(header.issuer.as_str()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_carries_paos_and_ecp_headers() {
        let header = EcpRequestHeader {
            response_consumer_url: "https://sp.example.org/saml/SSO/ecp".to_string(),
            issuer: "https://sp.example.org".to_string(),
            idp_list: vec!["https://idp.example/entity".to_string()],
            relay_state: Some("state".to_string()),
            ..EcpRequestHeader::default()
        };
        let envelope = PaosBinding::encode_request("<samlp:AuthnRequest/>", &header);

        assert!(envelope.starts_with("<S:Envelope"));
        assert!(envelope.contains(r#"responseConsumerURL="https://sp.example.org/saml/SSO/ecp""#));
        assert!(envelope.contains(&format!(r#"service="{ECP_NS}""#)));
        assert!(envelope.contains(r#"IsPassive="false""#));
        assert!(envelope.contains(r#"<samlp:IDPEntry ProviderID="https://idp.example/entity"/>"#));
        assert!(envelope.contains(">state</ecp:RelayState>"));
        assert!(envelope.contains("<S:Body><samlp:AuthnRequest/></S:Body>"));
    }

    #[test]
    fn envelope_without_optional_headers() {
        let header = EcpRequestHeader {
            response_consumer_url: "https://sp/ecp".to_string(),
            issuer: "urn:sp".to_string(),
            ..EcpRequestHeader::default()
        };
        let envelope = PaosBinding::encode_request("<x/>", &header);

        assert!(!envelope.contains("IDPList"));
        assert!(!envelope.contains("RelayState"));
        assert!(!envelope.contains("messageID"));
    }
}
