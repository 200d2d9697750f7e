//! HTTP-Redirect Binding implementation.
//!
//! Sends SAML messages via URL query parameters with DEFLATE compression,
//! optionally signed over the query string.

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::credential::Credential;
use crate::error::{SpError, SpResult};
use crate::signature::SignatureAlgorithm;

use super::{DecodedMessage, SamlMessageType};

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Encodes a SAML request for HTTP-Redirect binding.
    ///
    /// Returns a URL with the encoded message in query parameters.
    pub fn encode_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> SpResult<String> {
        let query = message_query(xml, relay_state, SamlMessageType::Request)?;
        Ok(append_query(destination, &query))
    }

    /// Encodes a signed SAML request for HTTP-Redirect binding.
    ///
    /// The signature covers `SAMLRequest`, `RelayState` and `SigAlg` as they
    /// appear in the query string; it is not embedded in the XML.
    pub fn encode_signed_request(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        credential: &Credential,
        algorithm: SignatureAlgorithm,
    ) -> SpResult<String> {
        let mut query = message_query(xml, relay_state, SamlMessageType::Request)?;
        query.push_str(&format!("&SigAlg={}", urlencoding::encode(algorithm.uri())));

        let signature = credential.sign(query.as_bytes(), algorithm)?;
        let signature = base64::engine::general_purpose::STANDARD.encode(signature);
        query.push_str(&format!("&Signature={}", urlencoding::encode(&signature)));

        Ok(append_query(destination, &query))
    }

    /// Decodes a SAML message from HTTP-Redirect query parameters.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
        signature: Option<&str>,
        sig_alg: Option<&str>,
    ) -> SpResult<DecodedMessage> {
        let (encoded, message_type) = if let Some(req) = saml_request {
            (req, SamlMessageType::Request)
        } else if let Some(resp) = saml_response {
            (resp, SamlMessageType::Response)
        } else {
            return Err(SpError::Transport(
                "no SAMLRequest or SAMLResponse parameter".to_string(),
            ));
        };

        let compressed = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| SpError::Transport(format!("base64 decode error: {e}")))?;
        let xml = String::from_utf8(deflate_decompress(&compressed)?)
            .map_err(|e| SpError::Transport(format!("invalid UTF-8 in message: {e}")))?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state: relay_state.map(String::from),
            signature: signature.map(String::from),
            sig_alg: sig_alg.map(String::from),
        })
    }

    /// Decodes a message from a full URL.
    pub fn decode_url(url: &str) -> SpResult<DecodedMessage> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SpError::Transport(format!("invalid URL: {e}")))?;

        let mut saml_request = None;
        let mut saml_response = None;
        let mut relay_state = None;
        let mut signature = None;
        let mut sig_alg = None;

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "SAMLRequest" => saml_request = Some(value.to_string()),
                "SAMLResponse" => saml_response = Some(value.to_string()),
                "RelayState" => relay_state = Some(value.to_string()),
                "Signature" => signature = Some(value.to_string()),
                "SigAlg" => sig_alg = Some(value.to_string()),
                _ => {}
            }
        }

        Self::decode(
            saml_request.as_deref(),
            saml_response.as_deref(),
            relay_state.as_deref(),
            signature.as_deref(),
            sig_alg.as_deref(),
        )
    }
}

/// Builds the `SAMLRequest[&RelayState]` part of the query string.
fn message_query(
    xml: &str,
    relay_state: Option<&str>,
    message_type: SamlMessageType,
) -> SpResult<String> {
    let compressed = deflate_compress(xml.as_bytes())?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(compressed);

    let mut query = format!("{}={}", message_type.form_param(), urlencoding::encode(&encoded));
    if let Some(rs) = relay_state {
        query.push_str(&format!("&RelayState={}", urlencoding::encode(rs)));
    }
    Ok(query)
}

fn append_query(destination: &str, query: &str) -> String {
    let separator = if destination.contains('?') { '&' } else { '?' };
    format!("{destination}{separator}{query}")
}

/// Compresses data using DEFLATE (raw, no zlib header).
fn deflate_compress(data: &[u8]) -> SpResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SpError::Deflate(format!("compression error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SpError::Deflate(format!("compression finish error: {e}")))
}

/// Decompresses DEFLATE data.
fn deflate_decompress(data: &[u8]) -> SpResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| SpError::Deflate(format!("decompression error: {e}")))?;
    Ok(decompressed)
}
