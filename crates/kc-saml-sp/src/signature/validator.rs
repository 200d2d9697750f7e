//! Detached signature verification.

use aws_lc_rs::signature::{
    self, UnparsedPublicKey, RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_2048_8192_SHA384,
    RSA_PKCS1_2048_8192_SHA512,
};

use super::SignatureAlgorithm;

/// Verifies `sig` over `data` with a raw subject public key.
///
/// `public_key` is the content of the certificate's `subjectPublicKey` bit
/// string (a PKCS#1 `RSAPublicKey` for RSA keys).
#[must_use]
pub fn verify_data(public_key: &[u8], data: &[u8], sig: &[u8], algorithm: SignatureAlgorithm) -> bool {
    let verification_alg: &dyn signature::VerificationAlgorithm = match algorithm {
        SignatureAlgorithm::RsaSha256 => &RSA_PKCS1_2048_8192_SHA256,
        SignatureAlgorithm::RsaSha384 => &RSA_PKCS1_2048_8192_SHA384,
        SignatureAlgorithm::RsaSha512 => &RSA_PKCS1_2048_8192_SHA512,
    };

    UnparsedPublicKey::new(verification_alg, public_key)
        .verify(data, sig)
        .is_ok()
}

/// Detached signature parameters taken from a Redirect binding query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectSignature {
    /// The octets that were signed, exactly as they appeared on the wire.
    pub signed_content: String,
    /// The decoded `SigAlg` parameter.
    pub sig_alg: String,
    /// The decoded, still base64 encoded, `Signature` parameter.
    pub signature: String,
}

/// Extracts the signed portion of a Redirect binding query string.
///
/// The parameters are kept in their original URL encoding because the
/// signature covers the encoded form.
#[must_use]
pub fn extract_redirect_signature(query: &str) -> Option<RedirectSignature> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut message = None;
    let mut relay_state = None;
    let mut sig_alg = None;
    let mut signature = None;

    for pair in query.split('&') {
        let Some((key, _)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "SAMLRequest" | "SAMLResponse" => message = Some(pair),
            "RelayState" => relay_state = Some(pair),
            "SigAlg" => sig_alg = Some(pair),
            "Signature" => signature = Some(pair),
            _ => {}
        }
    }

    let (message, sig_alg_pair, signature_pair) = (message?, sig_alg?, signature?);
    let mut signed_content = message.to_string();
    if let Some(relay_state) = relay_state {
        signed_content.push('&');
        signed_content.push_str(relay_state);
    }
    signed_content.push('&');
    signed_content.push_str(sig_alg_pair);

    let decode = |pair: &str| -> Option<String> {
        let (_, value) = pair.split_once('=')?;
        urlencoding::decode(value).ok().map(|v| v.into_owned())
    };

    Some(RedirectSignature {
        signed_content,
        sig_alg: decode(sig_alg_pair)?,
        signature: decode(signature_pair)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_signed_content_in_wire_order() {
        let query = "SAMLRequest=abc%2B&RelayState=xyz&SigAlg=http%3A%2F%2Fexample%2Falg&Signature=c2ln%3D";
        let extracted = extract_redirect_signature(query).unwrap();

        assert_eq!(
            extracted.signed_content,
            "SAMLRequest=abc%2B&RelayState=xyz&SigAlg=http%3A%2F%2Fexample%2Falg"
        );
        assert_eq!(extracted.sig_alg, "http://example/alg");
        assert_eq!(extracted.signature, "c2ln=");
    }

    #[test]
    fn unsigned_query_has_no_signature() {
        assert!(extract_redirect_signature("SAMLRequest=abc&RelayState=xyz").is_none());
    }

    #[test]
    fn garbage_public_key_does_not_verify() {
        assert!(!verify_data(b"not a key", b"data", b"sig", SignatureAlgorithm::RsaSha256));
    }
}
