//! PEM and base64 helpers for key material.

use base64::Engine;

use crate::error::{SpError, SpResult};

/// Extracts the DER payload of every PEM block carrying `label`.
///
/// Blocks appear in the order they occur in the input.
pub fn pem_blocks(pem: &str, label: &str) -> SpResult<Vec<Vec<u8>>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let mut blocks = Vec::new();
    let mut rest = pem;
    while let Some(start) = rest.find(&begin) {
        let body = &rest[start + begin.len()..];
        let end_pos = body
            .find(&end)
            .ok_or_else(|| SpError::InvalidCredential(format!("unterminated PEM block {label}")))?;
        blocks.push(decode_base64(&body[..end_pos])?);
        rest = &body[end_pos + end.len()..];
    }
    Ok(blocks)
}

/// Extracts the first PEM block carrying `label`.
pub fn pem_to_der(pem: &str, label: &str) -> SpResult<Vec<u8>> {
    pem_blocks(pem, label)?
        .into_iter()
        .next()
        .ok_or_else(|| SpError::InvalidCredential(format!("no {label} PEM block found")))
}

/// Decodes a certificate given either as PEM or as bare base64 DER.
///
/// Metadata documents carry `ds:X509Certificate` values without PEM armor,
/// often wrapped across lines.
pub fn certificate_der(value: &str) -> SpResult<Vec<u8>> {
    if value.contains("-----BEGIN") {
        pem_to_der(value, "CERTIFICATE")
    } else {
        decode_base64(value)
    }
}

fn decode_base64(data: &str) -> SpResult<Vec<u8>> {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| SpError::InvalidCredential(format!("invalid base64 key material: {e}")))
}
