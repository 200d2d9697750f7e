//! Raw signature creation with a PKCS#8 private key.

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{self, RsaKeyPair},
};

use crate::error::{SpError, SpResult};

use super::SignatureAlgorithm;

/// Signs `data` with an RSA private key in PKCS#8 DER form.
pub fn sign_data(private_key_der: &[u8], data: &[u8], algorithm: SignatureAlgorithm) -> SpResult<Vec<u8>> {
    let key_pair = RsaKeyPair::from_pkcs8(private_key_der)
        .or_else(|_| RsaKeyPair::from_der(private_key_der))
        .map_err(|e| SpError::InvalidCredential(format!("invalid RSA key: {e}")))?;

    let padding = match algorithm {
        SignatureAlgorithm::RsaSha256 => &signature::RSA_PKCS1_SHA256,
        SignatureAlgorithm::RsaSha384 => &signature::RSA_PKCS1_SHA384,
        SignatureAlgorithm::RsaSha512 => &signature::RSA_PKCS1_SHA512,
    };

    let rng = SystemRandom::new();
    let mut sig = vec![0u8; key_pair.public_modulus_len()];
    key_pair
        .sign(padding, &rng, data, &mut sig)
        .map_err(|e| SpError::SignatureCreation(format!("RSA signing failed: {e}")))?;

    Ok(sig)
}
