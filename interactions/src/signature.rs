//! Ed25519 request signatures.
//!
//! Discord signs `timestamp || body` with the application's key and sends
//! the hex signature and the timestamp in headers.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::InteractionError;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Parse the application public key from its hex form.
pub fn parse_public_key(hex_key: &str) -> Result<VerifyingKey, InteractionError> {
    let bytes: [u8; 32] = hex::decode(hex_key.trim())
        .map_err(|e| InteractionError::InvalidPublicKey(e.to_string()))?
        .try_into()
        .map_err(|v: Vec<u8>| {
            InteractionError::InvalidPublicKey(format!("{} bytes, expected 32", v.len()))
        })?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| InteractionError::InvalidPublicKey(e.to_string()))
}

pub fn verify_request(
    key: &VerifyingKey,
    signature_hex: &str,
    timestamp: &str,
    body: &[u8],
) -> Result<(), InteractionError> {
    let bytes: [u8; 64] = hex::decode(signature_hex)
        .ok()
        .and_then(|v| v.try_into().ok())
        .ok_or(InteractionError::BadSignature)?;
    let signature = Signature::from_bytes(&bytes);

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);
    key.verify(&message, &signature)
        .map_err(|_| InteractionError::BadSignature)
}
