//! Binary-to-text transcoding.
//!
//! The document store is text-oriented, so every binary value (public keys,
//! wrapped keys, ciphertexts, nonces) travels as base64url without padding.
//! Round-trips are exact for arbitrary byte sequences.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::error::CryptoError;

/// Encode bytes for storage in a text field.
pub fn to_text(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a text field back to bytes.
pub fn from_text(text: &str) -> Result<Vec<u8>, CryptoError> {
    Ok(URL_SAFE_NO_PAD.decode(text)?)
}
