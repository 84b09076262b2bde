//! Authenticated message encryption
//!
//! Uses AES-256-GCM. Key size: 32 bytes. Nonce: 12 bytes (random, fresh per
//! call). Tag: 16 bytes.
//!
//! Ciphertext and nonce are carried as separate fields because the document
//! store wire format keeps them apart (`ct` / `iv`); see `pv_proto`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};

use crate::error::CryptoError;
use crate::keyring::ConversationKey;

/// AES-GCM nonce length in bytes, fixed by the protocol.
pub const NONCE_LEN: usize = 12;

/// One encryption result: ciphertext plus the nonce it was sealed under.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
}

/// Encrypt `plaintext` under the conversation key with a fresh random nonce.
///
/// The nonce is drawn from the OS CSPRNG on every call; it is never derived
/// from counters or timestamps, so reuse under one key cannot occur.
pub fn encrypt(key: &ConversationKey, plaintext: &[u8]) -> Result<Sealed, CryptoError> {
    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::EncryptFailed)?;

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::EncryptFailed)?;

    Ok(Sealed { ciphertext, nonce })
}

/// Decrypt and verify. All-or-nothing: any failure (tampering, wrong key,
/// truncated data, bad nonce length) is `DecryptFailed` and no partial
/// plaintext is ever produced.
pub fn decrypt(
    key: &ConversationKey,
    nonce: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::DecryptFailed);
    }
    let cipher =
        Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::DecryptFailed)?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptFailed)
}
