//! Conversation key generation and per-member key wrapping
//!
//! One symmetric key is generated per conversation and wrapped once for each
//! member under that member's public key, so the key only ever exists at
//! rest in wrapped form.
//!
//! Wrap construction (protocol constants, never negotiated):
//!   1. Fresh ephemeral X25519 keypair per wrap
//!   2. KEK = HKDF-SHA256(ECDH(ephemeral, recipient), salt = ephemeral pub)
//!   3. AES-256-GCM seal of the raw conversation key under the KEK
//!
//! Wrapped blob wire format:
//!   [ ephemeral_pub (32) | nonce (12) | ciphertext + tag ]

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::NONCE_LEN;
use crate::error::CryptoError;
use crate::identity::{IdentityKeyPair, PublicKey, KEY_LEN};

/// Conversation key length in bytes (AES-256).
pub const CONVERSATION_KEY_LEN: usize = 32;

/// Domain separation for the wrap KEK derivation.
const WRAP_INFO: &[u8] = b"pv-keyring-wrap-v1";

// ── Conversation key ──────────────────────────────────────────────────────────

/// 32-byte symmetric conversation key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ConversationKey([u8; CONVERSATION_KEY_LEN]);

impl ConversationKey {
    /// Generate a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; CONVERSATION_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; CONVERSATION_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CONVERSATION_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

// ── Wrap / unwrap ─────────────────────────────────────────────────────────────

/// Wrap the conversation key for one recipient.
pub fn wrap_key(recipient: &PublicKey, key: &ConversationKey) -> Result<Vec<u8>, CryptoError> {
    let ephemeral = StaticSecret::random_from_rng(OsRng);
    let ephemeral_pub = X25519Public::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(&recipient.to_x25519());

    let mut kek = derive_wrap_kek(shared.as_bytes(), ephemeral_pub.as_bytes())?;
    let cipher = Aes256Gcm::new_from_slice(&kek).map_err(|_| CryptoError::EncryptFailed)?;
    kek.zeroize();

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), key.as_bytes().as_slice())
        .map_err(|_| CryptoError::EncryptFailed)?;

    let mut out = Vec::with_capacity(KEY_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(ephemeral_pub.as_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Unwrap a blob produced by [`wrap_key`] with the local identity key.
///
/// Any parse or authentication failure is `KeyUnwrapFailed`; callers treat
/// the conversation as unreadable and do not retry.
pub fn unwrap_key(
    identity: &IdentityKeyPair,
    blob: &[u8],
) -> Result<ConversationKey, CryptoError> {
    // Minimum: ephemeral pub + nonce + tag (empty key would still carry a tag).
    if blob.len() < KEY_LEN + NONCE_LEN + 16 {
        return Err(CryptoError::KeyUnwrapFailed);
    }
    let (eph_bytes, rest) = blob.split_at(KEY_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let eph_arr: [u8; KEY_LEN] = eph_bytes
        .try_into()
        .map_err(|_| CryptoError::KeyUnwrapFailed)?;
    let shared = identity
        .to_x25519()
        .diffie_hellman(&X25519Public::from(eph_arr));

    let mut kek = derive_wrap_kek(shared.as_bytes(), eph_bytes)?;
    let cipher = Aes256Gcm::new_from_slice(&kek).map_err(|_| CryptoError::KeyUnwrapFailed)?;
    kek.zeroize();

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::KeyUnwrapFailed)?;

    let arr: [u8; CONVERSATION_KEY_LEN] = plaintext
        .try_into()
        .map_err(|_| CryptoError::KeyUnwrapFailed)?;
    Ok(ConversationKey::from_bytes(arr))
}

fn derive_wrap_kek(shared: &[u8], ephemeral_pub: &[u8]) -> Result<[u8; 32], CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(ephemeral_pub), shared);
    let mut kek = [0u8; 32];
    hk.expand(WRAP_INFO, &mut kek)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(kek)
}
