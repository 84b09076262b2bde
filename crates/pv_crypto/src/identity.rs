//! Identity key management
//!
//! Each user has one long-term X25519 keypair. The public half is published
//! to the user directory; the secret half is persisted on the device and
//! never leaves it. Parameters (curve, key length) are protocol constants:
//! a peer record with any other shape is a hard incompatibility, never
//! negotiated down.

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::ZeroizeOnDrop;

use crate::encoding;
use crate::error::CryptoError;

/// X25519 key length in bytes, fixed for the lifetime of the protocol.
pub const KEY_LEN: usize = 32;

// ── Public key ────────────────────────────────────────────────────────────────

/// 32-byte X25519 public key, transport-encoded on the wire.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; KEY_LEN]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub fn to_text(&self) -> String {
        encoding::to_text(&self.0)
    }

    /// Parse a transport-encoded public key. Wrong length or a non-decodable
    /// string means the record was produced with incompatible parameters.
    pub fn from_text(text: &str) -> Result<Self, CryptoError> {
        let bytes = encoding::from_text(text)
            .map_err(|e| CryptoError::InvalidKeyMaterial(e.to_string()))?;
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            CryptoError::InvalidKeyMaterial(format!(
                "Public key must be {KEY_LEN} bytes, got {}",
                b.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Human-readable fingerprint: BLAKE3 of the public key, truncated to
    /// 20 bytes (160 bits), hex-encoded in groups of 4 for display.
    ///
    /// Example: "a1b2 c3d4 e5f6 7890 abcd ef01 2345 6789 0abc def0"
    pub fn fingerprint(&self) -> String {
        let hash = blake3::hash(&self.0);
        let hex = hex::encode(&hash.as_bytes()[..20]);
        hex.chars()
            .collect::<Vec<_>>()
            .chunks(4)
            .map(|c| c.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub(crate) fn to_x25519(&self) -> X25519Public {
        X25519Public::from(self.0)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0[..8]))
    }
}

// ── Identity keypair ──────────────────────────────────────────────────────────

/// Long-term identity keypair. Drop clears the secret via ZeroizeOnDrop.
#[derive(ZeroizeOnDrop)]
pub struct IdentityKeyPair {
    #[zeroize(skip)]
    pub public: PublicKey,
    secret_bytes: [u8; KEY_LEN],
}

impl IdentityKeyPair {
    /// Generate a fresh keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519Public::from(&secret);
        Self {
            public: PublicKey(*public.as_bytes()),
            secret_bytes: secret.to_bytes(),
        }
    }

    /// Rebuild a keypair from its stored secret half. The public half is
    /// re-derived, so a stored pair cannot drift out of sync.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyMaterial(format!(
                "Identity key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; KEY_LEN];
        arr.copy_from_slice(bytes);
        let secret = StaticSecret::from(arr);
        let public = X25519Public::from(&secret);
        Ok(Self {
            public: PublicKey(*public.as_bytes()),
            secret_bytes: arr,
        })
    }

    pub fn secret_bytes(&self) -> &[u8; KEY_LEN] {
        &self.secret_bytes
    }

    pub(crate) fn to_x25519(&self) -> StaticSecret {
        StaticSecret::from(self.secret_bytes)
    }

    /// Export the public key in directory-publishable form.
    pub fn public_text(&self) -> String {
        self.public.to_text()
    }
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
