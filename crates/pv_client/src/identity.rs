//! Identity keypair lifecycle.
//!
//! `ensure_identity` is the only producer of key material: it either loads
//! the device keypair or generates one on first use. A stored record that
//! fails to decode is a hard `KeyStoreCorrupt` error; silently regenerating
//! would orphan every conversation this identity previously joined.

use pv_crypto::encoding;
use pv_crypto::identity::{IdentityKeyPair, PublicKey};
use pv_crypto::CryptoError;
use pv_proto::directory::PublicKeyRecord;
use pv_store::{KeyStore, StoreError, StoredIdentity};

use crate::backend::Directory;
use crate::error::ClientError;

/// Stored record layout version. Bumped only on incompatible changes, which
/// would need an explicit migration, not silent regeneration.
const STORED_IDENTITY_VERSION: u8 = 1;

/// Load the device identity, generating and persisting one on first use.
pub async fn ensure_identity(store: &dyn KeyStore) -> Result<IdentityKeyPair, ClientError> {
    match store.load().await {
        Ok(Some(stored)) => decode_stored(&stored),
        Ok(None) => {
            let pair = IdentityKeyPair::generate();
            store
                .save(&StoredIdentity {
                    version: STORED_IDENTITY_VERSION,
                    public_key: pair.public_text(),
                    secret_key: encoding::to_text(pair.secret_bytes()),
                })
                .await?;
            tracing::info!(
                fingerprint = %pair.public.fingerprint(),
                "generated new identity keypair"
            );
            Ok(pair)
        }
        Err(StoreError::Corrupt(msg)) => Err(ClientError::KeyStoreCorrupt(msg)),
        Err(e) => Err(ClientError::Store(e)),
    }
}

fn decode_stored(stored: &StoredIdentity) -> Result<IdentityKeyPair, ClientError> {
    if stored.version != STORED_IDENTITY_VERSION {
        return Err(ClientError::KeyStoreCorrupt(format!(
            "unsupported stored identity version {}",
            stored.version
        )));
    }
    let secret = encoding::from_text(&stored.secret_key)
        .map_err(|e| ClientError::KeyStoreCorrupt(e.to_string()))?;
    let pair = IdentityKeyPair::from_bytes(&secret)
        .map_err(|e| ClientError::KeyStoreCorrupt(e.to_string()))?;
    // The public half is re-derived from the secret; a mismatch with the
    // stored copy means the record was mangled, not merely re-encoded.
    if pair.public_text() != stored.public_key {
        return Err(ClientError::KeyStoreCorrupt(
            "stored public key does not match secret key".into(),
        ));
    }
    Ok(pair)
}

/// Publish the public half (plus display name) to the directory. Idempotent,
/// runs on every sign-in.
pub async fn publish_identity(
    directory: &dyn Directory,
    user_id: &str,
    display_name: &str,
    identity: &IdentityKeyPair,
) -> Result<(), ClientError> {
    directory
        .put(
            user_id,
            PublicKeyRecord {
                public_key: identity.public_text(),
                name: display_name.to_string(),
            },
        )
        .await?;
    tracing::debug!(user_id, "identity key published");
    Ok(())
}

/// Decode a peer's published record. `InvalidKeyMaterial` means "cannot
/// secure this peer yet"; it is recoverable, never fatal.
pub fn import_peer_public_key(record: &PublicKeyRecord) -> Result<PublicKey, CryptoError> {
    PublicKey::from_text(&record.public_key)
}
