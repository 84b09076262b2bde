use thiserror::Error;

use pv_crypto::CryptoError;
use pv_store::StoreError;

use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The stored identity exists but cannot be decoded. Fatal for the local
    /// identity: regenerating would orphan every conversation this identity
    /// has joined, so nothing is sent or decrypted until the user resolves it.
    #[error("Key store is corrupt: {0}")]
    KeyStoreCorrupt(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Key store error: {0}")]
    Store(#[from] StoreError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
}
