//! Message documents and the encrypted envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pv_crypto::{aead, encoding, keyring::ConversationKey, CryptoError};

/// Authenticated-encryption envelope: ciphertext plus nonce, both
/// transport-encoded. Immutable once written.
///
/// Wire shape: `{"ct": "...", "iv": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub ct: String,
    pub iv: String,
}

impl Envelope {
    /// Encrypt one message text under the conversation key. A fresh random
    /// nonce is drawn inside the cipher call on every invocation.
    pub fn seal(key: &ConversationKey, text: &str) -> Result<Self, CryptoError> {
        let sealed = aead::encrypt(key, text.as_bytes())?;
        Ok(Self {
            ct: encoding::to_text(&sealed.ciphertext),
            iv: encoding::to_text(&sealed.nonce),
        })
    }

    /// Decrypt and verify. All-or-nothing: undecodable fields, a failed
    /// authentication tag, or non-UTF-8 plaintext are all `DecryptFailed`.
    pub fn open(&self, key: &ConversationKey) -> Result<String, CryptoError> {
        let ciphertext = encoding::from_text(&self.ct).map_err(|_| CryptoError::DecryptFailed)?;
        let nonce = encoding::from_text(&self.iv).map_err(|_| CryptoError::DecryptFailed)?;
        let plaintext = aead::decrypt(key, &nonce, &ciphertext)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptFailed)
    }
}

/// Message body as persisted. The store shape is duck-typed (a `text` field
/// for plaintext, an `enc` field for encrypted); in memory it is a tagged
/// variant, resolved only at the serde boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageBody {
    Encrypted { enc: Envelope },
    Plaintext { text: String },
}

/// Delivery status, advanced by recipients: sent, then delivered once a
/// recipient's client has seen it, then read once the view is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Sent,
    Delivered,
    Read,
}

/// One message document in a conversation's ordered sub-collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub from: String,
    pub status: DeliveryState,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl MessageRecord {
    pub fn new(from: &str, body: MessageBody) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from: from.to_string(),
            status: DeliveryState::Sent,
            created_at: Utc::now(),
            body,
        }
    }
}
