//! Conversation lifecycle.
//!
//! Creation generates one fresh conversation key and wraps it for every
//! member with a published public key; opening resolves the caller's copy
//! exactly once and all downstream encrypt/plaintext branching keys off
//! that single result.

use std::sync::Arc;

use chrono::Utc;

use pv_crypto::encoding;
use pv_crypto::identity::{IdentityKeyPair, PublicKey};
use pv_crypto::keyring::{self, ConversationKey};
use pv_crypto::CryptoError;
use pv_proto::conversation::{ConversationRecord, Keyring};
use pv_proto::message::{DeliveryState, Envelope, MessageBody, MessageRecord};
use pv_store::KeyStore;

use crate::backend::{Directory, DocumentStore};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::identity;
use crate::keycache::KeyCache;

/// Placeholder rendered when an envelope fails authentication.
pub const DECRYPT_FAILED_PLACEHOLDER: &str = "[unable to decrypt]";

/// Label rendered for encrypted history when no conversation key is held.
pub const ENCRYPTED_PLACEHOLDER: &str = "[encrypted]";

/// A keyring below this many entries is useless: with a single reader the
/// other side of the conversation could never decrypt anything, so the
/// conversation is stored keyless and everyone falls back to plaintext.
const MIN_KEYRING_ENTRIES: usize = 2;

/// One signed-in user's view of the system.
pub struct ChatClient {
    user_id: String,
    identity: IdentityKeyPair,
    directory: Arc<dyn Directory>,
    documents: Arc<dyn DocumentStore>,
    keys: KeyCache,
    config: ClientConfig,
}

impl ChatClient {
    /// Load (or create) the device identity, publish it to the directory,
    /// and return a ready client.
    pub async fn sign_in(
        user_id: impl Into<String>,
        display_name: &str,
        key_store: &dyn KeyStore,
        directory: Arc<dyn Directory>,
        documents: Arc<dyn DocumentStore>,
    ) -> Result<Self, ClientError> {
        let user_id = user_id.into();
        let identity = identity::ensure_identity(key_store).await?;
        identity::publish_identity(directory.as_ref(), &user_id, display_name, &identity).await?;
        Ok(Self {
            user_id,
            identity,
            directory,
            documents,
            keys: KeyCache::new(),
            config: ClientConfig::default(),
        })
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.identity.public
    }

    /// Create a conversation. The caller is always a member; duplicates in
    /// `member_ids` are dropped. Members without a published key stay in the
    /// member list but get no keyring entry and cannot decrypt history until
    /// the conversation is re-keyed (re-keying is out of scope).
    pub async fn create_conversation(
        &self,
        member_ids: &[&str],
        name: Option<&str>,
    ) -> Result<ConversationRecord, ClientError> {
        let mut members: Vec<String> = Vec::with_capacity(member_ids.len() + 1);
        for id in std::iter::once(self.user_id.as_str()).chain(member_ids.iter().copied()) {
            if !members.iter().any(|m| m == id) {
                members.push(id.to_string());
            }
        }

        let key = ConversationKey::generate();
        let keyring = self.build_keyring(&members, &key).await?;

        let conversation =
            ConversationRecord::new(members, name.map(str::to_string), keyring);
        self.documents.put_conversation(conversation.clone()).await?;
        tracing::info!(
            conversation_id = %conversation.id,
            members = conversation.members.len(),
            keyed = conversation.keyring.len(),
            "conversation created"
        );
        Ok(conversation)
    }

    /// Reuse the existing two-party conversation with `peer_id`, creating
    /// one if none exists.
    pub async fn find_or_create_direct(
        &self,
        peer_id: &str,
    ) -> Result<ConversationRecord, ClientError> {
        let existing = self.documents.conversations_for(&self.user_id).await?;
        if let Some(found) = existing
            .into_iter()
            .find(|c| c.is_direct_with(&self.user_id, peer_id))
        {
            return Ok(found);
        }
        self.create_conversation(&[peer_id], None).await
    }

    /// Open a conversation: fetch the record and resolve the conversation
    /// key once. `key` stays `None` when this user has no keyring entry
    /// (plaintext mode); an entry that fails to unwrap surfaces as an error
    /// and the conversation is treated as unreadable, not retried.
    pub async fn open_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<OpenConversation, ClientError> {
        let record = self
            .documents
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| ClientError::ConversationNotFound(conversation_id.to_string()))?;

        let key = self.resolve_conversation_key(&record).await?;

        Ok(OpenConversation {
            user_id: self.user_id.clone(),
            documents: Arc::clone(&self.documents),
            config: self.config.clone(),
            record,
            key,
        })
    }

    /// The single degraded-mode decision point: consult the session cache,
    /// else unwrap this user's keyring entry. Successful keys are cached for
    /// the rest of the session.
    async fn resolve_conversation_key(
        &self,
        record: &ConversationRecord,
    ) -> Result<Option<ConversationKey>, ClientError> {
        if let Some(key) = self.keys.get(&record.id).await {
            return Ok(Some(key));
        }

        let wrapped_text = match record.wrapped_key_for(&self.user_id) {
            Some(wrapped) => wrapped,
            None => return Ok(None),
        };

        let wrapped =
            encoding::from_text(wrapped_text).map_err(|_| CryptoError::KeyUnwrapFailed)?;
        let key = keyring::unwrap_key(&self.identity, &wrapped)?;
        self.keys.insert(&record.id, key.clone()).await;
        Ok(Some(key))
    }

    async fn build_keyring(
        &self,
        members: &[String],
        key: &ConversationKey,
    ) -> Result<Keyring, ClientError> {
        let mut ring = Keyring::new();
        for member in members {
            let record = match self.directory.get(member).await? {
                Some(record) => record,
                None => {
                    tracing::warn!(
                        user_id = %member,
                        "member has no published key; excluded from keyring"
                    );
                    continue;
                }
            };
            let public = match identity::import_peer_public_key(&record) {
                Ok(public) => public,
                Err(err) => {
                    tracing::warn!(
                        user_id = %member,
                        error = %err,
                        "member key record unusable; excluded from keyring"
                    );
                    continue;
                }
            };
            let wrapped = keyring::wrap_key(&public, key)?;
            ring.insert(member.clone(), encoding::to_text(&wrapped));
        }

        if ring.len() < MIN_KEYRING_ENTRIES {
            tracing::warn!(
                keyed = ring.len(),
                "not enough published keys to share a conversation key; \
                 conversation will carry plaintext"
            );
            return Ok(Keyring::new());
        }
        Ok(ring)
    }
}

/// A conversation opened by one user, with the plaintext-or-encrypted
/// decision already made for the whole view.
pub struct OpenConversation {
    user_id: String,
    documents: Arc<dyn DocumentStore>,
    config: ClientConfig,
    record: ConversationRecord,
    key: Option<ConversationKey>,
}

impl OpenConversation {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn record(&self) -> &ConversationRecord {
        &self.record
    }

    /// Whether messages in this view are sealed under a conversation key.
    pub fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }

    /// Send a text message: sealed when the conversation key resolved,
    /// plaintext otherwise. The decision is conversation-level, never per
    /// message.
    pub async fn send_text(&self, text: &str) -> Result<MessageRecord, ClientError> {
        let body = match &self.key {
            Some(key) => MessageBody::Encrypted {
                enc: Envelope::seal(key, text)?,
            },
            None => MessageBody::Plaintext {
                text: text.to_string(),
            },
        };
        let message = MessageRecord::new(&self.user_id, body);
        self.documents
            .append_message(&self.record.id, message.clone())
            .await?;
        self.touch_preview(text).await?;
        Ok(message)
    }

    /// Fetch the conversation's messages, oldest first.
    pub async fn messages(&self) -> Result<Vec<MessageRecord>, ClientError> {
        Ok(self
            .documents
            .list_messages(&self.record.id, self.config.history_limit)
            .await?)
    }

    /// Render one message as display text. Decryption is all-or-nothing: a
    /// failed tag yields the placeholder, never partial output, and the
    /// message stream continues.
    pub fn render(&self, message: &MessageRecord) -> String {
        match (&message.body, &self.key) {
            (MessageBody::Plaintext { text }, _) => text.clone(),
            (MessageBody::Encrypted { enc }, Some(key)) => match enc.open(key) {
                Ok(text) => text,
                Err(_) => {
                    tracing::warn!(
                        message_id = %message.id,
                        "message failed authentication"
                    );
                    DECRYPT_FAILED_PLACEHOLDER.to_string()
                }
            },
            (MessageBody::Encrypted { .. }, None) => ENCRYPTED_PLACEHOLDER.to_string(),
        }
    }

    /// Mark peers' messages delivered, then read, and clear the own unread
    /// counter. Runs whenever a conversation view is active.
    pub async fn mark_delivered_and_read(&self) -> Result<(), ClientError> {
        let messages = self.messages().await?;
        for message in &messages {
            if message.from == self.user_id || message.status == DeliveryState::Read {
                continue;
            }
            if message.status == DeliveryState::Sent {
                self.documents
                    .set_message_status(&self.record.id, &message.id, DeliveryState::Delivered)
                    .await?;
            }
            self.documents
                .set_message_status(&self.record.id, &message.id, DeliveryState::Read)
                .await?;
        }

        if let Some(mut record) = self.documents.get_conversation(&self.record.id).await? {
            record.unread.insert(self.user_id.clone(), 0);
            self.documents.put_conversation(record).await?;
        }
        Ok(())
    }

    /// Conversation-list preview fields. UI-owned and outside the encryption
    /// boundary: `last_message` carries the plaintext label even for
    /// encrypted conversations.
    async fn touch_preview(&self, text: &str) -> Result<(), ClientError> {
        if let Some(mut record) = self.documents.get_conversation(&self.record.id).await? {
            record.last_message = Some(text.to_string());
            record.updated_at = Utc::now();
            record.unread.insert(self.user_id.clone(), 0);
            self.documents.put_conversation(record).await?;
        }
        Ok(())
    }
}
