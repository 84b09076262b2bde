//! External collaborator seams.
//!
//! The user directory and the conversation/message document store are owned
//! by the hosting backend. The core treats both as eventually-consistent
//! document services: reads may lag writes, conversation writes are
//! whole-record and last-writer-wins, and transport retries are the
//! collaborator's concern, not ours.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use pv_proto::conversation::ConversationRecord;
use pv_proto::directory::PublicKeyRecord;
use pv_proto::message::{DeliveryState, MessageRecord};

#[derive(Debug, Error)]
#[error("Backend error: {0}")]
pub struct BackendError(pub String);

/// User directory: user id to published key record.
#[async_trait]
pub trait Directory: Send + Sync {
    /// `Ok(None)` means the user has not published a key yet; callers must
    /// branch on it, it is never an error.
    async fn get(&self, user_id: &str) -> Result<Option<PublicKeyRecord>, BackendError>;

    /// Upsert the caller's own record.
    async fn put(&self, user_id: &str, record: PublicKeyRecord) -> Result<(), BackendError>;
}

/// Conversation documents plus each conversation's ordered message
/// sub-collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whole-record write keyed by `conversation.id`; last writer wins.
    async fn put_conversation(&self, conversation: ConversationRecord)
        -> Result<(), BackendError>;

    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationRecord>, BackendError>;

    /// All conversations whose member list contains `user_id`.
    async fn conversations_for(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationRecord>, BackendError>;

    async fn append_message(
        &self,
        conversation_id: &str,
        message: MessageRecord,
    ) -> Result<(), BackendError>;

    /// Oldest-first, capped at `limit`.
    async fn list_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, BackendError>;

    async fn set_message_status(
        &self,
        conversation_id: &str,
        message_id: &str,
        status: DeliveryState,
    ) -> Result<(), BackendError>;
}

// ── In-memory backend ─────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryInner {
    users: HashMap<String, PublicKeyRecord>,
    conversations: HashMap<String, ConversationRecord>,
    messages: HashMap<String, Vec<MessageRecord>>,
}

/// In-process implementation of both seams. Used by the test suite and by
/// embeddings that have no hosted backend. Clone shares the same state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Directory for MemoryBackend {
    async fn get(&self, user_id: &str) -> Result<Option<PublicKeyRecord>, BackendError> {
        Ok(self.inner.read().await.users.get(user_id).cloned())
    }

    async fn put(&self, user_id: &str, record: PublicKeyRecord) -> Result<(), BackendError> {
        self.inner
            .write()
            .await
            .users
            .insert(user_id.to_string(), record);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn put_conversation(
        &self,
        conversation: ConversationRecord,
    ) -> Result<(), BackendError> {
        self.inner
            .write()
            .await
            .conversations
            .insert(conversation.id.clone(), conversation);
        Ok(())
    }

    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationRecord>, BackendError> {
        Ok(self
            .inner
            .read()
            .await
            .conversations
            .get(conversation_id)
            .cloned())
    }

    async fn conversations_for(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationRecord>, BackendError> {
        Ok(self
            .inner
            .read()
            .await
            .conversations
            .values()
            .filter(|c| c.members.iter().any(|m| m == user_id))
            .cloned()
            .collect())
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        message: MessageRecord,
    ) -> Result<(), BackendError> {
        self.inner
            .write()
            .await
            .messages
            .entry(conversation_id.to_string())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, BackendError> {
        let inner = self.inner.read().await;
        let messages = inner
            .messages
            .get(conversation_id)
            .map(|m| m.iter().take(limit).cloned().collect())
            .unwrap_or_default();
        Ok(messages)
    }

    async fn set_message_status(
        &self,
        conversation_id: &str,
        message_id: &str,
        status: DeliveryState,
    ) -> Result<(), BackendError> {
        let mut inner = self.inner.write().await;
        if let Some(messages) = inner.messages.get_mut(conversation_id) {
            if let Some(message) = messages.iter_mut().find(|m| m.id == message_id) {
                message.status = status;
            }
        }
        Ok(())
    }
}
