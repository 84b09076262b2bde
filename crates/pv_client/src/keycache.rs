//! Process-lifetime cache of unwrapped conversation keys.
//!
//! Keys live only in memory, keyed by conversation id; the cache is rebuilt
//! on demand and never persisted. Each conversation's unwrap path is
//! independent, so no locking beyond the map's RwLock is needed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use pv_crypto::keyring::ConversationKey;

/// Thread-safe cache handle. Clone shares the same map.
#[derive(Clone, Default)]
pub struct KeyCache {
    inner: Arc<RwLock<HashMap<String, ConversationKey>>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, conversation_id: &str) -> Option<ConversationKey> {
        self.inner.read().await.get(conversation_id).cloned()
    }

    pub async fn insert(&self, conversation_id: &str, key: ConversationKey) {
        self.inner
            .write()
            .await
            .insert(conversation_id.to_string(), key);
    }
}
