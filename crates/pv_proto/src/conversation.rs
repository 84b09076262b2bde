//! Conversation documents.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-conversation key distribution: member id to that member's wrapped
/// copy of the conversation key (transport text). A member with no entry
/// cannot decrypt and reads/writes plaintext; entries are never backfilled.
pub type Keyring = BTreeMap<String, String>;

/// One conversation document. `members` and `keyring` are the core fields;
/// name, previews, unread counters and timestamps are owned by the UI layer
/// and carried opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub is_group: bool,
    pub members: Vec<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub keyring: Keyring,
    #[serde(default)]
    pub unread: BTreeMap<String, u32>,
    #[serde(default)]
    pub last_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(members: Vec<String>, name: Option<String>, keyring: Keyring) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            is_group: members.len() > 2,
            members,
            name,
            keyring,
            unread: BTreeMap::new(),
            last_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// This user's wrapped key, if the keyring holds one.
    pub fn wrapped_key_for(&self, user_id: &str) -> Option<&str> {
        self.keyring.get(user_id).map(String::as_str)
    }

    /// True for the two-party non-group conversation between `a` and `b`.
    pub fn is_direct_with(&self, a: &str, b: &str) -> bool {
        !self.is_group
            && self.members.len() == 2
            && self.members.iter().any(|m| m == a)
            && self.members.iter().any(|m| m == b)
    }
}
