//! Local identity key storage.
//!
//! The keypair is created at most once per device and read idempotently
//! after that; there is no rotation or deletion path in this system.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StoreError;

/// Serialized identity keypair as persisted on the device.
///
/// Both halves are transport-encoded text; the secret half never leaves the
/// local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIdentity {
    pub version: u8,
    pub public_key: String,
    pub secret_key: String,
}

/// Where the device keypair lives. `load` returning `Ok(None)` means no
/// keypair has been generated yet; a record that cannot be decoded is a
/// `Corrupt` error, never silently discarded.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn load(&self) -> Result<Option<StoredIdentity>, StoreError>;
    async fn save(&self, identity: &StoredIdentity) -> Result<(), StoreError>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryKeyStore {
    inner: RwLock<Option<StoredIdentity>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn load(&self) -> Result<Option<StoredIdentity>, StoreError> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, identity: &StoredIdentity) -> Result<(), StoreError> {
        *self.inner.write().await = Some(identity.clone());
        Ok(())
    }
}
