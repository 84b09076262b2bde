//! SQLite-backed key storage via sqlx.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};

use crate::error::StoreError;
use crate::keystore::{KeyStore, StoredIdentity};

/// Fixed slot the identity keypair lives under (one identity per device).
const IDENTITY_SLOT: &str = "identity_keypair_v1";

/// Persistent key store backed by a local SQLite file. Cheap to clone
/// (pool is Arc internally).
#[derive(Clone)]
pub struct SqliteKeyStore {
    pool: SqlitePool,
}

impl SqliteKeyStore {
    /// Open (or create) the database at `db_path` and run pending
    /// migrations.
    ///
    /// WAL journal mode and foreign-key enforcement are configured at
    /// connection time here, not inside a migration, because SQLite forbids
    /// changing `journal_mode` inside a transaction and sqlx wraps every
    /// migration in one.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(opts).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl KeyStore for SqliteKeyStore {
    async fn load(&self) -> Result<Option<StoredIdentity>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM local_keys WHERE key = ?")
                .bind(IDENTITY_SLOT)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((json,)) => {
                let stored = serde_json::from_str(&json)
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?;
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, identity: &StoredIdentity) -> Result<(), StoreError> {
        let json = serde_json::to_string(identity)?;
        sqlx::query(
            "INSERT INTO local_keys (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
        )
        .bind(IDENTITY_SLOT)
        .bind(&json)
        .execute(&self.pool)
        .await?;

        tracing::debug!("identity keypair persisted");
        Ok(())
    }
}
