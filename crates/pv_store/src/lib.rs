//! pv_store — device-scoped persistence for Palaver key material
//!
//! Holds exactly one thing: the local user's serialized identity keypair,
//! under a fixed slot in a small key-value table. Not synchronized across
//! devices. The `KeyStore` trait is injected into the identity manager so
//! tests substitute the in-memory implementation.

pub mod db;
pub mod error;
pub mod keystore;

pub use db::SqliteKeyStore;
pub use error::StoreError;
pub use keystore::{KeyStore, MemoryKeyStore, StoredIdentity};
