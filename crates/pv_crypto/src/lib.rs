//! pv_crypto — Palaver cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - All public APIs return opaque newtypes to prevent accidental misuse.
//!
//! # Module layout
//! - `identity` — long-term X25519 identity keypair + public-key newtype
//! - `keyring`  — conversation key generation and per-member wrap/unwrap
//! - `aead`     — AES-256-GCM message encrypt/decrypt helpers
//! - `encoding` — binary-to-text transcoding for the document store
//! - `error`    — unified error type

pub mod aead;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod keyring;

pub use error::CryptoError;
