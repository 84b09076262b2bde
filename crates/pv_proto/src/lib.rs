//! pv_proto — Palaver document-store record types
//!
//! The hosted backend is a text-oriented document store; these types define
//! exactly what it sees. Binary values are transport-encoded via
//! `pv_crypto::encoding` before they land in any field.
//!
//! - `directory`    — published public-key records
//! - `conversation` — conversation documents (members, keyring, previews)
//! - `message`      — message documents, envelope, delivery states

pub mod conversation;
pub mod directory;
pub mod message;
