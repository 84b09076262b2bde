//! pv_client — chat-side flows of the Palaver E2EE core
//!
//! Everything the hosted backend does (auth, realtime, push, the document
//! database itself) sits behind the traits in `backend`; this crate owns the
//! decisions that make the system end-to-end encrypted:
//!
//! - `identity`     — ensure-on-first-use keypair, directory publish, peer import
//! - `conversation` — keyring assembly at creation, single-point key
//!                    resolution at open, encrypt/plaintext branching
//! - `keycache`     — process-lifetime cache of unwrapped conversation keys
//! - `backend`      — directory + document-store seams, in-memory backend
//! - `config`       — client tunables

pub mod backend;
pub mod config;
pub mod conversation;
pub mod error;
pub mod identity;
pub mod keycache;

pub use backend::{BackendError, Directory, DocumentStore, MemoryBackend};
pub use config::ClientConfig;
pub use conversation::{ChatClient, OpenConversation};
pub use error::ClientError;
