//! Published key records in the user directory.

use serde::{Deserialize, Serialize};

/// What a user publishes about themselves: the serialized public key plus a
/// display name. Readable by anyone; writable only by the owning identity
/// (enforced by the hosting backend, not here).
///
/// Wire shape: `{"pub": "<key>", "name": "<display name>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRecord {
    #[serde(rename = "pub")]
    pub public_key: String,
    pub name: String,
}
