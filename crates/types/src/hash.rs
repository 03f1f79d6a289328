//! Message hashing.

use sbor::prelude::BasicSbor;
use sha2::{Digest, Sha512};

/// SHA-512 digest of an attested message.
///
/// The reactor never interprets oracle messages; it binds votes and oracle
/// signatures to this digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
pub struct MessageHash(pub [u8; 64]);

impl MessageHash {
    pub const ZERO: MessageHash = MessageHash([0u8; 64]);

    /// Hash a message with SHA-512.
    pub fn digest(message: &[u8]) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(message);
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for MessageHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MessageHash({}…)", hex::encode(&self.0[..8]))
    }
}

impl std::fmt::Display for MessageHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
