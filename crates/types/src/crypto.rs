//! Validator keys and signatures.
//!
//! Vote-set slot signatures are Ed25519. Oracle signatures (produced by the
//! registered callbacks over their own messages) are opaque bytes and are
//! carried, not verified, by the reactor.

use crate::validator::Address;
use ed25519_dalek::{Signer as _, Verifier as _};
use sbor::prelude::BasicSbor;

/// Ed25519 public key of a validator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, BasicSbor)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Verify `signature` over `message`.
    ///
    /// Returns false for malformed keys or signatures as well as for honest
    /// mismatches; the caller only cares whether the bytes are good.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Ok(sig) = ed25519_dalek::Signature::from_slice(&signature.0) else {
            return false;
        };
        key.verify(message, &sig).is_ok()
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({}…)", hex::encode(&self.0[..8]))
    }
}

/// A signature, either an Ed25519 vote-set signature or opaque oracle bytes.
///
/// An empty signature marks an absent one (e.g. the oracle-signature slot of
/// a validator that has not agreed).
#[derive(Clone, PartialEq, Eq, Hash, BasicSbor)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Signature {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            f.write_str("Signature(empty)")
        } else {
            write!(f, "Signature({}…)", hex::encode(&self.0[..self.0.len().min(8)]))
        }
    }
}

/// The host chain's private-validator seam.
///
/// The reactor never holds key material directly; it signs vote-set slots
/// through this trait.
pub trait ValidatorSigner: Send + Sync {
    fn public_key(&self) -> PublicKey;
    fn address(&self) -> Address;
    fn sign(&self, bytes: &[u8]) -> Signature;
}

/// An in-process Ed25519 keypair implementing [`ValidatorSigner`].
#[derive(Clone)]
pub struct Keypair {
    signing: ed25519_dalek::SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing: ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// Derive a keypair from a 32-byte seed. Deterministic; test fixtures.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing: ed25519_dalek::SigningKey::from_bytes(&seed),
        }
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl ValidatorSigner for Keypair {
    fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key().to_bytes())
    }

    fn address(&self) -> Address {
        Address::from_public_key(&self.public_key())
    }

    fn sign(&self, bytes: &[u8]) -> Signature {
        Signature(self.signing.sign(bytes).to_bytes().to_vec())
    }
}
