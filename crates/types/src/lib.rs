//! Core types for the attestation reactor.
//!
//! This crate provides the foundational types used throughout the reactor:
//!
//! - **Primitives**: message hashes, cryptographic keys and signatures
//! - **Identifiers**: OracleId, Nonce, VoteSetId, PeerId
//! - **Consensus types**: ValidatorSet, VoteSet, ProposalInfo
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer.

mod crypto;
mod hash;
mod payload;
mod proposal;
mod validator;
mod vote_set;

pub use crypto::{Keypair, PublicKey, Signature, ValidatorSigner};
pub use hash::MessageHash;
pub use payload::{ExecutionRequest, ExecutionResponse, IndividualExecution, VotePayload};
pub use proposal::ProposalInfo;
pub use validator::{
    Address, ChainStateSource, ChainValidators, StaticValidators, ValidatorInfo, ValidatorSet,
    ValidatorSource,
};
pub use vote_set::{OracleDirectory, VoteSet, VoteSetError, VoteSetValidation, VoteType};

use sbor::prelude::BasicSbor;

/// Identifier of one registered oracle callback, unique within a registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
pub struct OracleId(pub String);

impl OracleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OracleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-oracle sequence number preventing replay of old vote sets.
///
/// Starts at 1 and increments by exactly one per successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
pub struct Nonce(pub i64);

impl Nonce {
    /// The nonce of the first proposal for any oracle.
    pub const STARTING: Nonce = Nonce(1);

    pub fn next(self) -> Nonce {
        Nonce(self.0 + 1)
    }

    pub fn previous(self) -> Nonce {
        Nonce(self.0 - 1)
    }
}

impl std::fmt::Display for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of random bytes in a vote set identifier.
pub const VOTE_SET_ID_SIZE: usize = 32;

/// Identifier of one vote set: 32 random bytes, hex encoded.
///
/// Chosen by the proposer; used as the merge key when two nodes hold vote
/// sets for the same oracle at the same nonce.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
pub struct VoteSetId(pub String);

impl VoteSetId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; VOTE_SET_ID_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VoteSetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque transport-level peer identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Convergence threshold for a vote set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BasicSbor)]
pub enum SigningThreshold {
    /// Strictly greater than two thirds of total voting power.
    Maj23,
    /// All of the voting power.
    All,
}

impl SigningThreshold {
    /// Whether `covered` voting power satisfies this threshold out of `total`.
    pub fn is_met(self, covered: i64, total: i64) -> bool {
        match self {
            // Strict: exactly 2/3 does not converge.
            SigningThreshold::Maj23 => covered * 3 > total * 2,
            SigningThreshold::All => covered == total,
        }
    }
}

impl std::str::FromStr for SigningThreshold {
    type Err = UnknownThreshold;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Maj23" => Ok(SigningThreshold::Maj23),
            "All" => Ok(SigningThreshold::All),
            other => Err(UnknownThreshold(other.to_string())),
        }
    }
}

impl std::fmt::Display for SigningThreshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningThreshold::Maj23 => f.write_str("Maj23"),
            SigningThreshold::All => f.write_str("All"),
        }
    }
}

/// A signing threshold name that is neither `Maj23` nor `All`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signing threshold {0:?}, expected \"Maj23\" or \"All\"")]
pub struct UnknownThreshold(pub String);
