//! Validator sets and the seams through which the host chain supplies them.

use crate::crypto::PublicKey;
use crate::hash::MessageHash;
use sbor::prelude::BasicSbor;
use std::sync::Arc;

/// Validator address bytes, as assigned by the host chain.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
pub struct Address(pub Vec<u8>);

impl Address {
    /// Derive an address from a public key: the first 20 bytes of the
    /// key's SHA-512 digest.
    pub fn from_public_key(key: &PublicKey) -> Self {
        let digest = MessageHash::digest(&key.0);
        Self(digest.as_bytes()[..20].to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", hex::encode(&self.0))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// One validator: address, key, and voting power.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct ValidatorInfo {
    pub address: Address,
    pub public_key: PublicKey,
    pub power: i64,
}

/// A totally ordered, indexable set of validators.
///
/// Ordering is canonical (ascending by address) so every node derives the
/// same indices, the same hash, and the same proposer rotation. Addresses
/// are unique within a set; the host chain guarantees this.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct ValidatorSet {
    validators: Vec<ValidatorInfo>,
}

impl ValidatorSet {
    pub fn new(mut validators: Vec<ValidatorInfo>) -> Self {
        validators.sort_by(|a, b| a.address.cmp(&b.address));
        debug_assert!(
            validators.windows(2).all(|w| w[0].address != w[1].address),
            "duplicate validator address"
        );
        Self { validators }
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn total_power(&self) -> i64 {
        self.validators.iter().map(|v| v.power).sum()
    }

    /// Index of the validator with `address`, if present.
    pub fn position_of(&self, address: &Address) -> Option<usize> {
        self.validators.iter().position(|v| &v.address == address)
    }

    pub fn by_index(&self, index: usize) -> Option<&ValidatorInfo> {
        self.validators.get(index)
    }

    pub fn by_address(&self, address: &Address) -> Option<&ValidatorInfo> {
        self.validators.iter().find(|v| &v.address == address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidatorInfo> {
        self.validators.iter()
    }

    /// Addresses in canonical order.
    pub fn addresses(&self) -> Vec<Address> {
        self.validators.iter().map(|v| v.address.clone()).collect()
    }

    /// Canonical hash of the set: SHA-512 over the deterministic encoding
    /// of the ordered entries.
    pub fn hash(&self) -> MessageHash {
        let encoded = sbor::basic_encode(&self.validators)
            .expect("validator set encoding cannot fail");
        MessageHash::digest(&encoded)
    }
}

/// Source of the signing validator set.
///
/// The reactor reads the set fresh at every decision point; implementations
/// decide whether that means a fixed override set or a live read of the
/// host chain's state.
pub trait ValidatorSource: Send + Sync {
    fn validator_set(&self) -> ValidatorSet;
}

/// A fixed validator set, used when an override set is configured.
pub struct StaticValidators(pub ValidatorSet);

impl ValidatorSource for StaticValidators {
    fn validator_set(&self) -> ValidatorSet {
        self.0.clone()
    }
}

/// The host chain's replicated-state seam: yields the chain's current
/// validator set, or `None` while the chain state is still empty.
pub trait ChainStateSource: Send + Sync {
    fn load_validators(&self) -> Option<ValidatorSet>;
}

/// [`ValidatorSource`] backed by a live [`ChainStateSource`].
///
/// Keeps the last non-empty set so a transient empty read (host chain
/// replaying) never yields an empty signing set mid-flight.
pub struct ChainValidators {
    chain: Arc<dyn ChainStateSource>,
    last_known: parking_lot::Mutex<ValidatorSet>,
}

impl ChainValidators {
    /// `initial` must be a non-empty set already read from the chain.
    pub fn new(chain: Arc<dyn ChainStateSource>, initial: ValidatorSet) -> Self {
        Self {
            chain,
            last_known: parking_lot::Mutex::new(initial),
        }
    }
}

impl ValidatorSource for ChainValidators {
    fn validator_set(&self) -> ValidatorSet {
        let mut last = self.last_known.lock();
        if let Some(set) = self.chain.load_validators() {
            *last = set;
        }
        last.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Keypair, ValidatorSigner};

    fn validator(seed: u8, power: i64) -> ValidatorInfo {
        let pair = Keypair::from_seed([seed; 32]);
        ValidatorInfo {
            address: pair.address(),
            public_key: pair.public_key(),
            power,
        }
    }

    #[test]
    fn ordering_is_canonical() {
        let a = ValidatorSet::new(vec![validator(1, 10), validator(2, 20), validator(3, 30)]);
        let b = ValidatorSet::new(vec![validator(3, 30), validator(1, 10), validator(2, 20)]);
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.total_power(), 60);
    }

    #[test]
    fn position_and_index_agree() {
        let set = ValidatorSet::new(vec![validator(1, 1), validator(2, 1), validator(3, 1)]);
        for i in 0..set.len() {
            let addr = &set.by_index(i).unwrap().address;
            assert_eq!(set.position_of(addr), Some(i));
        }
        assert_eq!(set.position_of(&Address(vec![0xAB; 20])), None);
    }

    #[test]
    fn hash_changes_with_membership_and_power() {
        let base = ValidatorSet::new(vec![validator(1, 10), validator(2, 20)]);
        let grown = ValidatorSet::new(vec![validator(1, 10), validator(2, 20), validator(3, 5)]);
        let repowered = ValidatorSet::new(vec![validator(1, 10), validator(2, 21)]);
        assert_ne!(base.hash(), grown.hash());
        assert_ne!(base.hash(), repowered.hash());
    }
}
