//! The aggregating vote structure: one vote set per in-flight attestation.
//!
//! A vote set is created by the proposer with its own Agree vote installed,
//! gossiped between peers, merged slot-by-slot, and retired by the commit
//! routine once its deadline passes. Every slot signature covers the whole
//! identity of the vote set plus the slot index and vote type, so a
//! signature cannot be replayed into a different vote set, slot, or vote.

use crate::crypto::{Signature, ValidatorSigner};
use crate::hash::MessageHash;
use crate::payload::{IndividualExecution, VotePayload};
use crate::proposal::ProposalInfo;
use crate::validator::{Address, ValidatorSet};
use crate::{Nonce, OracleId, SigningThreshold, VoteSetId};
use sbor::prelude::BasicSbor;
use thiserror::Error;
use tracing::warn;

/// One validator's slot state.
///
/// A slot transitions away from `Unvoted` exactly once per vote set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, BasicSbor)]
pub enum VoteType {
    Unvoted,
    Agree,
    Disagree,
}

impl VoteType {
    pub fn is_voted(self) -> bool {
        !matches!(self, VoteType::Unvoted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteSetError {
    #[error("nonce mismatch: vote set at {expected}, vote for {got}")]
    NonceMismatch { expected: Nonce, got: Nonce },
    #[error("validator {index} already voted")]
    AlreadyVoted { index: usize },
    #[error("validator index {index} out of range for set of {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("signer address does not match the slot it is voting for")]
    SignerMismatch,
    #[error("agree vote does not attest the vote set's message hash")]
    HashMismatch,
    #[error("agree vote carries no oracle signature")]
    MissingOracleSignature,
    #[error("cannot record an unvoted slot")]
    InvalidVoteType,
    #[error("vote sets are not mergeable: {field} differs")]
    NotMergeable { field: &'static str },
    #[error("validator {index} has not agreed")]
    NotAnAgreeVote { index: usize },
    #[error("chain id mismatch")]
    ChainIdMismatch,
    #[error("creation time is too far in the future")]
    CreationTimeInFuture,
    #[error("execution context exceeds {max} bytes")]
    ContextTooLarge { max: usize },
    #[error("validators hash does not match the signing set")]
    ValidatorsHashMismatch,
    #[error("oracle {0} is not registered")]
    UnknownOracle(OracleId),
    #[error("vote slots do not match the signing set")]
    MalformedSlots,
    #[error("oracle signature presence does not match votes")]
    SignatureCoverage,
    #[error("slot signature for validator {index} does not verify")]
    BadSlotSignature { index: usize },
    #[error("vote set has expired")]
    Expired,
    #[error("encoding failed: {0}")]
    Encoding(String),
}

/// Lookup seam for "is this oracle id registered", implemented by the
/// reactor's registry.
pub trait OracleDirectory {
    fn contains(&self, id: &OracleId) -> bool;
}

/// Parameters for [`VoteSet::validate`].
pub struct VoteSetValidation<'a> {
    pub chain_id: &'a str,
    pub max_context_size: usize,
    /// Maximum seconds the creation time may sit ahead of our clock.
    pub max_future_drift: i64,
    /// When set, the vote set must not be expired against this bound
    /// (seconds from creation time).
    pub check_expiration: Option<i64>,
    /// Unix seconds, local clock.
    pub now: i64,
}

/// Canonical per-slot signing payload. Deterministically encoded; covers
/// the full identity of the vote set plus the slot index and vote type so
/// signatures cannot be lifted.
///
/// The payload is covered through its stable part (request plus the attested
/// status, error and hash). The per-slot oracle signatures are deliberately
/// outside the coverage: they accumulate as votes land, and each one is
/// already bound to the same hash by its owning slot's signature.
#[derive(BasicSbor)]
struct SlotSignable {
    id: VoteSetId,
    oracle_id: OracleId,
    nonce: Nonce,
    chain_id: String,
    creation_time: i64,
    execution_context: Vec<u8>,
    response_status: i64,
    response_error: String,
    response_hash: MessageHash,
    validators_hash: MessageHash,
    slot: u32,
    vote: VoteType,
}

/// The vote set for one oracle at one nonce.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct VoteSet {
    pub id: VoteSetId,
    pub nonce: Nonce,
    pub chain_id: String,
    /// Unix seconds, proposer's clock.
    pub creation_time: i64,
    /// Seconds from creation time after which the set fully expires.
    pub expires_in: i64,
    pub validators_hash: MessageHash,
    /// Addresses of the bound signing set, in canonical order. Kept inline
    /// so the active-validator list survives a validator-set rotation.
    pub validator_addresses: Vec<Address>,
    pub execution_context: Vec<u8>,
    pub payload: VotePayload,
    pub votes: Vec<VoteType>,
    pub slot_signatures: Vec<Signature>,
    pub proposal_info: Option<ProposalInfo>,
}

impl VoteSet {
    /// Construct a fresh vote set with the proposer's own Agree vote
    /// installed and signed. The payload must already carry the proposer's
    /// oracle signature at `proposer_index`.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        id: VoteSetId,
        nonce: Nonce,
        chain_id: String,
        creation_time: i64,
        expires_in: i64,
        proposer_index: usize,
        execution_context: Vec<u8>,
        payload: VotePayload,
        signer: &dyn ValidatorSigner,
        set: &ValidatorSet,
        proposal_info: Option<ProposalInfo>,
    ) -> Result<Self, VoteSetError> {
        let len = set.len();
        if proposer_index >= len {
            return Err(VoteSetError::IndexOutOfRange {
                index: proposer_index,
                len,
            });
        }
        if payload.response.oracle_signatures.len() != len {
            return Err(VoteSetError::MalformedSlots);
        }

        let mut vote_set = Self {
            id,
            nonce,
            chain_id,
            creation_time,
            expires_in,
            validators_hash: set.hash(),
            validator_addresses: set.addresses(),
            execution_context,
            payload,
            votes: vec![VoteType::Unvoted; len],
            slot_signatures: vec![Signature::empty(); len],
            proposal_info,
        };

        if signer.address() != vote_set.validator_addresses[proposer_index] {
            return Err(VoteSetError::SignerMismatch);
        }

        let bytes = vote_set.slot_sign_bytes(proposer_index, VoteType::Agree)?;
        vote_set.votes[proposer_index] = VoteType::Agree;
        vote_set.slot_signatures[proposer_index] = signer.sign(&bytes);
        Ok(vote_set)
    }

    pub fn oracle_id(&self) -> &OracleId {
        &self.payload.request.oracle_id
    }

    /// The hash every Agree vote attests.
    pub fn message_hash(&self) -> &MessageHash {
        &self.payload.response.hash
    }

    fn slot_count(&self) -> usize {
        self.validator_addresses.len()
    }

    /// Record this node's own vote.
    pub fn add_vote(
        &mut self,
        nonce: Nonce,
        execution: &IndividualExecution,
        set: &ValidatorSet,
        own_index: usize,
        vote: VoteType,
        signer: &dyn ValidatorSigner,
    ) -> Result<(), VoteSetError> {
        if nonce != self.nonce {
            return Err(VoteSetError::NonceMismatch {
                expected: self.nonce,
                got: nonce,
            });
        }
        if !vote.is_voted() {
            return Err(VoteSetError::InvalidVoteType);
        }
        if own_index >= self.slot_count() {
            return Err(VoteSetError::IndexOutOfRange {
                index: own_index,
                len: self.slot_count(),
            });
        }
        if self.votes[own_index].is_voted() {
            return Err(VoteSetError::AlreadyVoted { index: own_index });
        }
        if set.hash() != self.validators_hash {
            return Err(VoteSetError::ValidatorsHashMismatch);
        }
        if signer.address() != self.validator_addresses[own_index] {
            return Err(VoteSetError::SignerMismatch);
        }
        if vote == VoteType::Agree {
            if execution.hash != self.payload.response.hash {
                return Err(VoteSetError::HashMismatch);
            }
            if execution.oracle_signature.is_empty() {
                return Err(VoteSetError::MissingOracleSignature);
            }
        }

        let bytes = self.slot_sign_bytes(own_index, vote)?;
        let signature = signer.sign(&bytes);

        self.votes[own_index] = vote;
        self.slot_signatures[own_index] = signature;
        if vote == VoteType::Agree {
            self.payload.response.oracle_signatures[own_index] =
                execution.oracle_signature.clone();
        }
        Ok(())
    }

    /// Merge a remote vote set into this one.
    ///
    /// Both sets must share the same identity (id, oracle, nonce, chain,
    /// creation time, context, message hash, signing set). Remote slots are
    /// adopted only where we are unvoted and the remote slot signature
    /// verifies. Returns whether anything changed locally.
    pub fn merge(&mut self, set: &ValidatorSet, other: &VoteSet) -> Result<bool, VoteSetError> {
        fn differs(field: &'static str) -> VoteSetError {
            VoteSetError::NotMergeable { field }
        }

        if self.id != other.id {
            return Err(differs("id"));
        }
        if self.oracle_id() != other.oracle_id() {
            return Err(differs("oracle id"));
        }
        if self.nonce != other.nonce {
            return Err(differs("nonce"));
        }
        if self.chain_id != other.chain_id {
            return Err(differs("chain id"));
        }
        if self.creation_time != other.creation_time {
            return Err(differs("creation time"));
        }
        if self.execution_context != other.execution_context {
            return Err(differs("execution context"));
        }
        if self.payload.response.hash != other.payload.response.hash {
            return Err(differs("message hash"));
        }
        if self.validators_hash != other.validators_hash {
            return Err(differs("validators hash"));
        }
        if set.hash() != self.validators_hash {
            return Err(VoteSetError::ValidatorsHashMismatch);
        }
        let len = self.slot_count();
        if other.votes.len() != len
            || other.slot_signatures.len() != len
            || other.payload.response.oracle_signatures.len() != len
        {
            return Err(VoteSetError::MalformedSlots);
        }

        let mut changed = false;
        for index in 0..len {
            if self.votes[index].is_voted() || !other.votes[index].is_voted() {
                continue;
            }
            let vote = other.votes[index];
            let Some(validator) = set.by_index(index) else {
                continue;
            };
            let bytes = self.slot_sign_bytes(index, vote)?;
            if !validator
                .public_key
                .verify(&bytes, &other.slot_signatures[index])
            {
                warn!(index, "discarding merge slot with unverifiable signature");
                continue;
            }
            if vote == VoteType::Agree && other.payload.response.oracle_signatures[index].is_empty()
            {
                warn!(index, "discarding agree slot without oracle signature");
                continue;
            }

            self.votes[index] = vote;
            self.slot_signatures[index] = other.slot_signatures[index].clone();
            if vote == VoteType::Agree {
                self.payload.response.oracle_signatures[index] =
                    other.payload.response.oracle_signatures[index].clone();
            }
            changed = true;
        }
        Ok(changed)
    }

    pub fn number_of_votes(&self) -> usize {
        self.votes.iter().filter(|v| v.is_voted()).count()
    }

    pub fn number_of_agree_votes(&self) -> usize {
        self.votes.iter().filter(|v| **v == VoteType::Agree).count()
    }

    pub fn has_already_signed(&self, index: usize) -> bool {
        self.votes.get(index).is_some_and(|v| v.is_voted())
    }

    fn power_where(&self, set: &ValidatorSet, wanted: impl Fn(VoteType) -> bool) -> i64 {
        self.votes
            .iter()
            .enumerate()
            .filter(|(_, v)| wanted(**v))
            .filter_map(|(i, _)| set.by_index(i))
            .map(|v| v.power)
            .sum()
    }

    /// Whether voting power of all voted slots meets the threshold.
    pub fn has_converged(&self, threshold: SigningThreshold, set: &ValidatorSet) -> bool {
        threshold.is_met(self.power_where(set, VoteType::is_voted), set.total_power())
    }

    /// Whether Agree voting power alone meets the threshold.
    pub fn is_agree(&self, threshold: SigningThreshold, set: &ValidatorSet) -> bool {
        threshold.is_met(
            self.power_where(set, |v| v == VoteType::Agree),
            set.total_power(),
        )
    }

    /// Whether Disagree voting power alone meets the threshold.
    pub fn is_disagree(&self, threshold: SigningThreshold, set: &ValidatorSet) -> bool {
        threshold.is_met(
            self.power_where(set, |v| v == VoteType::Disagree),
            set.total_power(),
        )
    }

    /// Whether the set has passed `bound` seconds from its creation time.
    pub fn is_expired(&self, now: i64, bound: i64) -> bool {
        now >= self.creation_time + bound
    }

    /// Addresses of the validators that voted, in slot order.
    pub fn active_validators(&self) -> Vec<Address> {
        self.validator_addresses
            .iter()
            .zip(&self.votes)
            .filter(|(_, v)| v.is_voted())
            .map(|(a, _)| a.clone())
            .collect()
    }

    /// Dense rank of `index` among the Agree voters.
    ///
    /// Used to pick the one submitter deterministically:
    /// `nonce mod number_of_agree_votes == rank`.
    pub fn agree_rank_of(&self, index: usize) -> Result<usize, VoteSetError> {
        if self.votes.get(index).copied() != Some(VoteType::Agree) {
            return Err(VoteSetError::NotAnAgreeVote { index });
        }
        Ok(self.votes[..index]
            .iter()
            .filter(|v| **v == VoteType::Agree)
            .count())
    }

    /// Full validity check against a signing set.
    pub fn validate(
        &self,
        params: &VoteSetValidation<'_>,
        set: &ValidatorSet,
        oracles: &dyn OracleDirectory,
    ) -> Result<(), VoteSetError> {
        if self.chain_id != params.chain_id {
            return Err(VoteSetError::ChainIdMismatch);
        }
        if self.creation_time > params.now + params.max_future_drift {
            return Err(VoteSetError::CreationTimeInFuture);
        }
        if self.execution_context.len() > params.max_context_size {
            return Err(VoteSetError::ContextTooLarge {
                max: params.max_context_size,
            });
        }
        if !oracles.contains(self.oracle_id()) {
            return Err(VoteSetError::UnknownOracle(self.oracle_id().clone()));
        }
        if self.validators_hash != set.hash() {
            return Err(VoteSetError::ValidatorsHashMismatch);
        }

        let len = set.len();
        if self.validator_addresses != set.addresses()
            || self.votes.len() != len
            || self.slot_signatures.len() != len
            || self.payload.response.oracle_signatures.len() != len
        {
            return Err(VoteSetError::MalformedSlots);
        }

        for index in 0..len {
            let vote = self.votes[index];
            let has_oracle_signature =
                !self.payload.response.oracle_signatures[index].is_empty();
            if (vote == VoteType::Agree) != has_oracle_signature {
                return Err(VoteSetError::SignatureCoverage);
            }
            if vote.is_voted() != !self.slot_signatures[index].is_empty() {
                return Err(VoteSetError::SignatureCoverage);
            }
            if vote.is_voted() {
                let bytes = self.slot_sign_bytes(index, vote)?;
                let key = set
                    .by_index(index)
                    .map(|v| v.public_key)
                    .ok_or(VoteSetError::MalformedSlots)?;
                if !key.verify(&bytes, &self.slot_signatures[index]) {
                    return Err(VoteSetError::BadSlotSignature { index });
                }
            }
        }

        if let Some(bound) = params.check_expiration {
            if self.is_expired(params.now, bound) {
                return Err(VoteSetError::Expired);
            }
        }
        Ok(())
    }

    fn slot_sign_bytes(&self, slot: usize, vote: VoteType) -> Result<Vec<u8>, VoteSetError> {
        let signable = SlotSignable {
            id: self.id.clone(),
            oracle_id: self.oracle_id().clone(),
            nonce: self.nonce,
            chain_id: self.chain_id.clone(),
            creation_time: self.creation_time,
            execution_context: self.execution_context.clone(),
            response_status: self.payload.response.status,
            response_error: self.payload.response.error.clone(),
            response_hash: self.payload.response.hash,
            validators_hash: self.validators_hash,
            slot: slot as u32,
            vote,
        };
        sbor::basic_encode(&signable).map_err(|e| VoteSetError::Encoding(format!("{e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::validator::ValidatorInfo;

    struct AllOracles;
    impl OracleDirectory for AllOracles {
        fn contains(&self, _: &OracleId) -> bool {
            true
        }
    }

    struct NoOracles;
    impl OracleDirectory for NoOracles {
        fn contains(&self, _: &OracleId) -> bool {
            false
        }
    }

    fn fixture(n: u8) -> (Vec<Keypair>, ValidatorSet) {
        let pairs: Vec<Keypair> = (0..n).map(|i| Keypair::from_seed([i + 1; 32])).collect();
        let set = ValidatorSet::new(
            pairs
                .iter()
                .map(|p| ValidatorInfo {
                    address: p.address(),
                    public_key: p.public_key(),
                    power: 10,
                })
                .collect(),
        );
        (pairs, set)
    }

    fn signer_at<'a>(pairs: &'a [Keypair], set: &ValidatorSet, index: usize) -> &'a Keypair {
        pairs
            .iter()
            .find(|p| set.position_of(&p.address()) == Some(index))
            .unwrap()
    }

    fn sample_vote_set(pairs: &[Keypair], set: &ValidatorSet, proposer: usize) -> VoteSet {
        let execution =
            IndividualExecution::agree(MessageHash::digest(b"observed"), Signature(vec![0xBB]));
        let payload = VotePayload::new(OracleId::new("feed"), &execution, proposer, set.len());
        VoteSet::create(
            VoteSetId::generate(),
            Nonce::STARTING,
            "test-chain".into(),
            1_700_000_000,
            51,
            proposer,
            vec![0x01, 0x02],
            payload,
            signer_at(pairs, set, proposer),
            set,
            None,
        )
        .unwrap()
    }

    fn validation(now: i64) -> VoteSetValidation<'static> {
        VoteSetValidation {
            chain_id: "test-chain",
            max_context_size: 1024,
            max_future_drift: 10,
            check_expiration: Some(40),
            now,
        }
    }

    #[test]
    fn create_installs_proposer_vote() {
        let (pairs, set) = fixture(3);
        let vote_set = sample_vote_set(&pairs, &set, 0);
        assert_eq!(vote_set.votes[0], VoteType::Agree);
        assert_eq!(vote_set.number_of_votes(), 1);
        assert_eq!(vote_set.number_of_agree_votes(), 1);
        assert!(vote_set.has_already_signed(0));
        assert!(!vote_set.has_already_signed(1));
        vote_set
            .validate(&validation(1_700_000_010), &set, &AllOracles)
            .unwrap();
    }

    #[test]
    fn serialization_round_trips() {
        let (pairs, set) = fixture(3);
        let vote_set = sample_vote_set(&pairs, &set, 1);
        let bytes = sbor::basic_encode(&vote_set).unwrap();
        let decoded: VoteSet = sbor::basic_decode(&bytes).unwrap();
        assert_eq!(decoded, vote_set);
    }

    #[test]
    fn add_vote_rejects_wrong_nonce() {
        let (pairs, set) = fixture(3);
        let mut vote_set = sample_vote_set(&pairs, &set, 0);
        let execution = IndividualExecution::disagree(MessageHash::digest(b"else"));
        let err = vote_set
            .add_vote(
                Nonce(7),
                &execution,
                &set,
                1,
                VoteType::Disagree,
                signer_at(&pairs, &set, 1),
            )
            .unwrap_err();
        assert!(matches!(err, VoteSetError::NonceMismatch { .. }));
    }

    #[test]
    fn slot_votes_exactly_once() {
        let (pairs, set) = fixture(3);
        let mut vote_set = sample_vote_set(&pairs, &set, 0);
        let execution = IndividualExecution::agree(
            *vote_set.message_hash(),
            Signature(vec![0xC1]),
        );
        vote_set
            .add_vote(
                Nonce::STARTING,
                &execution,
                &set,
                1,
                VoteType::Agree,
                signer_at(&pairs, &set, 1),
            )
            .unwrap();
        let err = vote_set
            .add_vote(
                Nonce::STARTING,
                &execution,
                &set,
                1,
                VoteType::Agree,
                signer_at(&pairs, &set, 1),
            )
            .unwrap_err();
        assert_eq!(err, VoteSetError::AlreadyVoted { index: 1 });
        // The proposer slot is taken too.
        let err = vote_set
            .add_vote(
                Nonce::STARTING,
                &execution,
                &set,
                0,
                VoteType::Agree,
                signer_at(&pairs, &set, 0),
            )
            .unwrap_err();
        assert_eq!(err, VoteSetError::AlreadyVoted { index: 0 });
    }

    #[test]
    fn agree_must_attest_the_same_hash() {
        let (pairs, set) = fixture(3);
        let mut vote_set = sample_vote_set(&pairs, &set, 0);
        let execution =
            IndividualExecution::agree(MessageHash::digest(b"different"), Signature(vec![0xC1]));
        let err = vote_set
            .add_vote(
                Nonce::STARTING,
                &execution,
                &set,
                1,
                VoteType::Agree,
                signer_at(&pairs, &set, 1),
            )
            .unwrap_err();
        assert_eq!(err, VoteSetError::HashMismatch);
    }

    #[test]
    fn disagree_stores_no_oracle_signature() {
        let (pairs, set) = fixture(3);
        let mut vote_set = sample_vote_set(&pairs, &set, 0);
        let execution = IndividualExecution::disagree(MessageHash::digest(b"different"));
        vote_set
            .add_vote(
                Nonce::STARTING,
                &execution,
                &set,
                2,
                VoteType::Disagree,
                signer_at(&pairs, &set, 2),
            )
            .unwrap();
        assert_eq!(vote_set.votes[2], VoteType::Disagree);
        assert!(vote_set.payload.response.oracle_signatures[2].is_empty());
        assert_eq!(vote_set.number_of_votes(), 2);
        assert_eq!(vote_set.number_of_agree_votes(), 1);
    }

    #[test]
    fn merge_adopts_verified_remote_slots() {
        let (pairs, set) = fixture(3);
        let local = sample_vote_set(&pairs, &set, 0);
        let mut remote = local.clone();
        let execution = IndividualExecution::agree(
            *remote.message_hash(),
            Signature(vec![0xC2]),
        );
        remote
            .add_vote(
                Nonce::STARTING,
                &execution,
                &set,
                1,
                VoteType::Agree,
                signer_at(&pairs, &set, 1),
            )
            .unwrap();

        let mut merged = local.clone();
        assert!(merged.merge(&set, &remote).unwrap());
        assert_eq!(merged.votes[1], VoteType::Agree);
        assert_eq!(
            merged.payload.response.oracle_signatures[1],
            Signature(vec![0xC2])
        );
        // Merging the same remote again changes nothing.
        assert!(!merged.merge(&set, &remote).unwrap());
    }

    #[test]
    fn merge_rejects_different_identity() {
        let (pairs, set) = fixture(3);
        let mut local = sample_vote_set(&pairs, &set, 0);
        let rival = sample_vote_set(&pairs, &set, 1);
        let err = local.merge(&set, &rival).unwrap_err();
        assert_eq!(err, VoteSetError::NotMergeable { field: "id" });
    }

    #[test]
    fn merge_skips_forged_slot_signature() {
        let (pairs, set) = fixture(3);
        let local = sample_vote_set(&pairs, &set, 0);
        let mut remote = local.clone();
        // Forge a vote for validator 1 without its key.
        remote.votes[1] = VoteType::Agree;
        remote.slot_signatures[1] = Signature(vec![0xDE; 64]);
        remote.payload.response.oracle_signatures[1] = Signature(vec![0xAD]);

        let mut merged = local.clone();
        assert!(!merged.merge(&set, &remote).unwrap());
        assert_eq!(merged.votes[1], VoteType::Unvoted);
    }

    #[test]
    fn convergence_thresholds() {
        let (pairs, set) = fixture(3);
        let mut vote_set = sample_vote_set(&pairs, &set, 0);
        assert!(!vote_set.has_converged(SigningThreshold::Maj23, &set));

        let execution = IndividualExecution::disagree(MessageHash::digest(b"other"));
        vote_set
            .add_vote(
                Nonce::STARTING,
                &execution,
                &set,
                1,
                VoteType::Disagree,
                signer_at(&pairs, &set, 1),
            )
            .unwrap();
        // Two of three voted: exactly two thirds, strictly-greater fails.
        assert!(!vote_set.has_converged(SigningThreshold::Maj23, &set));
        assert!(!vote_set.has_converged(SigningThreshold::All, &set));

        let execution = IndividualExecution::agree(
            *vote_set.message_hash(),
            Signature(vec![0xC3]),
        );
        vote_set
            .add_vote(
                Nonce::STARTING,
                &execution,
                &set,
                2,
                VoteType::Agree,
                signer_at(&pairs, &set, 2),
            )
            .unwrap();
        assert!(vote_set.has_converged(SigningThreshold::Maj23, &set));
        assert!(vote_set.has_converged(SigningThreshold::All, &set));
        // Agree power is 2/3: converged overall but not agree-converged.
        assert!(!vote_set.is_agree(SigningThreshold::Maj23, &set));
        assert!(!vote_set.is_disagree(SigningThreshold::Maj23, &set));
    }

    #[test]
    fn expiration_boundary() {
        let (pairs, set) = fixture(3);
        let vote_set = sample_vote_set(&pairs, &set, 0);
        let created = vote_set.creation_time;
        assert!(!vote_set.is_expired(created + 39, 40));
        assert!(vote_set.is_expired(created + 40, 40));
        assert!(vote_set.is_expired(created + 41, 40));
    }

    #[test]
    fn agree_rank_is_dense() {
        let (pairs, set) = fixture(4);
        let mut vote_set = sample_vote_set(&pairs, &set, 0);
        let disagree = IndividualExecution::disagree(MessageHash::digest(b"other"));
        vote_set
            .add_vote(
                Nonce::STARTING,
                &disagree,
                &set,
                1,
                VoteType::Disagree,
                signer_at(&pairs, &set, 1),
            )
            .unwrap();
        let agree = IndividualExecution::agree(
            *vote_set.message_hash(),
            Signature(vec![0xC4]),
        );
        vote_set
            .add_vote(
                Nonce::STARTING,
                &agree,
                &set,
                2,
                VoteType::Agree,
                signer_at(&pairs, &set, 2),
            )
            .unwrap();

        assert_eq!(vote_set.agree_rank_of(0).unwrap(), 0);
        // Validator 1 disagreed; validator 2 is the second Agree voter.
        assert_eq!(vote_set.agree_rank_of(2).unwrap(), 1);
        assert!(matches!(
            vote_set.agree_rank_of(1),
            Err(VoteSetError::NotAnAgreeVote { index: 1 })
        ));
    }

    #[test]
    fn validate_rejects_bad_inputs() {
        let (pairs, set) = fixture(3);
        let vote_set = sample_vote_set(&pairs, &set, 0);
        let now = vote_set.creation_time + 1;

        let mut params = validation(now);
        params.chain_id = "other-chain";
        assert_eq!(
            vote_set.validate(&params, &set, &AllOracles),
            Err(VoteSetError::ChainIdMismatch)
        );

        // Proposed from more than ten seconds in the future.
        let params = validation(vote_set.creation_time - 11);
        assert_eq!(
            vote_set.validate(&params, &set, &AllOracles),
            Err(VoteSetError::CreationTimeInFuture)
        );

        let mut params = validation(now);
        params.max_context_size = 1;
        assert_eq!(
            vote_set.validate(&params, &set, &AllOracles),
            Err(VoteSetError::ContextTooLarge { max: 1 })
        );

        assert!(matches!(
            vote_set.validate(&validation(now), &set, &NoOracles),
            Err(VoteSetError::UnknownOracle(_))
        ));

        let (_, other_set) = fixture(4);
        assert_eq!(
            vote_set.validate(&validation(now), &other_set, &AllOracles),
            Err(VoteSetError::ValidatorsHashMismatch)
        );

        // Expired against the sync bound.
        let params = validation(vote_set.creation_time + 40);
        assert_eq!(
            vote_set.validate(&params, &set, &AllOracles),
            Err(VoteSetError::Expired)
        );

        // Tampered slot signature.
        let mut tampered = vote_set.clone();
        tampered.slot_signatures[0] = Signature(vec![0xEE; 64]);
        assert_eq!(
            tampered.validate(&validation(now), &set, &AllOracles),
            Err(VoteSetError::BadSlotSignature { index: 0 })
        );

        // Oracle signature present on an unvoted slot.
        let mut tampered = vote_set.clone();
        tampered.payload.response.oracle_signatures[1] = Signature(vec![0x01]);
        assert_eq!(
            tampered.validate(&validation(now), &set, &AllOracles),
            Err(VoteSetError::SignatureCoverage)
        );
    }

    #[test]
    fn signature_does_not_transfer_between_slots() {
        let (pairs, set) = fixture(3);
        let vote_set = sample_vote_set(&pairs, &set, 0);
        // Move the proposer's valid signature onto another slot.
        let mut tampered = vote_set.clone();
        tampered.votes[1] = VoteType::Agree;
        tampered.slot_signatures[1] = tampered.slot_signatures[0].clone();
        tampered.payload.response.oracle_signatures[1] = Signature(vec![0xBB]);
        let now = vote_set.creation_time + 1;
        assert!(matches!(
            tampered.validate(&validation(now), &set, &AllOracles),
            Err(VoteSetError::BadSlotSignature { .. })
        ));
    }
}
