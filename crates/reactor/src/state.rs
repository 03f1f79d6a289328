//! The reactor's durable state record.

use attestor_types::{Nonce, OracleId, ProposalInfo, ValidatorSet, VoteSet};
use sbor::prelude::BasicSbor;
use std::collections::BTreeMap;
use tracing::info;

/// Everything the reactor persists, serialized as a single record under a
/// well-known key. Saved after every mutation, so the on-disk record never
/// lags the state a subsequent handler observes.
#[derive(Debug, Clone, Default, PartialEq, Eq, BasicSbor)]
pub struct ReactorState {
    /// In-flight vote set per oracle, at most one each.
    pub current_vote_sets: BTreeMap<OracleId, VoteSet>,
    /// Last successfully converged vote set per oracle; what late joiners
    /// catch up from.
    pub previous_maj23_vote_sets: BTreeMap<OracleId, VoteSet>,
    /// Archived non-converged vote sets, kept for diagnostics.
    pub previous_timed_out_vote_sets: BTreeMap<OracleId, VoteSet>,
    /// Next nonce to use for a new proposal, per oracle.
    pub current_nonces: BTreeMap<OracleId, Nonce>,
    /// Proposer-rotation cursor per oracle.
    pub current_proposal_info: BTreeMap<OracleId, ProposalInfo>,
    /// The set that signed the last converged vote set; validates recovery
    /// messages across a validator-set rotation.
    pub previous_validator_set: Option<ValidatorSet>,
}

impl ReactorState {
    /// The nonce for the oracle's next proposal; nonces start at 1.
    pub fn current_nonce(&self, oracle_id: &OracleId) -> Nonce {
        self.current_nonces
            .get(oracle_id)
            .copied()
            .unwrap_or(Nonce::STARTING)
    }

    /// Drop in-flight vote sets that expired while the node was down.
    /// Returns how many were dropped.
    pub fn drop_expired_vote_sets(&mut self, now: i64, bound: i64) -> usize {
        let before = self.current_vote_sets.len();
        self.current_vote_sets.retain(|oracle_id, vote_set| {
            let expired = vote_set.is_expired(now, bound);
            if expired {
                info!(%oracle_id, nonce = %vote_set.nonce, "dropping expired in-flight vote set");
            }
            !expired
        });
        before - self.current_vote_sets.len()
    }
}
