//! Proposer rotation.

use crate::state::ReactorState;
use attestor_types::{OracleId, ProposalInfo, ValidatorSet};

/// Derive the rotation cursor for the oracle's next attempt.
///
/// Every honest node with the same reactor state and validator set derives
/// the same cursor; the whole network agrees on who proposes next.
///
/// Rules, in order:
/// 1. No previously converged vote set: rotation is uninitialized, no
///    proposer yet. The network unblocks once any validator completes one
///    commit cycle (a single-validator override set seeds itself).
/// 2. The last converged set was signed by a different validator set than
///    the current one: reseed from the current set at turn 0.
/// 3. The last converged set's active voters differ from the stored
///    cursor's list: adopt the active list at turn 0.
/// 4. Otherwise advance the turn, wrapping around the active list.
pub fn next_proposal_info(
    oracle_id: &OracleId,
    state: &ReactorState,
    current_set: &ValidatorSet,
) -> Option<ProposalInfo> {
    let last_maj23 = state.previous_maj23_vote_sets.get(oracle_id)?;

    if last_maj23.validators_hash != current_set.hash() {
        return Some(ProposalInfo::new(current_set.addresses(), 0));
    }

    let active = last_maj23.active_validators();
    if active.is_empty() {
        return None;
    }

    match state.current_proposal_info.get(oracle_id) {
        Some(cursor) if cursor.last_active_validators == active => {
            let turn = (cursor.current_turn + 1) % active.len() as u32;
            Some(ProposalInfo::new(active, turn))
        }
        _ => Some(ProposalInfo::new(active, 0)),
    }
}
