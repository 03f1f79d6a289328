//! The proposer-rotation cursor.

use crate::validator::Address;
use sbor::prelude::BasicSbor;

/// Rotation cursor for one oracle: the active-validator list plus whose
/// turn it is to propose.
///
/// Every honest node with the same reactor state derives the same cursor,
/// which is what makes the rotation deterministic across the network.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct ProposalInfo {
    pub last_active_validators: Vec<Address>,
    pub current_turn: u32,
}

impl ProposalInfo {
    pub fn new(last_active_validators: Vec<Address>, current_turn: u32) -> Self {
        Self {
            last_active_validators,
            current_turn,
        }
    }

    /// The validator entitled to propose next.
    pub fn current_proposer(&self) -> Option<&Address> {
        self.last_active_validators.get(self.current_turn as usize)
    }
}
