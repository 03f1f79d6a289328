//! The request/response payload carried by a vote set.

use crate::crypto::Signature;
use crate::hash::MessageHash;
use crate::OracleId;
use sbor::prelude::BasicSbor;

/// The request half of a vote-set payload: which oracle is being attested.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct ExecutionRequest {
    pub oracle_id: OracleId,
}

/// One validator's local execution result, before aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndividualExecution {
    pub status: i64,
    pub error: String,
    pub hash: MessageHash,
    /// The validator's oracle signature over the message; empty on disagree.
    pub oracle_signature: Signature,
}

impl IndividualExecution {
    pub fn agree(hash: MessageHash, oracle_signature: Signature) -> Self {
        Self {
            status: 0,
            error: String::new(),
            hash,
            oracle_signature,
        }
    }

    pub fn disagree(hash: MessageHash) -> Self {
        Self {
            status: 0,
            error: String::new(),
            hash,
            oracle_signature: Signature::empty(),
        }
    }
}

/// The aggregated response half of a vote-set payload.
///
/// `oracle_signatures` is indexed by validator position in the bound set;
/// a slot is non-empty exactly when that validator voted Agree. All
/// non-empty slots attest the same `hash`.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct ExecutionResponse {
    pub status: i64,
    pub error: String,
    pub hash: MessageHash,
    pub oracle_signatures: Vec<Signature>,
}

/// The payload of one vote set.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct VotePayload {
    pub request: ExecutionRequest,
    pub response: ExecutionResponse,
}

impl VotePayload {
    /// Build a proposer's payload: the proposer's own execution result with
    /// its oracle signature installed at `proposer_index` of a set of
    /// `set_size` validators.
    pub fn new(
        oracle_id: OracleId,
        execution: &IndividualExecution,
        proposer_index: usize,
        set_size: usize,
    ) -> Self {
        let mut oracle_signatures = vec![Signature::empty(); set_size];
        oracle_signatures[proposer_index] = execution.oracle_signature.clone();
        Self {
            request: ExecutionRequest { oracle_id },
            response: ExecutionResponse {
                status: execution.status,
                error: execution.error.clone(),
                hash: execution.hash,
                oracle_signatures,
            },
        }
    }
}
