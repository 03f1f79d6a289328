//! The attestation reactor.
//!
//! Coordinates a validator set to collectively observe an off-chain event,
//! vote on the resulting message hash, and assemble a multi-signed
//! attestation that one deterministically chosen validator submits back to
//! the registered oracle.
//!
//! The reactor rides on a host chain that supplies the validator set and
//! each validator's signing key. It does not order transactions, produce
//! blocks, or decide what the observed message should be - the registered
//! [`Oracle`] decides that.

mod config;
mod reactor;
mod registry;
mod rotation;
mod state;

pub use config::{
    resolve_override_set, ConfigError, OverrideValidator, ReactorConfig,
    BASE_PROPOSAL_DELAY, COMMIT_EXECUTION_BUFFER_SECS, EXPIRES_IN_FOR_SYNC_SECS, EXPIRES_IN_SECS,
    MAX_ALLOWED_TIME_DRIFT_SECS, MAX_CONTEXT_SIZE, PROGRESS_INTERVAL_SECS,
    PROGRESS_LOOP_START_DELAY,
};
pub use reactor::Reactor;
pub use registry::{Oracle, OracleError, OracleRegistry};
pub use rotation::next_proposal_info;
pub use state::ReactorState;
