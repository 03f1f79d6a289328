//! Reactor configuration and timing constants.

use attestor_types::{Address, SigningThreshold, UnknownThreshold, ValidatorSet};
use std::time::Duration;
use thiserror::Error;

/// Seconds between sync expiration, overall expiration and the next
/// proposal; commit routines get this long to run against a frozen set.
pub const COMMIT_EXECUTION_BUFFER_SECS: i64 = 1;

/// Interval between two progress ticks, synced across nodes.
pub const PROGRESS_INTERVAL_SECS: i64 = 60 + COMMIT_EXECUTION_BUFFER_SECS;

/// A vote set completely expires (for both sync and commit) after this
/// many seconds from its creation time.
pub const EXPIRES_IN_SECS: i64 = 50 + COMMIT_EXECUTION_BUFFER_SECS;

/// A vote set cannot be modified beyond this bound, but can still be used
/// to let lagging nodes catch up on the nonce.
pub const EXPIRES_IN_FOR_SYNC_SECS: i64 = 40;

/// Maximum oracle context size: 1 KiB.
pub const MAX_CONTEXT_SIZE: usize = 1024;

/// Maximum seconds a vote set's creation time may sit ahead of our clock.
pub const MAX_ALLOWED_TIME_DRIFT_SECS: i64 = 10;

/// Per-validator stagger so the designated proposer's vote set lands at
/// peers before any rival proposal.
pub const BASE_PROPOSAL_DELAY: Duration = Duration::from_millis(500);

/// Retry interval while waiting for the host chain state to appear.
pub const PROGRESS_LOOP_START_DELAY: Duration = Duration::from_secs(2);

/// One member of the configured override validator set.
///
/// The entry is matched by address against the chain validator set; the
/// chain's own record (including its voting power) is what gets used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideValidator {
    pub address: Address,
    pub power: i64,
}

/// Reactor configuration supplied by the host at startup.
#[derive(Debug, Clone)]
pub struct ReactorConfig {
    /// Optional fixed subset of the chain validators to use as the signing
    /// set for all vote sets. When unset, the live chain set is used.
    pub override_validators: Option<Vec<OverrideValidator>>,
    pub signing_threshold: SigningThreshold,
}

impl ReactorConfig {
    pub fn new(
        signing_threshold: SigningThreshold,
        override_validators: Option<Vec<OverrideValidator>>,
    ) -> Self {
        Self {
            override_validators,
            signing_threshold,
        }
    }

    /// Build a config from a threshold name, as read from the host's
    /// configuration file. Any name other than `Maj23` or `All` is a fatal
    /// startup error.
    pub fn from_threshold_name(
        name: &str,
        override_validators: Option<Vec<OverrideValidator>>,
    ) -> Result<Self, ConfigError> {
        let signing_threshold: SigningThreshold = name.parse()?;
        Ok(Self {
            override_validators,
            signing_threshold,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(transparent)]
    InvalidThreshold(#[from] UnknownThreshold),
    #[error("override validator {0} does not exist in the chain validator set")]
    UnknownOverrideValidator(Address),
}

/// Resolve the configured override set against the chain validator set.
///
/// Each override entry must name an existing chain validator; the chain's
/// record is copied into the resulting set. Returns `None` when no
/// override is configured.
pub fn resolve_override_set(
    config: &ReactorConfig,
    chain_set: &ValidatorSet,
) -> Result<Option<ValidatorSet>, ConfigError> {
    let Some(overrides) = &config.override_validators else {
        return Ok(None);
    };

    let mut members = Vec::with_capacity(overrides.len());
    for entry in overrides {
        let validator = chain_set
            .by_address(&entry.address)
            .ok_or_else(|| ConfigError::UnknownOverrideValidator(entry.address.clone()))?;
        members.push(validator.clone());
    }
    Ok(Some(ValidatorSet::new(members)))
}
