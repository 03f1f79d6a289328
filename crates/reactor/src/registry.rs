//! The oracle callback contract and its registry.

use attestor_types::{MessageHash, OracleDirectory, OracleId, Signature};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// An oracle callback failure. Operational: logged and dropped by the
/// reactor, never fatal.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct OracleError {
    message: String,
}

impl OracleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A pluggable callback registered under a unique [`OracleId`].
///
/// The reactor asks the oracle what to sign and hands it back the
/// aggregate. It never interprets the message beyond hashing it. Callbacks
/// are invoked inline by the reactor's handlers and are expected to
/// complete promptly (milliseconds).
///
/// Every buffer handed to a callback is an independent copy; callbacks may
/// retain what they receive.
pub trait Oracle: Send + Sync {
    /// Produce the opaque execution context for this round, or `None` to
    /// skip the round entirely.
    fn prepare_context(&self) -> Result<Option<Vec<u8>>, OracleError>;

    /// Produce the message to attest and this validator's oracle signature
    /// over it.
    fn message_and_signature(&self, context: &[u8])
        -> Result<(Vec<u8>, Signature), OracleError>;

    /// Record the local binding between a context, a message and its hash.
    /// Called before every vote, agreeing or not.
    fn map_message(
        &self,
        context: &[u8],
        hash: &MessageHash,
        message: &[u8],
    ) -> Result<(), OracleError>;

    /// Deliver the aggregated attestation. `signatures` is indexed by
    /// validator position in the signing set; slots of validators that did
    /// not agree are empty.
    fn submit_multi_signed_message(
        &self,
        context: Vec<u8>,
        hash: MessageHash,
        signatures: Vec<Signature>,
    ) -> Result<(), OracleError>;
}

/// Registry of oracle callbacks, fixed for the life of the reactor.
///
/// Iteration order is ascending by id, so every node walks the registry in
/// the same order at every progress tick.
#[derive(Clone, Default)]
pub struct OracleRegistry {
    oracles: BTreeMap<OracleId, Arc<dyn Oracle>>,
}

impl OracleRegistry {
    pub fn new(oracles: impl IntoIterator<Item = (OracleId, Arc<dyn Oracle>)>) -> Self {
        Self {
            oracles: oracles.into_iter().collect(),
        }
    }

    pub fn get(&self, id: &OracleId) -> Option<Arc<dyn Oracle>> {
        self.oracles.get(id).cloned()
    }

    /// All registered ids, ascending.
    pub fn ids(&self) -> Vec<OracleId> {
        self.oracles.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }
}

impl std::fmt::Debug for OracleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

impl OracleDirectory for OracleRegistry {
    fn contains(&self, id: &OracleId) -> bool {
        self.oracles.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullOracle;
    impl Oracle for NullOracle {
        fn prepare_context(&self) -> Result<Option<Vec<u8>>, OracleError> {
            Ok(None)
        }
        fn message_and_signature(
            &self,
            _: &[u8],
        ) -> Result<(Vec<u8>, Signature), OracleError> {
            Err(OracleError::new("unused"))
        }
        fn map_message(&self, _: &[u8], _: &MessageHash, _: &[u8]) -> Result<(), OracleError> {
            Ok(())
        }
        fn submit_multi_signed_message(
            &self,
            _: Vec<u8>,
            _: MessageHash,
            _: Vec<Signature>,
        ) -> Result<(), OracleError> {
            Ok(())
        }
    }

    #[test]
    fn ids_are_sorted() {
        let registry = OracleRegistry::new([
            (OracleId::new("zeta"), Arc::new(NullOracle) as Arc<dyn Oracle>),
            (OracleId::new("alpha"), Arc::new(NullOracle) as Arc<dyn Oracle>),
            (OracleId::new("mid"), Arc::new(NullOracle) as Arc<dyn Oracle>),
        ]);
        assert_eq!(
            registry.ids(),
            vec![
                OracleId::new("alpha"),
                OracleId::new("mid"),
                OracleId::new("zeta")
            ]
        );
    }

    #[test]
    fn lookup_and_membership() {
        let registry = OracleRegistry::new([(
            OracleId::new("feed"),
            Arc::new(NullOracle) as Arc<dyn Oracle>,
        )]);
        assert!(registry.get(&OracleId::new("feed")).is_some());
        assert!(registry.get(&OracleId::new("other")).is_none());
        assert!(registry.contains(&OracleId::new("feed")));
        assert!(!registry.contains(&OracleId::new("other")));
    }
}
