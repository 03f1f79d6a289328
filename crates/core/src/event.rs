//! Event types for the reactor state machine.

use attestor_types::{OracleId, PeerId, VoteSet, VoteSetId};

/// All possible events the reactor can receive.
///
/// Events are **passive data** - they describe something that happened.
/// The state machine processes events and returns actions.
#[derive(Debug, Clone)]
pub enum Event {
    /// The progress timer fired: archive expired vote sets, rotate
    /// proposers, and propose where this node is the designated proposer.
    ProgressTick,

    /// A commit deadline fired for an in-flight vote set.
    ///
    /// Carries the id of the vote set the timer was armed for: if the
    /// vote set was replaced while this event sat in the queue, the id no
    /// longer matches and the deadline is ignored as stale.
    CommitDeadline {
        oracle_id: OracleId,
        vote_set_id: VoteSetId,
    },

    /// Received an in-flight vote set on the vote-set channel.
    VoteSetReceived { from: PeerId, vote_set: VoteSet },

    /// Received a peer's last committed vote set on the recovery channel.
    Maj23Received { from: PeerId, vote_set: VoteSet },
}

impl Event {
    /// Get the event type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::ProgressTick => "ProgressTick",
            Event::CommitDeadline { .. } => "CommitDeadline",
            Event::VoteSetReceived { .. } => "VoteSetReceived",
            Event::Maj23Received { .. } => "Maj23Received",
        }
    }
}
