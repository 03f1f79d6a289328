//! Action types for the reactor state machine.

use crate::{Event, OutboundMessage, TimerId};
use attestor_types::PeerId;
use std::time::Duration;

/// Actions the state machine wants performed.
///
/// Actions are **commands**. The runner executes each handler's actions in
/// order; a failed [`Action::PersistState`] drops the remainder of the
/// batch, so gossip never races ahead of durable state.
#[derive(Debug, Clone)]
pub enum Action {
    /// Broadcast a message to every connected peer.
    ///
    /// `exclude` skips one peer - the sender of a message we merely
    /// absorbed, which already holds everything we would echo back.
    Gossip {
        message: OutboundMessage,
        exclude: Option<PeerId>,
    },

    /// Arm a timer that delivers `event` after `duration`.
    ///
    /// An already-armed timer with the same id is replaced.
    SetTimer {
        id: TimerId,
        duration: Duration,
        event: Event,
    },

    /// Cancel a previously armed timer.
    CancelTimer { id: TimerId },

    /// Persist the reactor state record.
    PersistState,
}

impl Action {
    /// Get the action type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Gossip { .. } => "Gossip",
            Action::SetTimer { .. } => "SetTimer",
            Action::CancelTimer { .. } => "CancelTimer",
            Action::PersistState => "PersistState",
        }
    }
}
