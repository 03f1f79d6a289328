//! The state machine trait.

use crate::{Action, Event};
use std::time::Duration;

/// A synchronous, event-driven state machine.
///
/// The runner sets the current time before each `handle` call; handlers
/// never read the clock themselves, which keeps them testable at any
/// simulated instant.
pub trait StateMachine {
    /// Set the current wall-clock time (duration since the Unix epoch).
    fn set_time(&mut self, now: Duration);

    /// Process one event and return the actions to perform.
    fn handle(&mut self, event: Event) -> Vec<Action>;
}
