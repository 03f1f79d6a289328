//! Timer management for the production runner.
//!
//! Timers are spawned as tokio tasks and can be cancelled. Each timer
//! carries the event it delivers when it fires; the commit deadline event
//! embeds the vote set id it was armed for, which is how a deadline that
//! raced a replacement is recognized as stale.

use attestor_core::{Event, TimerId};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Manages timers for the production runner.
///
/// Each timer is a tokio task that sleeps for the specified duration and
/// then sends its event to the event channel. Durations are slept on the
/// monotonic clock; only the computation of the duration itself involves
/// wall-clock time.
pub struct TimerManager {
    /// Active timers (id -> task handle).
    timers: HashMap<TimerId, JoinHandle<()>>,
    /// Event sender for timer fires.
    event_tx: mpsc::Sender<Event>,
}

impl TimerManager {
    pub fn new(event_tx: mpsc::Sender<Event>) -> Self {
        Self {
            timers: HashMap::new(),
            event_tx,
        }
    }

    /// Arm a timer that delivers `event` after `duration`.
    ///
    /// An already-armed timer with the same id is cancelled first.
    pub fn set_timer(&mut self, id: TimerId, duration: Duration, event: Event) {
        self.cancel_timer(&id);

        let event_tx = self.event_tx.clone();
        let timer_id = id.clone();
        let handle = tokio::spawn(async move {
            trace!(?timer_id, ?duration, "timer armed, sleeping");
            tokio::time::sleep(duration).await;
            trace!(?timer_id, "timer fired");
            let _ = event_tx.send(event).await;
        });

        self.timers.insert(id.clone(), handle);
        debug!(?id, ?duration, "timer set");
    }

    /// Cancel a timer. A no-op if it does not exist or already fired.
    pub fn cancel_timer(&mut self, id: &TimerId) {
        if let Some(handle) = self.timers.remove(id) {
            handle.abort();
            debug!(?id, "timer cancelled");
        }
    }

    /// Cancel all timers. Called during shutdown.
    pub fn cancel_all(&mut self) {
        for (id, handle) in self.timers.drain() {
            handle.abort();
            trace!(?id, "timer cancelled (shutdown)");
        }
    }

    pub fn active_count(&self) -> usize {
        self.timers.len()
    }
}

impl Drop for TimerManager {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
