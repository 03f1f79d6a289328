//! Production metrics using the native Prometheus client.
//!
//! Metrics are domain-specific rather than generic event counters. Use
//! traces for event-level granularity during investigations.

use prometheus::{register_counter, register_gauge, Counter, Gauge};
use std::sync::OnceLock;

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Domain-specific metrics for production monitoring.
pub struct Metrics {
    // === Gossip ===
    pub vote_sets_received: Counter,
    pub recovery_messages_received: Counter,
    pub invalid_messages_received: Counter,
    pub messages_sent: Counter,

    // === Infrastructure ===
    pub peers_connected: Gauge,
    pub state_persist_failures: Counter,
}

impl Metrics {
    fn new() -> Self {
        Self {
            vote_sets_received: register_counter!(
                "attestor_vote_sets_received_total",
                "Vote set messages received"
            )
            .unwrap(),
            recovery_messages_received: register_counter!(
                "attestor_recovery_messages_received_total",
                "Recovery messages received"
            )
            .unwrap(),
            invalid_messages_received: register_counter!(
                "attestor_invalid_messages_received_total",
                "Messages dropped as undecodable"
            )
            .unwrap(),
            messages_sent: register_counter!(
                "attestor_messages_sent_total",
                "Gossip messages sent to peers"
            )
            .unwrap(),
            peers_connected: register_gauge!(
                "attestor_peers_connected",
                "Currently connected peers"
            )
            .unwrap(),
            state_persist_failures: register_counter!(
                "attestor_state_persist_failures_total",
                "Failed reactor state writes"
            )
            .unwrap(),
        }
    }
}

/// Get the global metrics instance.
pub fn get() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_once() {
        let a = get() as *const Metrics;
        let b = get() as *const Metrics;
        assert_eq!(a, b);
        get().vote_sets_received.inc();
    }
}
