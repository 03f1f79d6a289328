//! Production runner with async I/O.
//!
//! This crate wraps the deterministic reactor state machine with real I/O:
//!
//! - Inbound gossip and timers delivered over one mpsc channel
//! - Timers as cancellable tokio tasks
//! - State persistence into a synchronous key-value store
//! - Outbound gossip through the host transport seam
//!
//! # Architecture
//!
//! Uses the event aggregator pattern: a single task owns the state machine
//! and receives events via an mpsc channel, so every state transition is
//! serialized without a mutex.
//!
//! ```text
//! transport ─┐
//! timers ────┼──▶ mpsc ──▶ Reactor::handle() ──▶ actions ──▶ persist / gossip / timers
//! host ──────┘
//! ```

pub mod metrics;
pub mod network;
mod runner;
mod storage;
mod telemetry;
mod timers;

pub use network::{decode_message, encode_message, CodecError, GossipTransport, InboundMessage};
pub use runner::{ReactorHandle, ReactorRunner, ReactorRunnerBuilder, RunnerError};
pub use storage::{
    load_reactor_state, save_reactor_state, KeyValueStore, MemoryStore, RocksDbStore,
    StorageError, REACTOR_STATE_KEY,
};
pub use telemetry::{init_telemetry, TelemetryConfig};
pub use timers::TimerManager;
