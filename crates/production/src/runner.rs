//! The production runner: a single task owning the reactor state machine.

use crate::metrics;
use crate::network::{decode_message, encode_message, GossipTransport, InboundMessage};
use crate::storage::{load_reactor_state, save_reactor_state, KeyValueStore, StorageError};
use crate::timers::TimerManager;
use attestor_core::{Action, Event, OutboundMessage, StateMachine};
use attestor_messages::GossipChannel;
use attestor_reactor::{
    resolve_override_set, ConfigError, OracleRegistry, Reactor, ReactorConfig,
    PROGRESS_LOOP_START_DELAY,
};
use attestor_types::{
    ChainStateSource, ChainValidators, PeerId, StaticValidators, ValidatorSet, ValidatorSigner,
    ValidatorSource,
};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// Errors from building or driving the runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("missing required builder field: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("event channel closed")]
    ChannelClosed,
}

fn unix_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

/// Handle through which the host feeds the runner: inbound gossip, peer
/// lifecycle, shutdown.
#[derive(Clone)]
pub struct ReactorHandle {
    event_tx: mpsc::Sender<Event>,
    peers: Arc<RwLock<HashSet<PeerId>>>,
    shutdown_tx: Arc<parking_lot::Mutex<Option<oneshot::Sender<()>>>>,
}

impl ReactorHandle {
    /// Deliver bytes that arrived on one of the reactor's channels.
    ///
    /// Undecodable messages and proposal-cursor sync traffic are logged
    /// and dropped; only a closed runner is an error.
    pub async fn receive(
        &self,
        channel: GossipChannel,
        from: PeerId,
        bytes: &[u8],
    ) -> Result<(), RunnerError> {
        let event = match decode_message(channel, bytes) {
            Ok(InboundMessage::VoteSet(message)) => {
                metrics::get().vote_sets_received.inc();
                Event::VoteSetReceived {
                    from,
                    vote_set: message.vote_set,
                }
            }
            Ok(InboundMessage::Maj23(message)) => {
                metrics::get().recovery_messages_received.inc();
                Event::Maj23Received {
                    from,
                    vote_set: message.vote_set,
                }
            }
            Ok(InboundMessage::ProposalInfoSync(message)) => {
                warn!(%from, oracle_id = %message.oracle_id, "unconsumed proposal sync message, dropping");
                return Ok(());
            }
            Err(error) => {
                metrics::get().invalid_messages_received.inc();
                warn!(%from, %channel, %error, "undecodable message, dropping");
                return Ok(());
            }
        };
        self.event_tx
            .send(event)
            .await
            .map_err(|_| RunnerError::ChannelClosed)
    }

    /// Track a newly connected peer.
    pub fn add_peer(&self, peer: PeerId) {
        let mut peers = self.peers.write();
        peers.insert(peer);
        metrics::get().peers_connected.set(peers.len() as f64);
    }

    /// Forget a disconnected peer.
    pub fn remove_peer(&self, peer: &PeerId) {
        let mut peers = self.peers.write();
        peers.remove(peer);
        metrics::get().peers_connected.set(peers.len() as f64);
    }

    /// Signal the runner to exit gracefully.
    pub fn shutdown(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
    }
}

/// Builder for [`ReactorRunner`].
///
/// Required: chain id, config, registry, signer, store, chain state
/// source, transport.
pub struct ReactorRunnerBuilder {
    chain_id: Option<String>,
    config: Option<ReactorConfig>,
    registry: Option<OracleRegistry>,
    signer: Option<Arc<dyn ValidatorSigner>>,
    store: Option<Arc<dyn KeyValueStore>>,
    chain_state: Option<Arc<dyn ChainStateSource>>,
    transport: Option<Arc<dyn GossipTransport>>,
    channel_capacity: usize,
}

impl Default for ReactorRunnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactorRunnerBuilder {
    pub fn new() -> Self {
        Self {
            chain_id: None,
            config: None,
            registry: None,
            signer: None,
            store: None,
            chain_state: None,
            transport: None,
            channel_capacity: 1024,
        }
    }

    pub fn chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }

    pub fn config(mut self, config: ReactorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn registry(mut self, registry: OracleRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn signer(mut self, signer: Arc<dyn ValidatorSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn chain_state(mut self, chain_state: Arc<dyn ChainStateSource>) -> Self {
        self.chain_state = Some(chain_state);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn GossipTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Event channel capacity (default 1024).
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Build the runner and its handle.
    ///
    /// Blocks (asynchronously) until the host chain state is populated,
    /// retrying on an interval, exactly so a fresh node does not start a
    /// progress loop with no validator set. An override validator missing
    /// from the chain set is a fatal error.
    pub async fn build(self) -> Result<(ReactorRunner, ReactorHandle), RunnerError> {
        let chain_id = self.chain_id.ok_or(RunnerError::MissingField("chain_id"))?;
        let config = self.config.ok_or(RunnerError::MissingField("config"))?;
        let registry = self.registry.ok_or(RunnerError::MissingField("registry"))?;
        let signer = self.signer.ok_or(RunnerError::MissingField("signer"))?;
        let store = self.store.ok_or(RunnerError::MissingField("store"))?;
        let chain_state = self
            .chain_state
            .ok_or(RunnerError::MissingField("chain_state"))?;
        let transport = self
            .transport
            .ok_or(RunnerError::MissingField("transport"))?;

        let state = load_reactor_state(store.as_ref())?;

        let chain_set = wait_for_chain_state(chain_state.as_ref()).await;
        let validators: Arc<dyn ValidatorSource> =
            match resolve_override_set(&config, &chain_set)? {
                Some(override_set) => Arc::new(StaticValidators(override_set)),
                None => Arc::new(ChainValidators::new(Arc::clone(&chain_state), chain_set)),
            };

        let (event_tx, event_rx) = mpsc::channel(self.channel_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let mut machine = Reactor::new(chain_id, &config, registry, signer, validators, state);
        let bootstrap_actions = machine.bootstrap(unix_now());

        let peers = Arc::new(RwLock::new(HashSet::new()));
        let handle = ReactorHandle {
            event_tx: event_tx.clone(),
            peers: Arc::clone(&peers),
            shutdown_tx: Arc::new(parking_lot::Mutex::new(Some(shutdown_tx))),
        };
        let runner = ReactorRunner {
            machine,
            event_rx,
            timers: TimerManager::new(event_tx),
            transport,
            peers,
            store,
            bootstrap_actions,
            shutdown_rx,
        };
        Ok((runner, handle))
    }
}

async fn wait_for_chain_state(chain_state: &dyn ChainStateSource) -> ValidatorSet {
    loop {
        if let Some(set) = chain_state.load_validators() {
            if !set.is_empty() {
                return set;
            }
        }
        error!("host chain state is empty, cannot start the progress loop yet; retrying");
        tokio::time::sleep(PROGRESS_LOOP_START_DELAY).await;
    }
}

/// The event loop owning the reactor state machine.
pub struct ReactorRunner {
    machine: Reactor,
    event_rx: mpsc::Receiver<Event>,
    timers: TimerManager,
    transport: Arc<dyn GossipTransport>,
    peers: Arc<RwLock<HashSet<PeerId>>>,
    store: Arc<dyn KeyValueStore>,
    bootstrap_actions: Vec<Action>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl ReactorRunner {
    /// Drive the reactor until shutdown.
    pub async fn run(mut self) {
        let bootstrap = std::mem::take(&mut self.bootstrap_actions);
        self.execute_actions(bootstrap);

        loop {
            tokio::select! {
                _ = &mut self.shutdown_rx => {
                    info!("reactor runner shutting down");
                    self.timers.cancel_all();
                    break;
                }
                event = self.event_rx.recv() => {
                    let Some(event) = event else { break };
                    self.machine.set_time(unix_now());
                    let actions = self.machine.handle(event);
                    self.execute_actions(actions);
                }
            }
        }
    }

    /// Execute a handler's actions in order.
    ///
    /// A failed persist drops the remainder of the batch: the in-memory
    /// mutation is retained (the next successful save captures it) but
    /// nothing is gossiped on top of unsaved state.
    fn execute_actions(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::PersistState => {
                    if let Err(error) =
                        save_reactor_state(self.store.as_ref(), self.machine.state())
                    {
                        metrics::get().state_persist_failures.inc();
                        error!(%error, "failed to persist reactor state, dropping the rest of the batch");
                        return;
                    }
                }
                Action::Gossip { message, exclude } => self.gossip(message, exclude),
                Action::SetTimer {
                    id,
                    duration,
                    event,
                } => self.timers.set_timer(id, duration, event),
                Action::CancelTimer { id } => self.timers.cancel_timer(&id),
            }
        }
    }

    fn gossip(&self, message: OutboundMessage, exclude: Option<PeerId>) {
        let channel = message.channel();
        let bytes = match encode_message(&message) {
            Ok(bytes) => bytes,
            Err(error) => {
                error!(%error, "failed to encode outbound message");
                return;
            }
        };
        let peers = self.peers.read();
        for peer in peers.iter() {
            if exclude.as_ref() == Some(peer) {
                continue;
            }
            self.transport.send(peer, channel, bytes.clone());
            metrics::get().messages_sent.inc();
        }
    }
}
