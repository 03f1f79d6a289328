//! The reactor state machine.
//!
//! # State Machine Flow
//!
//! 1. **Progress tick** → archive expired vote sets, rotate proposers,
//!    propose where this node is the designated proposer
//! 2. **Vote set received** → merge or replace the local set, add our own
//!    vote, rebroadcast
//! 3. **Commit deadline** → converged: one validator submits the
//!    aggregate; either way the round is retired
//! 4. **Recovery message received** → adopt a peer's committed vote set to
//!    catch up on the nonce
//!
//! All handlers run to completion on the single owning event loop; there
//! is no in-handler suspension and no shared-state locking.

use crate::config::{
    ReactorConfig, BASE_PROPOSAL_DELAY, COMMIT_EXECUTION_BUFFER_SECS, EXPIRES_IN_FOR_SYNC_SECS,
    EXPIRES_IN_SECS, MAX_ALLOWED_TIME_DRIFT_SECS, MAX_CONTEXT_SIZE, PROGRESS_INTERVAL_SECS,
};
use crate::registry::{Oracle, OracleRegistry};
use crate::rotation::next_proposal_info;
use crate::state::ReactorState;
use attestor_core::{Action, Event, OutboundMessage, StateMachine, TimerId};
use attestor_messages::{Maj23Message, VoteSetMessage};
use attestor_types::{
    IndividualExecution, MessageHash, Nonce, OracleId, PeerId, ProposalInfo, SigningThreshold,
    ValidatorSet, ValidatorSigner, ValidatorSource, VotePayload, VoteSet, VoteSetId,
    VoteSetValidation, VoteType,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Outcome of weighing a remote vote set against the local one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VoteSetComparison {
    /// Same identity: adopt the remote's verified slots.
    Merge,
    /// The remote is more trustworthy: install it.
    Replace,
    /// The local set (or nothing at all) wins; drop the remote.
    KeepLocal,
}

/// Result of trying to cast our own vote on the current vote set.
enum OwnVote {
    Added,
    NotNeeded,
    Failed,
}

/// The reactor: owner of the attestation state machine.
pub struct Reactor {
    chain_id: String,
    threshold: SigningThreshold,
    /// Whether an override validator set is in force. An override set
    /// seeds an uninitialized rotation, which is how a fresh deployment
    /// bootstraps its first proposer.
    override_in_force: bool,
    registry: OracleRegistry,
    signer: Arc<dyn ValidatorSigner>,
    validators: Arc<dyn ValidatorSource>,
    state: ReactorState,
    /// Wall-clock time, set by the runner before each handle call.
    now: Duration,
}

impl Reactor {
    pub fn new(
        chain_id: impl Into<String>,
        config: &ReactorConfig,
        registry: OracleRegistry,
        signer: Arc<dyn ValidatorSigner>,
        validators: Arc<dyn ValidatorSource>,
        state: ReactorState,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            threshold: config.signing_threshold,
            override_in_force: config.override_validators.is_some(),
            registry,
            signer,
            validators,
            state,
            now: Duration::ZERO,
        }
    }

    /// The durable state record, for persistence.
    pub fn state(&self) -> &ReactorState {
        &self.state
    }

    /// Startup: discard rounds that expired while the node was down and
    /// arm the first progress tick.
    pub fn bootstrap(&mut self, now: Duration) -> Vec<Action> {
        self.now = now;
        let dropped = self
            .state
            .drop_expired_vote_sets(self.now_secs(), EXPIRES_IN_SECS);
        if dropped > 0 {
            info!(dropped, "discarded expired in-flight vote sets at startup");
        }
        vec![Action::PersistState, self.next_progress_timer()]
    }

    fn now_secs(&self) -> i64 {
        self.now.as_secs() as i64
    }

    fn our_index(&self, set: &ValidatorSet) -> Option<usize> {
        set.position_of(&self.signer.address())
    }

    /// Sleep until the next multiple of the progress interval from the
    /// epoch, so ticks land at almost the same instant across all nodes,
    /// then stagger by validator index so the designated proposer's vote
    /// set arrives at peers before any rival proposal.
    fn next_progress_timer(&self) -> Action {
        let set = self.validators.validator_set();
        let base = PROGRESS_INTERVAL_SECS - self.now_secs() % PROGRESS_INTERVAL_SECS;
        let stagger = match self.our_index(&set) {
            Some(index) => BASE_PROPOSAL_DELAY * (index as u32 + 1),
            None => BASE_PROPOSAL_DELAY,
        };
        Action::SetTimer {
            id: TimerId::Progress,
            duration: Duration::from_secs(base as u64) + stagger,
            event: Event::ProgressTick,
        }
    }

    fn commit_timer(&self, oracle_id: &OracleId, vote_set: &VoteSet) -> Action {
        let deadline =
            vote_set.creation_time + EXPIRES_IN_FOR_SYNC_SECS + COMMIT_EXECUTION_BUFFER_SECS;
        Action::SetTimer {
            id: TimerId::Commit(oracle_id.clone()),
            duration: Duration::from_secs(deadline.saturating_sub(self.now_secs()).max(0) as u64),
            event: Event::CommitDeadline {
                oracle_id: oracle_id.clone(),
                vote_set_id: vote_set.id.clone(),
            },
        }
    }

    fn validation(&self, check_expiration: Option<i64>) -> VoteSetValidation<'_> {
        VoteSetValidation {
            chain_id: &self.chain_id,
            max_context_size: MAX_CONTEXT_SIZE,
            max_future_drift: MAX_ALLOWED_TIME_DRIFT_SECS,
            check_expiration,
            now: self.now_secs(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Progress tick
    // ═══════════════════════════════════════════════════════════════════

    fn on_progress_tick(&mut self) -> Vec<Action> {
        let mut actions = vec![self.next_progress_timer()];
        let set = self.validators.validator_set();
        let own_index = self.our_index(&set);
        let now = self.now_secs();

        // In ascending oracle-id order: archive what expired, rotate the
        // cursor for every oracle with a free slot.
        let mut eligible = Vec::new();
        for oracle_id in self.registry.ids() {
            if let Some(current) = self.state.current_vote_sets.get(&oracle_id) {
                if !current.is_expired(now, EXPIRES_IN_SECS) {
                    info!(%oracle_id, "previous attestation round still pending");
                    continue;
                }
                info!(%oracle_id, "archiving expired attestation round");
                if let Some(expired) = self.state.current_vote_sets.remove(&oracle_id) {
                    self.state
                        .previous_timed_out_vote_sets
                        .insert(oracle_id.clone(), expired);
                }
            }

            // An uninitialized rotation has no proposer; an override set
            // seeds it from its own ordering so the deployment can
            // bootstrap its first round.
            let next = next_proposal_info(&oracle_id, &self.state, &set).or_else(|| {
                self.override_in_force
                    .then(|| ProposalInfo::new(set.addresses(), 0))
            });
            match next {
                Some(info) => {
                    self.state
                        .current_proposal_info
                        .insert(oracle_id.clone(), info);
                }
                None => {
                    self.state.current_proposal_info.remove(&oracle_id);
                }
            }
            eligible.push(oracle_id);
        }

        actions.push(Action::PersistState);

        let Some(own_index) = own_index else {
            return actions;
        };
        let our_address = self.signer.address();
        for oracle_id in eligible {
            let ours = self
                .state
                .current_proposal_info
                .get(&oracle_id)
                .and_then(|info| info.current_proposer())
                .is_some_and(|proposer| *proposer == our_address);
            if ours {
                self.propose(&oracle_id, &set, own_index, &mut actions);
            }
        }
        actions
    }

    // ═══════════════════════════════════════════════════════════════════
    // Propose
    // ═══════════════════════════════════════════════════════════════════

    fn propose(
        &mut self,
        oracle_id: &OracleId,
        set: &ValidatorSet,
        own_index: usize,
        actions: &mut Vec<Action>,
    ) {
        let Some(oracle) = self.registry.get(oracle_id) else {
            return;
        };

        let context = match oracle.prepare_context() {
            Ok(Some(context)) => context,
            Ok(None) => {
                info!(%oracle_id, "oracle declined to execute this round");
                return;
            }
            Err(error) => {
                warn!(%oracle_id, %error, "prepare_context failed");
                return;
            }
        };
        if context.len() > MAX_CONTEXT_SIZE {
            warn!(%oracle_id, size = context.len(), "execution context exceeds the size limit");
            return;
        }

        let (message, oracle_signature) = match oracle.message_and_signature(&context) {
            Ok(result) => result,
            Err(error) => {
                warn!(%oracle_id, %error, "message_and_signature failed");
                return;
            }
        };
        let hash = MessageHash::digest(&message);
        if let Err(error) = oracle.map_message(&context, &hash, &message) {
            warn!(%oracle_id, %error, "map_message failed");
            return;
        }

        let nonce = self.state.current_nonce(oracle_id);
        let execution = IndividualExecution::agree(hash, oracle_signature);
        let payload = VotePayload::new(oracle_id.clone(), &execution, own_index, set.len());
        let vote_set = match VoteSet::create(
            VoteSetId::generate(),
            nonce,
            self.chain_id.clone(),
            self.now_secs(),
            EXPIRES_IN_SECS,
            own_index,
            context,
            payload,
            self.signer.as_ref(),
            set,
            self.state.current_proposal_info.get(oracle_id).cloned(),
        ) {
            Ok(vote_set) => vote_set,
            Err(error) => {
                warn!(%oracle_id, %error, "failed to build vote set");
                return;
            }
        };

        info!(%oracle_id, %nonce, id = %vote_set.id, "proposing attestation round");

        // We may be the only validator; our own Agree already satisfies
        // the threshold. Submit and commit immediately, symmetrically with
        // the commit deadline handler.
        if vote_set.is_agree(self.threshold, set) {
            self.submit(&oracle, &vote_set);
            self.commit_converged(oracle_id, &vote_set, set);
            actions.push(Action::PersistState);
            return;
        }

        actions.push(self.commit_timer(oracle_id, &vote_set));
        self.state
            .current_vote_sets
            .insert(oracle_id.clone(), vote_set.clone());
        actions.push(Action::PersistState);
        actions.push(Action::Gossip {
            message: OutboundMessage::VoteSet(VoteSetMessage { vote_set }),
            exclude: None,
        });
    }

    /// Hand the aggregate to the oracle, with fresh copies of everything:
    /// the callback may retain what it receives.
    fn submit(&self, oracle: &Arc<dyn Oracle>, vote_set: &VoteSet) {
        info!(
            oracle_id = %vote_set.oracle_id(),
            nonce = %vote_set.nonce,
            agree_votes = vote_set.number_of_agree_votes(),
            "submitting multi-signed attestation"
        );
        if let Err(error) = oracle.submit_multi_signed_message(
            vote_set.execution_context.clone(),
            *vote_set.message_hash(),
            vote_set.payload.response.oracle_signatures.clone(),
        ) {
            warn!(oracle_id = %vote_set.oracle_id(), %error, "submit_multi_signed_message failed");
        }
    }

    /// Retire a converged vote set: advance the nonce, remember the set
    /// that signed it, record it for late joiners.
    fn commit_converged(&mut self, oracle_id: &OracleId, vote_set: &VoteSet, set: &ValidatorSet) {
        let next_nonce = self.state.current_nonce(oracle_id).next();
        self.state.current_nonces.insert(oracle_id.clone(), next_nonce);
        self.state.previous_validator_set = Some(set.clone());
        self.state
            .previous_maj23_vote_sets
            .insert(oracle_id.clone(), vote_set.clone());
        self.state.current_vote_sets.remove(oracle_id);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Commit deadline
    // ═══════════════════════════════════════════════════════════════════

    fn on_commit_deadline(&mut self, oracle_id: OracleId, vote_set_id: VoteSetId) -> Vec<Action> {
        let Some(current) = self.state.current_vote_sets.get(&oracle_id).cloned() else {
            debug!(%oracle_id, "commit deadline for a retired vote set, ignoring");
            return vec![];
        };
        if current.id != vote_set_id {
            debug!(%oracle_id, "commit deadline for a replaced vote set, ignoring");
            return vec![];
        }
        let Some(oracle) = self.registry.get(&oracle_id) else {
            error!(%oracle_id, "oracle vanished from the registry");
            return vec![];
        };

        let set = self.validators.validator_set();

        // Expiration is deliberately not checked here: the deadline sits
        // past the sync bound by construction.
        if let Err(error) = current.validate(&self.validation(None), &set, &self.registry) {
            error!(%oracle_id, %error, "current vote set failed re-validation at commit time");
            return vec![];
        }

        let mut actions = Vec::new();

        // Only an agree-converged round commits. A round that converged on
        // disagreement (or never converged at all) is archived without
        // advancing the nonce: there is nothing to attest.
        if !current.is_agree(self.threshold, &set) {
            info!(
                %oracle_id,
                votes = current.number_of_votes(),
                agree_votes = current.number_of_agree_votes(),
                converged = current.has_converged(self.threshold, &set),
                "round did not reach the agree threshold, archiving"
            );
            self.state.current_vote_sets.remove(&oracle_id);
            self.state
                .previous_timed_out_vote_sets
                .insert(oracle_id.clone(), current);
            actions.push(Action::PersistState);

            // Propagate our last committed vote set to repair any drift
            // that produced the failed round.
            if let Some(previous) = self.state.previous_maj23_vote_sets.get(&oracle_id) {
                actions.push(Action::Gossip {
                    message: OutboundMessage::Maj23(Maj23Message {
                        vote_set: previous.clone(),
                    }),
                    exclude: None,
                });
            }
            return actions;
        }

        // Exactly one validator submits: the Agree voter whose dense rank
        // matches the nonce. Validators outside the agree group (or
        // outside the set entirely) just retire the round.
        if let Some(own_index) = self.our_index(&set) {
            if let Ok(rank) = current.agree_rank_of(own_index) {
                let agree_votes = current.number_of_agree_votes() as i64;
                let nonce = self.state.current_nonce(&oracle_id);
                if nonce.0.rem_euclid(agree_votes) == rank as i64 {
                    self.submit(&oracle, &current);
                }
            }
        }

        self.commit_converged(&oracle_id, &current, &set);
        actions.push(Action::PersistState);
        actions
    }

    // ═══════════════════════════════════════════════════════════════════
    // Inbound vote sets
    // ═══════════════════════════════════════════════════════════════════

    fn on_vote_set(&mut self, from: PeerId, remote: VoteSet) -> Vec<Action> {
        let set = self.validators.validator_set();

        if let Err(error) = remote.validate(
            &self.validation(Some(EXPIRES_IN_FOR_SYNC_SECS)),
            &set,
            &self.registry,
        ) {
            warn!(%from, %error, "invalid vote set received, ignoring");
            return vec![];
        }

        let oracle_id = remote.oracle_id().clone();
        let current_nonce = self.state.current_nonce(&oracle_id);
        self.state
            .current_nonces
            .entry(oracle_id.clone())
            .or_insert(current_nonce);

        if remote.nonce < current_nonce {
            debug!(%oracle_id, %current_nonce, remote_nonce = %remote.nonce, "stale vote set, ignoring");
            return vec![];
        }

        let mut actions = Vec::new();
        let mut changed = false;
        let mut own_contribution = false;

        let comparison = compare_vote_sets(
            &remote,
            self.state.current_vote_sets.get(&oracle_id),
            current_nonce,
            self.threshold,
            &set,
        );
        match comparison {
            VoteSetComparison::Merge => {
                let Some(current) = self.state.current_vote_sets.get_mut(&oracle_id) else {
                    return vec![];
                };
                match current.merge(&set, &remote) {
                    Ok(merged) => changed = merged,
                    Err(error) => {
                        warn!(%oracle_id, %error, "unable to merge remote vote set");
                        return vec![];
                    }
                }
            }
            VoteSetComparison::Replace => {
                if self.state.current_vote_sets.contains_key(&oracle_id) {
                    actions.push(Action::CancelTimer {
                        id: TimerId::Commit(oracle_id.clone()),
                    });
                }
                debug!(%oracle_id, id = %remote.id, nonce = %remote.nonce, "adopting remote vote set");
                actions.push(self.commit_timer(&oracle_id, &remote));
                self.state
                    .current_nonces
                    .insert(oracle_id.clone(), remote.nonce);
                match &remote.proposal_info {
                    Some(info) => {
                        self.state
                            .current_proposal_info
                            .insert(oracle_id.clone(), info.clone());
                    }
                    None => {
                        self.state.current_proposal_info.remove(&oracle_id);
                    }
                }
                self.state
                    .current_vote_sets
                    .insert(oracle_id.clone(), remote);
                changed = true;
            }
            VoteSetComparison::KeepLocal => {
                if !self.state.current_vote_sets.contains_key(&oracle_id) {
                    return vec![];
                }
                // The local set stands; still fall through in case our own
                // vote is missing from it.
            }
        }

        match self.try_add_own_vote(&oracle_id, &set) {
            OwnVote::Added => {
                changed = true;
                own_contribution = true;
            }
            OwnVote::NotNeeded => {}
            OwnVote::Failed => {
                // Keep what we adopted, skip the announcement.
                if changed {
                    actions.push(Action::PersistState);
                }
                return actions;
            }
        }

        // If our vote set hasn't changed there is nothing to announce; we
        // already did when it last changed.
        if !changed {
            return actions;
        }

        actions.push(Action::PersistState);
        if let Some(current) = self.state.current_vote_sets.get(&oracle_id) {
            // The sender already holds everything we merely absorbed from
            // it; echo back only when we added our own vote.
            let exclude = if own_contribution { None } else { Some(from) };
            actions.push(Action::Gossip {
                message: OutboundMessage::VoteSet(VoteSetMessage {
                    vote_set: current.clone(),
                }),
                exclude,
            });
        }
        actions
    }

    /// Execute the oracle against the current vote set's context and cast
    /// our vote: Agree when our hash matches the proposed one, Disagree
    /// otherwise. The message mapping is recorded either way.
    fn try_add_own_vote(&mut self, oracle_id: &OracleId, set: &ValidatorSet) -> OwnVote {
        let Some(own_index) = self.our_index(set) else {
            return OwnVote::NotNeeded;
        };
        let (context, proposed_hash) = {
            let Some(current) = self.state.current_vote_sets.get(oracle_id) else {
                return OwnVote::NotNeeded;
            };
            if current.has_already_signed(own_index) {
                return OwnVote::NotNeeded;
            }
            (current.execution_context.clone(), *current.message_hash())
        };
        let Some(oracle) = self.registry.get(oracle_id) else {
            return OwnVote::NotNeeded;
        };

        let (message, oracle_signature) = match oracle.message_and_signature(&context) {
            Ok(result) => result,
            Err(error) => {
                warn!(%oracle_id, %error, "message_and_signature failed while voting");
                return OwnVote::Failed;
            }
        };
        let our_hash = MessageHash::digest(&message);
        if let Err(error) = oracle.map_message(&context, &our_hash, &message) {
            warn!(%oracle_id, %error, "map_message failed while voting");
            return OwnVote::Failed;
        }

        let nonce = self.state.current_nonce(oracle_id);
        let signer = Arc::clone(&self.signer);
        let Some(current) = self.state.current_vote_sets.get_mut(oracle_id) else {
            return OwnVote::NotNeeded;
        };
        let result = if our_hash == proposed_hash {
            current.add_vote(
                nonce,
                &IndividualExecution::agree(our_hash, oracle_signature),
                set,
                own_index,
                VoteType::Agree,
                signer.as_ref(),
            )
        } else {
            debug!(%oracle_id, "our message hash differs from the proposal, disagreeing");
            current.add_vote(
                nonce,
                &IndividualExecution::disagree(our_hash),
                set,
                own_index,
                VoteType::Disagree,
                signer.as_ref(),
            )
        };
        match result {
            Ok(()) => OwnVote::Added,
            Err(error) => {
                warn!(%oracle_id, %error, "unable to add our vote");
                OwnVote::Failed
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Inbound recovery messages
    // ═══════════════════════════════════════════════════════════════════

    fn on_maj23(&mut self, from: PeerId, remote: VoteSet) -> Vec<Action> {
        let current_set = self.validators.validator_set();
        let now = self.now_secs();

        // The signer set may have rotated since the remote committed; a
        // vote set that fails against the current set may still validate
        // against the set that actually signed it.
        let signing_set = if remote
            .validate(&self.validation(None), &current_set, &self.registry)
            .is_ok()
        {
            current_set
        } else {
            match &self.state.previous_validator_set {
                Some(previous)
                    if remote
                        .validate(&self.validation(None), previous, &self.registry)
                        .is_ok() =>
                {
                    previous.clone()
                }
                _ => {
                    warn!(%from, "invalid recovery vote set, ignoring");
                    return vec![];
                }
            }
        };

        // Active rounds belong on the vote-set channel.
        if !remote.is_expired(now, EXPIRES_IN_SECS) {
            warn!(%from, "active vote set on the recovery channel, ignoring");
            return vec![];
        }
        if !remote.has_converged(self.threshold, &signing_set) {
            warn!(%from, "non-converged vote set on the recovery channel, ignoring");
            return vec![];
        }

        let oracle_id = remote.oracle_id().clone();
        let current_nonce = self.state.current_nonce(&oracle_id);

        if remote.nonce < current_nonce {
            // One behind can fill a missing previous record; anything
            // older is just stale.
            if remote.nonce == current_nonce.previous()
                && !self.state.previous_maj23_vote_sets.contains_key(&oracle_id)
            {
                debug!(%oracle_id, nonce = %remote.nonce, "backfilling previous committed vote set");
                self.adopt_committed(&oracle_id, &remote, signing_set, false);
                return vec![Action::PersistState];
            }
            return vec![];
        }

        // The remote committed nonce `x`; our next proposal is `x + 1`.
        info!(%oracle_id, nonce = %remote.nonce, "catching up from a peer's committed vote set");
        self.adopt_committed(&oracle_id, &remote, signing_set, true);
        vec![
            Action::PersistState,
            Action::Gossip {
                message: OutboundMessage::Maj23(Maj23Message { vote_set: remote }),
                exclude: Some(from),
            },
        ]
    }

    fn adopt_committed(
        &mut self,
        oracle_id: &OracleId,
        remote: &VoteSet,
        signing_set: ValidatorSet,
        advance_nonce: bool,
    ) {
        if advance_nonce {
            self.state
                .current_nonces
                .insert(oracle_id.clone(), remote.nonce.next());
        }
        self.state
            .previous_maj23_vote_sets
            .insert(oracle_id.clone(), remote.clone());
        self.state.previous_validator_set = Some(signing_set);
        match &remote.proposal_info {
            Some(info) => {
                self.state
                    .current_proposal_info
                    .insert(oracle_id.clone(), info.clone());
            }
            None => {
                self.state.current_proposal_info.remove(oracle_id);
            }
        }
    }
}

impl StateMachine for Reactor {
    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::ProgressTick => self.on_progress_tick(),
            Event::CommitDeadline {
                oracle_id,
                vote_set_id,
            } => self.on_commit_deadline(oracle_id, vote_set_id),
            Event::VoteSetReceived { from, vote_set } => self.on_vote_set(from, vote_set),
            Event::Maj23Received { from, vote_set } => self.on_maj23(from, vote_set),
        }
    }
}

/// Weigh a remote vote set against the local one for the same oracle.
///
/// The ladder, most decisive first: a missing local set is replaced by a
/// remote at our nonce or by any converged remote; identical ids merge; a
/// converged side beats a non-converged one; two non-converged rivals keep
/// the local set. Among converged rivals an agree-converged side beats a
/// merely converged one; otherwise more total votes win, then more agree
/// votes, then the older creation time. An exact tie keeps the local set.
fn compare_vote_sets(
    remote: &VoteSet,
    current: Option<&VoteSet>,
    current_nonce: Nonce,
    threshold: SigningThreshold,
    set: &ValidatorSet,
) -> VoteSetComparison {
    let Some(current) = current else {
        if remote.nonce == current_nonce || remote.has_converged(threshold, set) {
            return VoteSetComparison::Replace;
        }
        return VoteSetComparison::KeepLocal;
    };

    if current.id == remote.id {
        return VoteSetComparison::Merge;
    }

    match (
        current.has_converged(threshold, set),
        remote.has_converged(threshold, set),
    ) {
        (true, false) => return VoteSetComparison::KeepLocal,
        (false, true) => return VoteSetComparison::Replace,
        // A rival that has converged no better than ours does not unseat
        // it; one of the two rounds will converge or expire.
        (false, false) => return VoteSetComparison::KeepLocal,
        (true, true) => {}
    }

    let current_agree = current.is_agree(threshold, set);
    let remote_agree = remote.is_agree(threshold, set);
    match (current_agree, remote_agree) {
        (true, false) => return VoteSetComparison::KeepLocal,
        (false, true) => return VoteSetComparison::Replace,
        _ => {}
    }

    match remote.number_of_votes().cmp(&current.number_of_votes()) {
        std::cmp::Ordering::Greater => return VoteSetComparison::Replace,
        std::cmp::Ordering::Less => return VoteSetComparison::KeepLocal,
        std::cmp::Ordering::Equal => {}
    }
    match remote
        .number_of_agree_votes()
        .cmp(&current.number_of_agree_votes())
    {
        std::cmp::Ordering::Greater => return VoteSetComparison::Replace,
        std::cmp::Ordering::Less => return VoteSetComparison::KeepLocal,
        std::cmp::Ordering::Equal => {}
    }
    // The older proposal wins; on an exact tie we trust our own.
    if remote.creation_time < current.creation_time {
        VoteSetComparison::Replace
    } else {
        VoteSetComparison::KeepLocal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attestor_types::{Keypair, Nonce, Signature, ValidatorInfo};

    fn fixture(n: u8) -> (Vec<Keypair>, ValidatorSet) {
        let pairs: Vec<Keypair> = (1..=n).map(|i| Keypair::from_seed([i; 32])).collect();
        let set = ValidatorSet::new(
            pairs
                .iter()
                .map(|p| ValidatorInfo {
                    address: p.address(),
                    public_key: p.public_key(),
                    power: 1,
                })
                .collect(),
        );
        (pairs, set)
    }

    fn signer_at<'a>(pairs: &'a [Keypair], set: &ValidatorSet, index: usize) -> &'a Keypair {
        pairs
            .iter()
            .find(|p| set.position_of(&p.address()) == Some(index))
            .unwrap()
    }

    fn proposal(
        pairs: &[Keypair],
        set: &ValidatorSet,
        proposer: usize,
        creation_time: i64,
        agree_voters: &[usize],
        disagree_voters: &[usize],
    ) -> VoteSet {
        let hash = MessageHash::digest(b"m");
        let execution = IndividualExecution::agree(hash, Signature(vec![0xB0]));
        let payload = VotePayload::new(OracleId::new("feed"), &execution, proposer, set.len());
        let mut vote_set = VoteSet::create(
            VoteSetId::generate(),
            Nonce::STARTING,
            "chain".into(),
            creation_time,
            51,
            proposer,
            vec![],
            payload,
            signer_at(pairs, set, proposer),
            set,
            None,
        )
        .unwrap();
        for &index in agree_voters {
            let execution = IndividualExecution::agree(hash, Signature(vec![0xB0 + index as u8]));
            vote_set
                .add_vote(
                    Nonce::STARTING,
                    &execution,
                    set,
                    index,
                    VoteType::Agree,
                    signer_at(pairs, set, index),
                )
                .unwrap();
        }
        for &index in disagree_voters {
            let execution = IndividualExecution::disagree(MessageHash::digest(b"other"));
            vote_set
                .add_vote(
                    Nonce::STARTING,
                    &execution,
                    set,
                    index,
                    VoteType::Disagree,
                    signer_at(pairs, set, index),
                )
                .unwrap();
        }
        vote_set
    }

    #[test]
    fn missing_local_set_adopts_matching_nonce() {
        let (pairs, set) = fixture(3);
        let remote = proposal(&pairs, &set, 0, 1_000, &[], &[]);
        assert_eq!(
            compare_vote_sets(&remote, None, Nonce::STARTING, SigningThreshold::Maj23, &set),
            VoteSetComparison::Replace
        );
        assert_eq!(
            compare_vote_sets(&remote, None, Nonce(5), SigningThreshold::Maj23, &set),
            VoteSetComparison::KeepLocal
        );
    }

    #[test]
    fn missing_local_set_adopts_converged_remote_at_any_nonce() {
        let (pairs, set) = fixture(3);
        let converged = proposal(&pairs, &set, 0, 1_000, &[1, 2], &[]);
        assert!(converged.has_converged(SigningThreshold::Maj23, &set));
        assert_eq!(
            compare_vote_sets(&converged, None, Nonce(5), SigningThreshold::Maj23, &set),
            VoteSetComparison::Replace
        );
    }

    #[test]
    fn same_id_merges() {
        let (pairs, set) = fixture(3);
        let local = proposal(&pairs, &set, 0, 1_000, &[], &[]);
        let remote = local.clone();
        assert_eq!(
            compare_vote_sets(
                &remote,
                Some(&local),
                Nonce::STARTING,
                SigningThreshold::Maj23,
                &set
            ),
            VoteSetComparison::Merge
        );
    }

    #[test]
    fn converged_side_wins() {
        let (pairs, set) = fixture(3);
        let local = proposal(&pairs, &set, 0, 1_000, &[], &[]);
        let remote = proposal(&pairs, &set, 1, 1_100, &[0, 2], &[]);
        assert_eq!(
            compare_vote_sets(
                &remote,
                Some(&local),
                Nonce::STARTING,
                SigningThreshold::Maj23,
                &set
            ),
            VoteSetComparison::Replace
        );
        assert_eq!(
            compare_vote_sets(
                &local,
                Some(&remote),
                Nonce::STARTING,
                SigningThreshold::Maj23,
                &set
            ),
            VoteSetComparison::KeepLocal
        );
    }

    // Two non-converged rivals never unseat each other, no matter their
    // vote counts or ages; the round resolves through convergence or
    // expiry.
    #[test]
    fn non_converged_rivals_keep_local() {
        let (pairs, set) = fixture(4);
        let older = proposal(&pairs, &set, 0, 1_000, &[], &[]);
        let newer_richer = proposal(&pairs, &set, 1, 1_005, &[2], &[]);
        assert!(!newer_richer.has_converged(SigningThreshold::Maj23, &set));
        assert_eq!(
            compare_vote_sets(
                &newer_richer,
                Some(&older),
                Nonce::STARTING,
                SigningThreshold::Maj23,
                &set
            ),
            VoteSetComparison::KeepLocal
        );
        assert_eq!(
            compare_vote_sets(
                &older,
                Some(&newer_richer),
                Nonce::STARTING,
                SigningThreshold::Maj23,
                &set
            ),
            VoteSetComparison::KeepLocal
        );
    }

    #[test]
    fn converged_tie_breaks_prefer_votes_then_agreement_then_age() {
        let (pairs, set) = fixture(4);

        // Both agree-converged; the fuller set wins.
        let three_votes = proposal(&pairs, &set, 0, 1_000, &[1, 2], &[]);
        let four_votes = proposal(&pairs, &set, 1, 1_005, &[0, 2, 3], &[]);
        assert!(three_votes.is_agree(SigningThreshold::Maj23, &set));
        assert!(four_votes.is_agree(SigningThreshold::Maj23, &set));
        assert_eq!(
            compare_vote_sets(
                &four_votes,
                Some(&three_votes),
                Nonce::STARTING,
                SigningThreshold::Maj23,
                &set
            ),
            VoteSetComparison::Replace
        );
        assert_eq!(
            compare_vote_sets(
                &three_votes,
                Some(&four_votes),
                Nonce::STARTING,
                SigningThreshold::Maj23,
                &set
            ),
            VoteSetComparison::KeepLocal
        );

        // Equal totals, neither agree-converged: more agree votes win.
        let two_agree = proposal(&pairs, &set, 0, 1_000, &[1], &[2, 3]);
        let one_agree = proposal(&pairs, &set, 1, 1_000, &[], &[0, 2, 3]);
        assert!(!two_agree.is_agree(SigningThreshold::Maj23, &set));
        assert!(!one_agree.is_agree(SigningThreshold::Maj23, &set));
        assert_eq!(
            compare_vote_sets(
                &two_agree,
                Some(&one_agree),
                Nonce::STARTING,
                SigningThreshold::Maj23,
                &set
            ),
            VoteSetComparison::Replace
        );

        // Votes and agreement tied: the older round wins.
        let older = proposal(&pairs, &set, 0, 1_000, &[1, 2], &[]);
        let newer = proposal(&pairs, &set, 1, 1_005, &[2, 3], &[]);
        assert_eq!(
            compare_vote_sets(
                &older,
                Some(&newer),
                Nonce::STARTING,
                SigningThreshold::Maj23,
                &set
            ),
            VoteSetComparison::Replace
        );
        assert_eq!(
            compare_vote_sets(
                &newer,
                Some(&older),
                Nonce::STARTING,
                SigningThreshold::Maj23,
                &set
            ),
            VoteSetComparison::KeepLocal
        );

        // Exact tie keeps the local set.
        let twin_a = proposal(&pairs, &set, 0, 1_000, &[1, 2], &[]);
        let twin_b = proposal(&pairs, &set, 1, 1_000, &[2, 3], &[]);
        assert_eq!(
            compare_vote_sets(
                &twin_a,
                Some(&twin_b),
                Nonce::STARTING,
                SigningThreshold::Maj23,
                &set
            ),
            VoteSetComparison::KeepLocal
        );
    }
}
