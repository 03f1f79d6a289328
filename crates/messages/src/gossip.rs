//! Gossip message wrappers.

use crate::channel::GossipChannel;
use attestor_types::{OracleId, ProposalInfo, VoteSet};
use sbor::prelude::BasicSbor;

/// Marker for messages that travel on a fixed gossip channel.
pub trait ChannelMessage {
    fn channel() -> GossipChannel;
}

/// An in-flight vote set, gossiped while votes are still being collected.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct VoteSetMessage {
    pub vote_set: VoteSet,
}

impl ChannelMessage for VoteSetMessage {
    fn channel() -> GossipChannel {
        GossipChannel::VoteSet
    }
}

/// A node's most recent committed vote set, used for lag recovery.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct Maj23Message {
    pub vote_set: VoteSet,
}

impl ChannelMessage for Maj23Message {
    fn channel() -> GossipChannel {
        GossipChannel::Maj23
    }
}

/// Proposal-cursor sync for one oracle.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct ProposalInfoSyncMessage {
    pub oracle_id: OracleId,
    pub proposal_info: ProposalInfo,
}

impl ChannelMessage for ProposalInfoSyncMessage {
    fn channel() -> GossipChannel {
        GossipChannel::ProposalInfoSync
    }
}
