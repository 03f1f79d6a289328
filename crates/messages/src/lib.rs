//! Network messages for the attestation reactor.

mod channel;
mod gossip;

pub use channel::{channel_descriptors, ChannelDescriptor, GossipChannel, MAX_MSG_SIZE};
pub use gossip::{ChannelMessage, Maj23Message, ProposalInfoSyncMessage, VoteSetMessage};
