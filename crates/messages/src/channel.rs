//! Gossip channel identifiers and descriptors.
//!
//! Channel ids start at 0x50 to stay clear of the host chain's own reactors.
//! Priorities are deliberately low so attestation gossip never outranks core
//! block consensus.

/// Maximum wire message size: 1 MiB.
pub const MAX_MSG_SIZE: usize = 1000 * 1024;

/// The reactor's transport channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GossipChannel {
    /// In-flight vote set gossip.
    VoteSet = 0x50,
    /// Last-committed vote set recovery for lagging peers.
    Maj23 = 0x51,
    /// Proposal-cursor sync.
    ProposalInfoSync = 0x52,
}

impl GossipChannel {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x50 => Some(GossipChannel::VoteSet),
            0x51 => Some(GossipChannel::Maj23),
            0x52 => Some(GossipChannel::ProposalInfoSync),
            _ => None,
        }
    }
}

impl std::fmt::Display for GossipChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GossipChannel::VoteSet => f.write_str("vote-set"),
            GossipChannel::Maj23 => f.write_str("maj23"),
            GossipChannel::ProposalInfoSync => f.write_str("proposal-info-sync"),
        }
    }
}

/// Transport-facing description of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDescriptor {
    pub channel: GossipChannel,
    pub priority: u8,
    pub send_queue_capacity: usize,
    pub recv_message_capacity: usize,
}

/// The channels this reactor registers with the transport.
pub fn channel_descriptors() -> Vec<ChannelDescriptor> {
    vec![
        ChannelDescriptor {
            channel: GossipChannel::Maj23,
            priority: 20,
            send_queue_capacity: 100,
            recv_message_capacity: MAX_MSG_SIZE,
        },
        ChannelDescriptor {
            channel: GossipChannel::VoteSet,
            priority: 25,
            send_queue_capacity: 100,
            recv_message_capacity: MAX_MSG_SIZE,
        },
        ChannelDescriptor {
            channel: GossipChannel::ProposalInfoSync,
            priority: 30,
            send_queue_capacity: 100,
            recv_message_capacity: MAX_MSG_SIZE,
        },
    ]
}
