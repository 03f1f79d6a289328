//! Outbound message types for network communication.

use attestor_messages::{ChannelMessage, GossipChannel, Maj23Message, VoteSetMessage};

/// Outbound network messages.
///
/// These are the messages a node can send to its peers. The runner handles
/// the actual network I/O.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    /// An in-flight vote set.
    VoteSet(VoteSetMessage),

    /// The last committed vote set, for lag recovery.
    Maj23(Maj23Message),
}

impl OutboundMessage {
    /// The channel this message travels on.
    pub fn channel(&self) -> GossipChannel {
        match self {
            OutboundMessage::VoteSet(_) => VoteSetMessage::channel(),
            OutboundMessage::Maj23(_) => Maj23Message::channel(),
        }
    }

    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::VoteSet(_) => "VoteSet",
            OutboundMessage::Maj23(_) => "Maj23",
        }
    }
}
