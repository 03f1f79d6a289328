//! The outbound transport seam.

use attestor_messages::GossipChannel;
use attestor_types::PeerId;

/// Where encoded messages go.
///
/// The actual P2P layer (peer discovery, framing, multiplexing) belongs to
/// the host; the reactor only needs fire-and-forget sends to named peers.
/// Implementations queue per the channel descriptors and drop on overflow.
pub trait GossipTransport: Send + Sync {
    fn send(&self, peer: &PeerId, channel: GossipChannel, bytes: Vec<u8>);
}
