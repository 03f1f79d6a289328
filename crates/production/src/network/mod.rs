//! Network seams: wire codec and the outbound transport trait.

mod codec;
mod transport;

pub use codec::{decode_message, encode_message, CodecError, InboundMessage, WIRE_VERSION};
pub use transport::GossipTransport;
