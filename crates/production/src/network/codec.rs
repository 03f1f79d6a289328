//! Message encoding and decoding for network transport.
//!
//! # Wire Format
//!
//! ```text
//! [version: u8][payload: SBOR-encoded message]
//! ```
//!
//! The message type is determined by the channel the bytes arrived on, not
//! by a field in the message. The encoding is deterministic, so canonical
//! signed bytes are stable across nodes and versions.

use attestor_core::OutboundMessage;
use attestor_messages::{
    GossipChannel, Maj23Message, ProposalInfoSyncMessage, VoteSetMessage, MAX_MSG_SIZE,
};
use thiserror::Error;

/// Current wire format version.
pub const WIRE_VERSION: u8 = 1;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unknown wire version: {0}")]
    UnknownVersion(u8),
    #[error("message too short")]
    MessageTooShort,
    #[error("message of {0} bytes exceeds the channel capacity")]
    MessageTooLarge(usize),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
}

/// A decoded inbound message, tagged by its channel.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    VoteSet(VoteSetMessage),
    Maj23(Maj23Message),
    /// Declared for wire compatibility; the reactor logs and drops these.
    ProposalInfoSync(ProposalInfoSyncMessage),
}

/// Encode an outbound message to wire format.
pub fn encode_message(message: &OutboundMessage) -> Result<Vec<u8>, CodecError> {
    let payload = match message {
        OutboundMessage::VoteSet(m) => {
            sbor::basic_encode(m).map_err(|e| CodecError::Encode(format!("{e:?}")))?
        }
        OutboundMessage::Maj23(m) => {
            sbor::basic_encode(m).map_err(|e| CodecError::Encode(format!("{e:?}")))?
        }
    };
    let mut bytes = Vec::with_capacity(1 + payload.len());
    bytes.push(WIRE_VERSION);
    bytes.extend(payload);
    if bytes.len() > MAX_MSG_SIZE {
        return Err(CodecError::MessageTooLarge(bytes.len()));
    }
    Ok(bytes)
}

/// Decode a message from wire format; the channel determines the type.
pub fn decode_message(channel: GossipChannel, data: &[u8]) -> Result<InboundMessage, CodecError> {
    if data.len() > MAX_MSG_SIZE {
        return Err(CodecError::MessageTooLarge(data.len()));
    }
    let Some((&version, payload)) = data.split_first() else {
        return Err(CodecError::MessageTooShort);
    };
    if version != WIRE_VERSION {
        return Err(CodecError::UnknownVersion(version));
    }

    match channel {
        GossipChannel::VoteSet => {
            let message: VoteSetMessage = sbor::basic_decode(payload)
                .map_err(|e| CodecError::Decode(format!("{e:?}")))?;
            Ok(InboundMessage::VoteSet(message))
        }
        GossipChannel::Maj23 => {
            let message: Maj23Message = sbor::basic_decode(payload)
                .map_err(|e| CodecError::Decode(format!("{e:?}")))?;
            Ok(InboundMessage::Maj23(message))
        }
        GossipChannel::ProposalInfoSync => {
            let message: ProposalInfoSyncMessage = sbor::basic_decode(payload)
                .map_err(|e| CodecError::Decode(format!("{e:?}")))?;
            Ok(InboundMessage::ProposalInfoSync(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attestor_types::{
        IndividualExecution, Keypair, MessageHash, Nonce, OracleId, Signature, ValidatorInfo,
        ValidatorSet, ValidatorSigner, VotePayload, VoteSet, VoteSetId,
    };

    fn sample_vote_set() -> VoteSet {
        let pair = Keypair::from_seed([5; 32]);
        let set = ValidatorSet::new(vec![ValidatorInfo {
            address: pair.address(),
            public_key: pair.public_key(),
            power: 1,
        }]);
        let execution =
            IndividualExecution::agree(MessageHash::digest(b"m"), Signature(vec![0xAA]));
        let payload = VotePayload::new(OracleId::new("feed"), &execution, 0, 1);
        VoteSet::create(
            VoteSetId::generate(),
            Nonce::STARTING,
            "chain".into(),
            1_000,
            51,
            0,
            vec![1, 2, 3],
            payload,
            &pair,
            &set,
            None,
        )
        .unwrap()
    }

    #[test]
    fn vote_set_round_trips() {
        let vote_set = sample_vote_set();
        let message = OutboundMessage::VoteSet(VoteSetMessage {
            vote_set: vote_set.clone(),
        });
        let bytes = encode_message(&message).unwrap();
        assert_eq!(bytes[0], WIRE_VERSION);

        match decode_message(GossipChannel::VoteSet, &bytes).unwrap() {
            InboundMessage::VoteSet(decoded) => assert_eq!(decoded.vote_set, vote_set),
            other => panic!("expected a vote set, got {other:?}"),
        }
    }

    #[test]
    fn maj23_round_trips() {
        let vote_set = sample_vote_set();
        let message = OutboundMessage::Maj23(Maj23Message {
            vote_set: vote_set.clone(),
        });
        let bytes = encode_message(&message).unwrap();

        match decode_message(GossipChannel::Maj23, &bytes).unwrap() {
            InboundMessage::Maj23(decoded) => assert_eq!(decoded.vote_set, vote_set),
            other => panic!("expected a recovery message, got {other:?}"),
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let vote_set = sample_vote_set();
        let message = OutboundMessage::VoteSet(VoteSetMessage { vote_set });
        assert_eq!(
            encode_message(&message).unwrap(),
            encode_message(&message).unwrap()
        );
    }

    #[test]
    fn unknown_version_is_rejected() {
        let result = decode_message(GossipChannel::VoteSet, &[99, 1, 2, 3]);
        assert!(matches!(result, Err(CodecError::UnknownVersion(99))));
    }

    #[test]
    fn empty_message_is_rejected() {
        let result = decode_message(GossipChannel::VoteSet, &[]);
        assert!(matches!(result, Err(CodecError::MessageTooShort)));
    }

    #[test]
    fn oversized_message_is_rejected() {
        let data = vec![WIRE_VERSION; MAX_MSG_SIZE + 1];
        let result = decode_message(GossipChannel::VoteSet, &data);
        assert!(matches!(result, Err(CodecError::MessageTooLarge(_))));
    }
}
