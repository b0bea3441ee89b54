use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use bon::Builder;

use crate::contracts::hashi::Message;
use crate::contracts::vrf_consumer::IVrfConsumer::requestRandomWordsCall;

/// A cross-chain message: which chains it travels between, the contract it
/// calls on the destination chain, and the opaque calldata it delivers.
///
/// Envelopes are immutable once built. Two envelopes are the same message
/// exactly when all four fields are equal.
///
/// # Example
///
/// ```rust
/// use hashi_vrf_rs::MessageEnvelope;
/// use alloy_primitives::{Address, Bytes};
///
/// let envelope = MessageEnvelope::builder()
///     .source_chain_id(10200)
///     .dest_chain_id(5)
///     .target(Address::ZERO)
///     .payload(Bytes::from_static(&[0xde, 0xad]))
///     .build();
/// assert_eq!(envelope.dest_chain_id(), 5);
/// ```
#[derive(Builder, Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageEnvelope {
    source_chain_id: u64,
    dest_chain_id: u64,
    target: Address,
    #[builder(into)]
    payload: Bytes,
}

impl MessageEnvelope {
    /// Builds an envelope that calls `requestRandomWords()` on a VRF consumer.
    pub fn request_random_words(source_chain_id: u64, dest_chain_id: u64, consumer: Address) -> Self {
        Self {
            source_chain_id,
            dest_chain_id,
            target: consumer,
            payload: requestRandomWordsCall {}.abi_encode().into(),
        }
    }

    pub fn source_chain_id(&self) -> u64 {
        self.source_chain_id
    }

    pub fn dest_chain_id(&self) -> u64 {
        self.dest_chain_id
    }

    pub fn target(&self) -> Address {
        self.target
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// ABI encoding of `(address target, bytes payload)`.
    ///
    /// This is the exact byte string attestors sign and the destination AMB
    /// expects alongside the signature.
    pub fn canonical_encoding(&self) -> Bytes {
        DynSolValue::Tuple(vec![
            DynSolValue::Address(self.target),
            DynSolValue::Bytes(self.payload.to_vec()),
        ])
        .abi_encode_params()
        .into()
    }

    /// The envelope in the shape Yaho and Yaru accept.
    pub fn to_hashi_message(&self) -> Message {
        Message {
            toChainId: U256::from(self.dest_chain_id),
            to: self.target,
            data: self.payload.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use alloy_sol_types::SolValue;

    fn envelope() -> MessageEnvelope {
        MessageEnvelope::builder()
            .source_chain_id(10200)
            .dest_chain_id(5)
            .target(address!("0000000000000000000000000000000000000001"))
            .payload(Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]))
            .build()
    }

    #[test]
    fn test_canonical_encoding_layout() {
        let encoded = envelope().canonical_encoding();

        // address word, offset word, length word, one padded data word
        assert_eq!(encoded.len(), 4 * 32);
        assert_eq!(encoded[31], 0x01);
        assert_eq!(encoded[63], 0x40);
        assert_eq!(encoded[95], 0x04);
        assert_eq!(&encoded[96..100], &[0xde, 0xad, 0xbe, 0xef]);
        assert!(encoded[100..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_canonical_encoding_matches_static_abi() {
        let envelope = envelope();
        let expected = (envelope.target(), envelope.payload().clone()).abi_encode_params();
        assert_eq!(envelope.canonical_encoding().to_vec(), expected);
    }

    #[test]
    fn test_request_random_words_payload_is_selector() {
        let consumer = address!("a340bb99457D4E676824da9F20bD9df1684B1529");
        let envelope = MessageEnvelope::request_random_words(10200, 5, consumer);

        assert_eq!(envelope.payload().as_ref(), requestRandomWordsCall::SELECTOR.as_slice());
        assert_eq!(envelope.target(), consumer);
    }

    #[test]
    fn test_hashi_message_carries_envelope_fields() {
        let envelope = envelope();
        let message = envelope.to_hashi_message();

        assert_eq!(message.toChainId, U256::from(5));
        assert_eq!(message.to, envelope.target());
        assert_eq!(&message.data, envelope.payload());
    }

    #[test]
    fn test_identity_is_field_tuple() {
        assert_eq!(envelope(), envelope());

        let other = MessageEnvelope::builder()
            .source_chain_id(10200)
            .dest_chain_id(100)
            .target(envelope().target())
            .payload(envelope().payload().clone())
            .build();
        assert_ne!(envelope(), other);
    }
}
