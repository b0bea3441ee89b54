//! Yaho and Yaru contract bindings and wrappers
//!
//! Yaho accepts messages on the source chain and hands them to the configured
//! adapters. Yaru executes those messages on the destination chain once the
//! adapters agree on them.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{sol, SolCall};
use tracing::{debug, info};

use crate::protocol::{MessageEnvelope, MessageId};

sol! {
    /// A message as carried by Hashi.
    #[derive(Debug, PartialEq, Eq)]
    struct Message {
        uint256 toChainId;
        address to;
        bytes data;
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IYaho {
        event MessageDispatched(
            bytes32 indexed messageId,
            address indexed from,
            uint256 indexed toChainId,
            address to,
            bytes data
        );

        function dispatchMessagesToAdapters(
            Message[] messages,
            address[] adapters,
            address[] destinationAdapters
        ) external payable returns (bytes32[] messageIds, bytes32[] messageHashes);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IYaru {
        function executeMessages(
            Message[] messages,
            bytes32[] messageIds,
            address[] senders,
            address[] adapters
        ) external returns (bytes[] returnDatas);
    }
}

/// The Yaho dispatcher on the source chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YahoContract {
    address: Address,
}

impl YahoContract {
    pub fn new(address: Address) -> Self {
        debug!(
            contract_address = %address,
            event = "yaho_contract_initialized"
        );
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Calldata for `dispatchMessagesToAdapters` with a single envelope.
    pub fn dispatch_calldata(
        &self,
        envelope: &MessageEnvelope,
        adapters: &[Address],
        destination_adapters: &[Address],
    ) -> Bytes {
        info!(
            target_address = %envelope.target(),
            destination_chain_id = envelope.dest_chain_id(),
            payload_len = envelope.payload().len(),
            adapters = adapters.len(),
            contract_address = %self.address,
            event = "dispatch_calldata_created"
        );

        IYaho::dispatchMessagesToAdaptersCall {
            messages: vec![envelope.to_hashi_message()],
            adapters: adapters.to_vec(),
            destinationAdapters: destination_adapters.to_vec(),
        }
        .abi_encode()
        .into()
    }
}

/// The Yaru executor on the destination chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YaruContract {
    address: Address,
}

impl YaruContract {
    pub fn new(address: Address) -> Self {
        debug!(
            contract_address = %address,
            event = "yaru_contract_initialized"
        );
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Calldata for `executeMessages` with a single envelope.
    ///
    /// * `sender` - Address that dispatched the message on the source chain
    /// * `origin_amb` - Bridge the destination uses to check provenance
    pub fn execute_calldata(
        &self,
        envelope: &MessageEnvelope,
        message_id: MessageId,
        sender: Address,
        origin_amb: Address,
    ) -> Bytes {
        info!(
            message_id = %message_id,
            sender = %sender,
            origin_amb = %origin_amb,
            contract_address = %self.address,
            event = "execute_calldata_created"
        );

        IYaru::executeMessagesCall {
            messages: vec![envelope.to_hashi_message()],
            messageIds: vec![message_id.as_b256()],
            senders: vec![sender],
            adapters: vec![origin_amb],
        }
        .abi_encode()
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, B256, U256};

    fn envelope() -> MessageEnvelope {
        MessageEnvelope::request_random_words(
            10200,
            5,
            address!("a340bb99457D4E676824da9F20bD9df1684B1529"),
        )
    }

    #[test]
    fn test_dispatch_calldata_round_trips_arguments() {
        let yaho = YahoContract::new(Address::repeat_byte(0x01));
        let adapters = [Address::repeat_byte(0x02)];
        let destination_adapters = [Address::repeat_byte(0x03)];

        let calldata = yaho.dispatch_calldata(&envelope(), &adapters, &destination_adapters);
        assert_eq!(
            &calldata[..4],
            IYaho::dispatchMessagesToAdaptersCall::SELECTOR.as_slice()
        );

        let decoded = IYaho::dispatchMessagesToAdaptersCall::abi_decode(&calldata).unwrap();
        assert_eq!(decoded.messages, vec![envelope().to_hashi_message()]);
        assert_eq!(decoded.adapters, adapters.to_vec());
        assert_eq!(decoded.destinationAdapters, destination_adapters.to_vec());
    }

    #[test]
    fn test_execute_calldata_round_trips_arguments() {
        let yaru = YaruContract::new(Address::repeat_byte(0x04));
        let message_id = MessageId::from(U256::from(0xabc));
        let sender = Address::repeat_byte(0x05);
        let origin = Address::repeat_byte(0x06);

        let calldata = yaru.execute_calldata(&envelope(), message_id, sender, origin);
        let decoded = IYaru::executeMessagesCall::abi_decode(&calldata).unwrap();

        assert_eq!(decoded.messages.len(), 1);
        assert_eq!(decoded.messageIds, vec![B256::from(message_id)]);
        assert_eq!(decoded.senders, vec![sender]);
        assert_eq!(decoded.adapters, vec![origin]);
    }
}
