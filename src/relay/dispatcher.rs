use std::sync::Arc;

use alloy_primitives::Address;
use tracing::{error, info};

use crate::contracts::hashi::{IYaho::MessageDispatched, YahoContract};
use crate::error::{RelayError, Result};
use crate::protocol::{MessageEnvelope, MessageId};
use crate::traits::ChainClient;

/// Submits envelopes to Yaho on the source chain.
#[derive(Debug)]
pub struct MessageDispatcher<C> {
    client: Arc<C>,
    yaho: YahoContract,
    adapters: Vec<Address>,
    destination_chain_id: u64,
    destination_adapters: Vec<Address>,
}

fn dispatch_failure(reason: impl Into<String>) -> RelayError {
    RelayError::DispatchFailure {
        reason: reason.into(),
    }
}

impl<C: ChainClient> MessageDispatcher<C> {
    pub fn new(
        client: Arc<C>,
        yaho: Address,
        adapters: Vec<Address>,
        destination_chain_id: u64,
        destination_adapters: Vec<Address>,
    ) -> Self {
        Self {
            client,
            yaho: YahoContract::new(yaho),
            adapters,
            destination_chain_id,
            destination_adapters,
        }
    }

    /// Dispatches `envelope` and returns the id Yaho assigned to it.
    ///
    /// Single attempt. An envelope addressed to other chains than the ones
    /// this dispatcher serves, a reverted transaction, or a receipt without
    /// Yaho's `MessageDispatched` event, is a [`RelayError::DispatchFailure`].
    pub async fn dispatch(&self, envelope: &MessageEnvelope) -> Result<MessageId> {
        if envelope.source_chain_id() != self.client.chain_id() {
            return Err(dispatch_failure(format!(
                "envelope source chain {} does not match client chain {}",
                envelope.source_chain_id(),
                self.client.chain_id()
            )));
        }
        if envelope.dest_chain_id() != self.destination_chain_id {
            return Err(dispatch_failure(format!(
                "envelope destination chain {} does not match relay destination {}",
                envelope.dest_chain_id(),
                self.destination_chain_id
            )));
        }

        let calldata =
            self.yaho
                .dispatch_calldata(envelope, &self.adapters, &self.destination_adapters);
        let receipt = self
            .client
            .submit_transaction(self.yaho.address(), calldata)
            .await
            .map_err(|e| dispatch_failure(e.to_string()))?;

        if !receipt.is_success() {
            error!(
                tx_hash = %receipt.tx_hash(),
                event = "dispatch_reverted"
            );
            return Err(dispatch_failure(format!(
                "transaction {} reverted",
                receipt.tx_hash()
            )));
        }

        let event = receipt
            .find_event::<MessageDispatched>(self.yaho.address())
            .ok_or_else(|| {
                dispatch_failure(format!(
                    "no MessageDispatched event in transaction {}",
                    receipt.tx_hash()
                ))
            })?;

        let message_id = MessageId::from(event.messageId);
        info!(
            tx_hash = %receipt.tx_hash(),
            dispatch_id = %message_id,
            event = "message_dispatched"
        );
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dispatch_receipt, reverted_receipt, FakeChainClient, ScriptedReceipt};
    use alloy_primitives::U256;

    const YAHO: Address = Address::repeat_byte(0x01);

    fn dispatcher(client: Arc<FakeChainClient>) -> MessageDispatcher<FakeChainClient> {
        MessageDispatcher::new(
            client,
            YAHO,
            vec![Address::repeat_byte(0x02)],
            5,
            vec![Address::repeat_byte(0x03)],
        )
    }

    fn envelope() -> MessageEnvelope {
        MessageEnvelope::request_random_words(10200, 5, Address::repeat_byte(0x04))
    }

    #[tokio::test]
    async fn test_dispatch_extracts_message_id() {
        let client = Arc::new(FakeChainClient::new(10200));
        let id = MessageId::from(U256::from(0x123));
        client.script_receipt(YAHO, ScriptedReceipt::Confirmed(dispatch_receipt(YAHO, id)));

        let dispatched = dispatcher(client.clone()).dispatch(&envelope()).await.unwrap();
        assert_eq!(dispatched, id);
        assert_eq!(client.submitted_to(YAHO), 1);
    }

    #[tokio::test]
    async fn test_reverted_dispatch() {
        let client = Arc::new(FakeChainClient::new(10200));
        client.script_receipt(YAHO, ScriptedReceipt::Confirmed(reverted_receipt()));

        let err = dispatcher(client).dispatch(&envelope()).await.unwrap_err();
        assert_eq!(err.kind(), "DispatchFailure");
    }

    #[tokio::test]
    async fn test_missing_event() {
        let client = Arc::new(FakeChainClient::new(10200));
        // Event emitted by some other contract
        client.script_receipt(
            YAHO,
            ScriptedReceipt::Confirmed(dispatch_receipt(Address::ZERO, MessageId::from(U256::ONE))),
        );

        let err = dispatcher(client).dispatch(&envelope()).await.unwrap_err();
        assert!(err.to_string().contains("no MessageDispatched event"));
    }

    #[tokio::test]
    async fn test_rpc_failure_is_dispatch_failure() {
        let client = Arc::new(FakeChainClient::new(10200));
        client.script_receipt(YAHO, ScriptedReceipt::RpcFailure("connection reset".to_string()));

        let err = dispatcher(client).dispatch(&envelope()).await.unwrap_err();
        assert_eq!(err.kind(), "DispatchFailure");
    }

    #[tokio::test]
    async fn test_wrong_source_chain() {
        let client = Arc::new(FakeChainClient::new(1));

        let err = dispatcher(client.clone()).dispatch(&envelope()).await.unwrap_err();
        assert_eq!(err.kind(), "DispatchFailure");
        assert_eq!(client.submitted_to(YAHO), 0);
    }

    #[tokio::test]
    async fn test_wrong_destination_chain() {
        let client = Arc::new(FakeChainClient::new(10200));
        let envelope = MessageEnvelope::request_random_words(10200, 1, Address::repeat_byte(0x04));

        let err = dispatcher(client.clone()).dispatch(&envelope).await.unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"Dispatch failed: envelope destination chain 1 does not match relay destination 5"
        );
        assert_eq!(client.submitted_to(YAHO), 0);
    }
}
