use std::sync::Arc;

use alloy_primitives::{Address, TxHash};
use tracing::{error, info};

use crate::contracts::hashi::YaruContract;
use crate::error::{RelayError, Result};
use crate::protocol::{MessageEnvelope, MessageId};
use crate::traits::ChainClient;

/// A confirmed Yaru execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfirmation {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Executes registered messages through Yaru on the destination chain.
#[derive(Debug)]
pub struct MessageExecutor<C> {
    client: Arc<C>,
    yaru: YaruContract,
}

impl<C: ChainClient> MessageExecutor<C> {
    pub fn new(client: Arc<C>, yaru: Address) -> Self {
        Self {
            client,
            yaru: YaruContract::new(yaru),
        }
    }

    /// Delivers the envelope's payload to its target.
    ///
    /// A revert (already executed, provenance check failed, target call
    /// reverted) is a [`RelayError::ExecutionFailure`].
    pub async fn execute(
        &self,
        envelope: &MessageEnvelope,
        message_id: MessageId,
        sender: Address,
        origin_amb: Address,
    ) -> Result<ExecutionConfirmation> {
        let calldata = self
            .yaru
            .execute_calldata(envelope, message_id, sender, origin_amb);
        let receipt = self
            .client
            .submit_transaction(self.yaru.address(), calldata)
            .await
            .map_err(|e| RelayError::ExecutionFailure {
                reason: e.to_string(),
            })?;

        if !receipt.is_success() {
            error!(
                tx_hash = %receipt.tx_hash(),
                message_id = %message_id,
                event = "execution_reverted"
            );
            return Err(RelayError::ExecutionFailure {
                reason: format!("transaction {} reverted", receipt.tx_hash()),
            });
        }

        info!(
            tx_hash = %receipt.tx_hash(),
            message_id = %message_id,
            event = "message_executed"
        );
        Ok(ExecutionConfirmation {
            tx_hash: receipt.tx_hash(),
            block_number: receipt.block_number(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{execution_receipt, reverted_receipt, FakeChainClient, ScriptedReceipt};
    use alloy_primitives::U256;

    const YARU: Address = Address::repeat_byte(0x05);

    #[tokio::test]
    async fn test_execution_confirms() {
        let client = Arc::new(FakeChainClient::new(5));
        let receipt = execution_receipt();
        client.script_receipt(YARU, ScriptedReceipt::Confirmed(receipt.clone()));

        let confirmation = MessageExecutor::new(client, YARU)
            .execute(
                &MessageEnvelope::request_random_words(10200, 5, Address::ZERO),
                MessageId::from(U256::from(1)),
                Address::repeat_byte(0x09),
                Address::repeat_byte(0x07),
            )
            .await
            .unwrap();

        assert_eq!(confirmation.tx_hash, receipt.tx_hash());
        assert_eq!(confirmation.block_number, receipt.block_number());
    }

    #[tokio::test]
    async fn test_revert_is_execution_failure() {
        let client = Arc::new(FakeChainClient::new(5));
        client.script_receipt(YARU, ScriptedReceipt::Confirmed(reverted_receipt()));

        let err = MessageExecutor::new(client, YARU)
            .execute(
                &MessageEnvelope::request_random_words(10200, 5, Address::ZERO),
                MessageId::from(U256::from(1)),
                Address::ZERO,
                Address::ZERO,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ExecutionFailure");
    }
}
