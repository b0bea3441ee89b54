//! Alloy-based chain client implementation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use alloy_network::Ethereum;
use alloy_primitives::{Address, Bytes};
use alloy_provider::Provider;
use alloy_rpc_types::{Filter, TransactionRequest};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info, instrument, trace};

use crate::error::{RelayError, Result};
use crate::receipt::ChainReceipt;
use crate::traits::{ChainClient, LogSubscription, SubscriptionId};

/// Default number of confirmations awaited per transaction
pub const DEFAULT_REQUIRED_CONFIRMATIONS: u64 = 1;

/// Default gas buffer percentage (20%)
pub const DEFAULT_GAS_BUFFER_PERCENT: u64 = 20;

/// Production chain client wrapping an Alloy [`Provider`].
///
/// Log subscriptions need a pubsub transport, so the provider should be
/// connected over WebSocket for the destination chain.
///
/// # Examples
///
/// ```rust,no_run
/// use hashi_vrf_rs::providers::AlloyChainClient;
/// use alloy_provider::ProviderBuilder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ProviderBuilder::new()
///     .connect("wss://ethereum-goerli.publicnode.com")
///     .await?;
///
/// let client = AlloyChainClient::new(provider, 5).with_required_confirmations(2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AlloyChainClient<P> {
    provider: P,
    chain_id: u64,
    required_confirmations: u64,
    gas_buffer_percent: u64,
    active: Arc<Mutex<HashSet<SubscriptionId>>>,
}

impl<P> AlloyChainClient<P>
where
    P: Provider<Ethereum>,
{
    pub fn new(provider: P, chain_id: u64) -> Self {
        Self {
            provider,
            chain_id,
            required_confirmations: DEFAULT_REQUIRED_CONFIRMATIONS,
            gas_buffer_percent: DEFAULT_GAS_BUFFER_PERCENT,
            active: Arc::default(),
        }
    }

    pub fn with_required_confirmations(mut self, confirmations: u64) -> Self {
        self.required_confirmations = confirmations.max(1);
        self
    }

    pub fn with_gas_buffer_percent(mut self, percent: u64) -> Self {
        self.gas_buffer_percent = percent;
        self
    }

    /// Returns a reference to the underlying Alloy provider.
    pub fn inner(&self) -> &P {
        &self.provider
    }

    /// Number of subscriptions opened through this client and not yet released.
    pub fn active_subscriptions(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn estimate_gas_with_buffer(&self, tx: &TransactionRequest) -> Result<u64> {
        let estimate = self
            .provider
            .estimate_gas(tx.clone())
            .await
            .map_err(|e| RelayError::Provider(format!("Gas estimation failed: {e}")))?;

        Ok(estimate.saturating_mul(100 + self.gas_buffer_percent) / 100)
    }
}

#[async_trait]
impl<P> ChainClient for AlloyChainClient<P>
where
    P: Provider<Ethereum> + Send + Sync,
{
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    #[instrument(skip(self, data), fields(chain_id = self.chain_id, to = %to))]
    async fn submit_transaction(&self, to: Address, data: Bytes) -> Result<ChainReceipt> {
        let tx = TransactionRequest::default().to(to).input(data.into());
        let gas_limit = self.estimate_gas_with_buffer(&tx).await?;
        let tx = tx.gas_limit(gas_limit);

        let pending = self.provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();
        info!(
            tx_hash = %tx_hash,
            gas_limit = gas_limit,
            event = "transaction_sent"
        );

        let receipt = pending
            .with_required_confirmations(self.required_confirmations)
            .get_receipt()
            .await
            .map_err(|e| RelayError::Provider(format!("Receipt unavailable for {tx_hash}: {e}")))?;

        let receipt = ChainReceipt::from(&receipt);
        debug!(
            tx_hash = %tx_hash,
            block_number = ?receipt.block_number(),
            success = receipt.is_success(),
            logs = receipt.logs().len(),
            event = "transaction_confirmed"
        );
        Ok(receipt)
    }

    #[instrument(skip(self, data), fields(chain_id = self.chain_id, to = %to))]
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        trace!("Executing eth_call");
        let tx = TransactionRequest::default().to(to).input(data.into());
        let output = self.provider.call(tx).await?;
        Ok(output)
    }

    #[instrument(skip(self, filter), fields(chain_id = self.chain_id))]
    async fn subscribe(&self, filter: &Filter) -> Result<LogSubscription> {
        let subscription = self
            .provider
            .subscribe_logs(filter)
            .await
            .map_err(|e| RelayError::SubscriptionError {
                reason: e.to_string(),
            })?;
        let id = *subscription.local_id();

        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        debug!(subscription_id = %id, event = "log_subscription_opened");

        Ok(LogSubscription::new(id, subscription.into_stream().boxed()))
    }

    #[instrument(skip(self), fields(chain_id = self.chain_id, subscription_id = %id))]
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        let tracked = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id);
        if !tracked {
            trace!("Subscription already released");
            return Ok(());
        }

        // Untracked only once the node has answered, so an interrupted call
        // can be repeated.
        let released = self
            .provider
            .unsubscribe(id)
            .await
            .map_err(|e| RelayError::SubscriptionError {
                reason: e.to_string(),
            });
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        released?;
        debug!(subscription_id = %id, event = "log_subscription_released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use alloy_provider::{mock::Asserter, ProviderBuilder};

    fn mocked_client() -> AlloyChainClient<impl Provider<Ethereum>> {
        let provider = ProviderBuilder::new().connect_mocked_client(Asserter::default());
        AlloyChainClient::new(provider, 5)
    }

    #[tokio::test]
    async fn test_unknown_subscription_is_not_forwarded() {
        let client = mocked_client();
        client.unsubscribe(B256::repeat_byte(0x11)).await.unwrap();
        assert_eq!(client.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_tracked_subscription_is_released_once() {
        let client = mocked_client();
        let id = B256::repeat_byte(0x22);
        client
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);

        // The mocked transport has no pubsub frontend, so the node call fails
        if let Err(e) = client.unsubscribe(id).await {
            assert_eq!(e.kind(), "SubscriptionError");
        }
        assert_eq!(client.active_subscriptions(), 0);

        client.unsubscribe(id).await.unwrap();
    }
}
