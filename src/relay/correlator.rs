use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use alloy_primitives::Address;
use alloy_rpc_types::{Filter, Log};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::subscription::SubscriptionGuard;
use crate::error::{RelayError, Result};
use crate::protocol::{MessageId, RandomnessResponse, ResponseFilter};
use crate::traits::ChainClient;

/// Waits for the response event of one request on the destination chain.
///
/// Each call owns exactly one subscription, released before the call
/// returns whatever the outcome. At most one call per [`MessageId`] may be
/// waiting at a time.
#[derive(Debug)]
pub struct ResponseCorrelator<C> {
    client: Arc<C>,
    contract: Address,
    in_flight: Arc<Mutex<HashSet<MessageId>>>,
}

/// Marks a message id as awaited until dropped.
struct InFlightClaim {
    ids: Arc<Mutex<HashSet<MessageId>>>,
    id: MessageId,
}

impl InFlightClaim {
    fn acquire(ids: &Arc<Mutex<HashSet<MessageId>>>, id: MessageId) -> Result<Self> {
        let claimed = ids.lock().unwrap_or_else(PoisonError::into_inner).insert(id);
        if !claimed {
            return Err(RelayError::SubscriptionError {
                reason: format!("a response subscription for message {id} is already live"),
            });
        }
        Ok(Self {
            ids: Arc::clone(ids),
            id,
        })
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl<C> ResponseCorrelator<C>
where
    C: ChainClient + 'static,
{
    pub fn new(client: Arc<C>, contract: Address) -> Self {
        Self {
            client,
            contract,
            in_flight: Arc::default(),
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Suspends until the response for `message_id` arrives, `timeout`
    /// elapses or `cancel` fires.
    ///
    /// Nothing is subscribed when `cancel` has already fired, or when another
    /// call is already waiting for `message_id`.
    pub async fn await_response(
        &self,
        message_id: MessageId,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RandomnessResponse> {
        if cancel.is_cancelled() {
            return Err(RelayError::OperationCancelled);
        }

        let _claim = InFlightClaim::acquire(&self.in_flight, message_id)?;

        let filter = ResponseFilter::new(self.contract, message_id);
        let (mut guard, mut stream) = self.open(filter.to_log_filter()).await?;
        let id = guard.id();
        debug!(
            subscription_id = %id,
            message_id = %message_id,
            event = "awaiting_response"
        );

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RelayError::OperationCancelled),
            result = tokio::time::timeout(timeout, first_match(&filter, &mut stream)) => {
                result.unwrap_or(Err(RelayError::ResponseTimeout { timeout }))
            }
        };
        drop(stream);

        if let Err(e) = guard.release().await {
            warn!(
                subscription_id = %id,
                error = %e,
                event = "subscription_release_failed"
            );
        }

        match &outcome {
            Ok(response) => info!(
                message_id = %message_id,
                words = response.random_words().len(),
                event = "response_received"
            ),
            Err(e) => warn!(
                message_id = %message_id,
                error = %e,
                event = "response_not_received"
            ),
        }
        outcome
    }

    /// Subscribes on a separate task. If the caller goes away while the node
    /// is still answering, the guard is dropped with the unsent result and
    /// releases the subscription.
    async fn open(
        &self,
        filter: Filter,
    ) -> Result<(SubscriptionGuard<C>, BoxStream<'static, Log>)> {
        let client = Arc::clone(&self.client);
        let (opened_tx, opened_rx) = oneshot::channel();
        tokio::spawn(async move {
            let opened = client.subscribe(&filter).await.map(|subscription| {
                let (id, stream) = subscription.into_parts();
                (SubscriptionGuard::new(Arc::clone(&client), id), stream)
            });
            let _ = opened_tx.send(opened);
        });

        let opened = opened_rx.await.map_err(|_| RelayError::SubscriptionError {
            reason: "subscription task ended before answering".to_string(),
        })?;
        opened.map_err(|e| match e {
            e @ RelayError::SubscriptionError { .. } => e,
            other => RelayError::SubscriptionError {
                reason: other.to_string(),
            },
        })
    }
}

async fn first_match<S>(filter: &ResponseFilter, stream: &mut S) -> Result<RandomnessResponse>
where
    S: Stream<Item = Log> + Unpin,
{
    while let Some(log) = stream.next().await {
        match filter.match_log(&log) {
            Ok(Some(response)) => return Ok(response),
            Ok(None) => trace!("Ignoring log for another request"),
            Err(e) => warn!(error = %e, event = "undecodable_response_log"),
        }
    }

    Err(RelayError::SubscriptionError {
        reason: "log stream ended before a response arrived".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fulfilled_log, FakeChainClient};
    use alloy_primitives::U256;

    const CONSUMER: Address = Address::repeat_byte(0x0c);

    #[tokio::test]
    async fn test_first_matching_event_is_delivered() {
        let client = Arc::new(FakeChainClient::new(5));
        let correlator = ResponseCorrelator::new(client.clone(), CONSUMER);
        let id = MessageId::from(U256::from(0xabc));

        let emitter = {
            let client = client.clone();
            tokio::spawn(async move {
                client.wait_for_subscriptions(1).await;
                client.emit_log(fulfilled_log(CONSUMER, MessageId::from(U256::from(1)), &[9], 1));
                client.emit_log(fulfilled_log(CONSUMER, id, &[42, 7], 100));
            })
        };

        let response = correlator
            .await_response(id, Duration::from_secs(30), &CancellationToken::new())
            .await
            .unwrap();
        emitter.await.unwrap();

        assert_eq!(response.random_words(), &[U256::from(42), U256::from(7)]);
        assert_eq!(client.total_releases(), 1);
        assert_eq!(client.live_subscriptions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_subscription() {
        let client = Arc::new(FakeChainClient::new(5));
        let correlator = ResponseCorrelator::new(client.clone(), CONSUMER);

        let err = correlator
            .await_response(
                MessageId::from(U256::from(1)),
                Duration::from_secs(30),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        insta::assert_snapshot!(err.to_string(), @"Timed out after 30s waiting for response");
        assert_eq!(client.total_releases(), 1);
        assert_eq!(client.live_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_releases_subscription() {
        let client = Arc::new(FakeChainClient::new(5));
        let correlator = ResponseCorrelator::new(client.clone(), CONSUMER);
        let cancel = CancellationToken::new();

        let canceller = {
            let client = client.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                client.wait_for_subscriptions(1).await;
                cancel.cancel();
            })
        };

        let err = correlator
            .await_response(MessageId::from(U256::from(1)), Duration::from_secs(30), &cancel)
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, RelayError::OperationCancelled));
        assert_eq!(client.total_releases(), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_never_subscribes() {
        let client = Arc::new(FakeChainClient::new(5));
        let correlator = ResponseCorrelator::new(client.clone(), CONSUMER);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = correlator
            .await_response(MessageId::from(U256::from(1)), Duration::from_secs(30), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::OperationCancelled));
        assert_eq!(client.total_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_second_wait_for_same_message_is_rejected() {
        let client = Arc::new(FakeChainClient::new(5));
        let correlator = Arc::new(ResponseCorrelator::new(client.clone(), CONSUMER));
        let id = MessageId::from(U256::from(0xabc));

        let first = {
            let correlator = correlator.clone();
            tokio::spawn(async move {
                correlator
                    .await_response(id, Duration::from_secs(30), &CancellationToken::new())
                    .await
            })
        };
        client.wait_for_subscriptions(1).await;

        let err = correlator
            .await_response(id, Duration::from_secs(30), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "SubscriptionError");
        assert_eq!(client.total_subscriptions(), 1);

        client.emit_log(fulfilled_log(CONSUMER, id, &[5], 1));
        first.await.unwrap().unwrap();
        assert_eq!(client.live_subscriptions(), 0);

        // The id is free again once the first wait has finished
        let emitter = {
            let client = client.clone();
            tokio::spawn(async move {
                client.wait_for_subscriptions(1).await;
                client.emit_log(fulfilled_log(CONSUMER, id, &[6], 2));
            })
        };
        let again = correlator
            .await_response(id, Duration::from_secs(30), &CancellationToken::new())
            .await
            .unwrap();
        emitter.await.unwrap();
        assert_eq!(again.random_words(), &[U256::from(6)]);
        assert_eq!(client.total_releases(), 2);
    }

    #[tokio::test]
    async fn test_dropped_while_subscribing_releases_late_subscription() {
        let client = Arc::new(FakeChainClient::new(5));
        let correlator = ResponseCorrelator::new(client.clone(), CONSUMER);
        client.pause_subscriptions();

        let waited = tokio::time::timeout(
            Duration::from_millis(20),
            correlator.await_response(
                MessageId::from(U256::from(1)),
                Duration::from_secs(30),
                &CancellationToken::new(),
            ),
        )
        .await;
        assert!(waited.is_err());

        client.resume_subscriptions();
        client.wait_for_releases(1).await;

        assert_eq!(client.total_subscriptions(), 1);
        assert_eq!(client.live_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_failure() {
        let client = Arc::new(FakeChainClient::new(5));
        client.fail_subscriptions("websocket closed");
        let correlator = ResponseCorrelator::new(client.clone(), CONSUMER);

        let err = correlator
            .await_response(
                MessageId::from(U256::from(1)),
                Duration::from_secs(30),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "SubscriptionError");
        assert_eq!(client.total_releases(), 0);
    }
}
