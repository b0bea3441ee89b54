use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::traits::{ChainClient, SubscriptionId};

/// Owns a log subscription and releases it exactly once.
///
/// [`release`](Self::release) is the normal path. If the guard is dropped
/// unreleased (the owning future was dropped mid-wait, or mid-release), the
/// unsubscribe is handed to the current Tokio runtime instead. A guard counts
/// as released only once an `unsubscribe` call has returned.
pub struct SubscriptionGuard<C>
where
    C: ChainClient + ?Sized + 'static,
{
    client: Arc<C>,
    id: SubscriptionId,
    released: bool,
}

impl<C> SubscriptionGuard<C>
where
    C: ChainClient + ?Sized + 'static,
{
    pub fn new(client: Arc<C>, id: SubscriptionId) -> Self {
        Self {
            client,
            id,
            released: false,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Releases the subscription. Later calls are no-ops.
    pub async fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        let result = self.client.unsubscribe(self.id).await;
        self.released = true;
        debug!(subscription_id = %self.id, event = "subscription_released");
        result
    }
}

impl<C> Drop for SubscriptionGuard<C>
where
    C: ChainClient + ?Sized + 'static,
{
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(subscription_id = %self.id, event = "subscription_leaked");
            return;
        };
        let client = Arc::clone(&self.client);
        let id = self.id;
        runtime.spawn(async move {
            if let Err(e) = client.unsubscribe(id).await {
                warn!(subscription_id = %id, error = %e, event = "subscription_release_failed");
            }
        });
        debug!(subscription_id = %id, event = "subscription_released_on_drop");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeChainClient;
    use alloy_rpc_types::Filter;
    use std::time::Duration;

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let client = Arc::new(FakeChainClient::new(5));
        let subscription = client.subscribe(&Filter::new()).await.unwrap();
        let mut guard = SubscriptionGuard::new(client.clone(), subscription.id());

        guard.release().await.unwrap();
        guard.release().await.unwrap();
        drop(guard);

        assert_eq!(client.release_count(subscription.id()), 1);
        assert_eq!(client.live_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_interrupted_release_is_finished_on_drop() {
        let client = Arc::new(FakeChainClient::new(5));
        let subscription = client.subscribe(&Filter::new()).await.unwrap();
        let id = subscription.id();
        let mut guard = SubscriptionGuard::new(client.clone(), id);

        client.pause_releases();
        let released = tokio::time::timeout(Duration::from_millis(20), guard.release()).await;
        assert!(released.is_err());
        assert!(!guard.is_released());

        drop(guard);
        client.resume_releases();
        client.wait_for_subscriptions(0).await;

        assert_eq!(client.release_count(id), 1);
    }

    #[tokio::test]
    async fn test_drop_releases_once() {
        let client = Arc::new(FakeChainClient::new(5));
        let subscription = client.subscribe(&Filter::new()).await.unwrap();
        let id = subscription.id();

        drop(SubscriptionGuard::new(client.clone(), id));
        client.wait_for_subscriptions(0).await;

        assert_eq!(client.release_count(id), 1);
    }
}
