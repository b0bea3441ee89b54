//! Test utilities and fake implementations of the relay traits
//!
//! The fakes let the whole pipeline run in-process: receipts are scripted per
//! contract address, log subscriptions are backed by channels, and every
//! subscribe and unsubscribe is counted so tests can check that a
//! subscription was released exactly once.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy_primitives::{Address, Bytes, TxHash, B256, U256};
use alloy_rpc_types::{Filter, Log};
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use futures::channel::mpsc::{unbounded, UnboundedSender};
use futures::StreamExt;
use tokio::sync::watch;

use crate::contracts::amb::IAmb;
use crate::contracts::hashi::IYaho;
use crate::contracts::vrf_consumer::IVrfConsumer::RequestFulfilled;
use crate::error::{RelayError, Result};
use crate::protocol::{Attestation, MessageId};
use crate::receipt::ChainReceipt;
use crate::traits::{AttestationProvider, ChainClient, LogSubscription, SubscriptionId};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Fake Chain Client
// ============================================================================

/// Outcome of the next transaction sent to a contract.
#[derive(Debug, Clone)]
pub enum ScriptedReceipt {
    /// The transaction confirms with this receipt (which may be reverted).
    Confirmed(ChainReceipt),
    /// Sending the transaction fails with a provider error.
    RpcFailure(String),
}

struct FakeSubscription {
    filter: Filter,
    sender: UnboundedSender<Log>,
}

#[derive(Default)]
struct FakeChainState {
    receipts: HashMap<Address, VecDeque<ScriptedReceipt>>,
    call_responses: HashMap<Address, Bytes>,
    submitted: Vec<(Address, Bytes)>,
    subscriptions: HashMap<SubscriptionId, FakeSubscription>,
    releases: HashMap<SubscriptionId, usize>,
    opened: u64,
    subscribe_failure: Option<String>,
}

/// In-memory [`ChainClient`].
///
/// This allows testing scenarios like:
/// - Reverted or failing transactions per contract
/// - Receipts without the expected bridge event
/// - Subscriptions that cannot be established
/// - Response events for other requests, and late events
#[derive(Clone)]
pub struct FakeChainClient {
    chain_id: u64,
    state: Arc<Mutex<FakeChainState>>,
    live: Arc<watch::Sender<usize>>,
    released: Arc<watch::Sender<usize>>,
    subscribe_paused: Arc<watch::Sender<bool>>,
    release_paused: Arc<watch::Sender<bool>>,
}

impl std::fmt::Debug for FakeChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeChainClient")
            .field("chain_id", &self.chain_id)
            .field("live_subscriptions", &self.live_subscriptions())
            .finish()
    }
}

impl FakeChainClient {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            state: Arc::default(),
            live: Arc::new(watch::channel(0).0),
            released: Arc::new(watch::channel(0).0),
            subscribe_paused: Arc::new(watch::channel(false).0),
            release_paused: Arc::new(watch::channel(false).0),
        }
    }

    /// Queues the outcome of the next transaction sent to `to`.
    pub fn script_receipt(&self, to: Address, receipt: ScriptedReceipt) {
        lock(&self.state)
            .receipts
            .entry(to)
            .or_default()
            .push_back(receipt);
    }

    /// Sets the return data of every `call` to `to`.
    pub fn set_call_response(&self, to: Address, output: Bytes) {
        lock(&self.state).call_responses.insert(to, output);
    }

    /// Makes every following `subscribe` fail with `reason`.
    pub fn fail_subscriptions(&self, reason: impl Into<String>) {
        lock(&self.state).subscribe_failure = Some(reason.into());
    }

    /// All transactions sent so far, in order.
    pub fn submitted(&self) -> Vec<(Address, Bytes)> {
        lock(&self.state).submitted.clone()
    }

    /// Number of transactions sent to `to`.
    pub fn submitted_to(&self, to: Address) -> usize {
        lock(&self.state)
            .submitted
            .iter()
            .filter(|(address, _)| *address == to)
            .count()
    }

    pub fn live_subscriptions(&self) -> usize {
        *self.live.borrow()
    }

    /// Subscriptions opened over the client's lifetime.
    pub fn total_subscriptions(&self) -> u64 {
        lock(&self.state).opened
    }

    /// Number of `unsubscribe` calls made for `id`.
    pub fn release_count(&self, id: SubscriptionId) -> usize {
        lock(&self.state).releases.get(&id).copied().unwrap_or(0)
    }

    /// Number of `unsubscribe` calls made for any id.
    pub fn total_releases(&self) -> usize {
        lock(&self.state).releases.values().sum()
    }

    /// Waits until exactly `count` subscriptions are live.
    pub async fn wait_for_subscriptions(&self, count: usize) {
        let mut live = self.live.subscribe();
        // The sender lives as long as `self`, so this cannot close early.
        let _ = live.wait_for(|current| *current == count).await;
    }

    /// Waits until `count` subscriptions have been released in total.
    pub async fn wait_for_releases(&self, count: usize) {
        let mut released = self.released.subscribe();
        let _ = released.wait_for(|current| *current >= count).await;
    }

    /// Holds every following `subscribe` until [`resume_subscriptions`](Self::resume_subscriptions).
    pub fn pause_subscriptions(&self) {
        self.subscribe_paused.send_replace(true);
    }

    pub fn resume_subscriptions(&self) {
        self.subscribe_paused.send_replace(false);
    }

    /// Holds every following `unsubscribe` until [`resume_releases`](Self::resume_releases).
    /// A held call that is dropped does not count as a release.
    pub fn pause_releases(&self) {
        self.release_paused.send_replace(true);
    }

    pub fn resume_releases(&self) {
        self.release_paused.send_replace(false);
    }

    /// Delivers `log` to every live subscription whose filter matches it and
    /// returns how many received it.
    pub fn emit_log(&self, log: Log) -> usize {
        lock(&self.state)
            .subscriptions
            .values()
            .filter(|subscription| filter_matches(&subscription.filter, &log))
            .filter(|subscription| subscription.sender.unbounded_send(log.clone()).is_ok())
            .count()
    }

    fn publish_live(&self, state: &FakeChainState) {
        self.live.send_replace(state.subscriptions.len());
        self.released.send_replace(state.releases.values().sum());
    }
}

async fn wait_unpaused(paused: &watch::Sender<bool>) {
    let mut paused = paused.subscribe();
    let _ = paused.wait_for(|held| !*held).await;
}

fn filter_matches(filter: &Filter, log: &Log) -> bool {
    if !filter.address.matches(&log.address()) {
        return false;
    }
    filter
        .topics
        .iter()
        .enumerate()
        .all(|(index, expected)| match log.topics().get(index) {
            Some(topic) => expected.matches(topic),
            None => expected.is_empty(),
        })
}

#[async_trait]
impl ChainClient for FakeChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn submit_transaction(&self, to: Address, data: Bytes) -> Result<ChainReceipt> {
        let mut state = lock(&self.state);
        state.submitted.push((to, data));

        match state.receipts.get_mut(&to).and_then(VecDeque::pop_front) {
            Some(ScriptedReceipt::Confirmed(receipt)) => Ok(receipt),
            Some(ScriptedReceipt::RpcFailure(reason)) => Err(RelayError::Provider(reason)),
            None => Err(RelayError::Provider(format!("no receipt scripted for {to}"))),
        }
    }

    async fn call(&self, to: Address, _data: Bytes) -> Result<Bytes> {
        lock(&self.state)
            .call_responses
            .get(&to)
            .cloned()
            .ok_or_else(|| RelayError::Provider(format!("execution reverted: no code at {to}")))
    }

    async fn subscribe(&self, filter: &Filter) -> Result<LogSubscription> {
        wait_unpaused(&self.subscribe_paused).await;
        let mut state = lock(&self.state);
        if let Some(reason) = &state.subscribe_failure {
            return Err(RelayError::SubscriptionError {
                reason: reason.clone(),
            });
        }

        state.opened += 1;
        let id = SubscriptionId::from(U256::from(state.opened));
        let (sender, receiver) = unbounded();
        state.subscriptions.insert(
            id,
            FakeSubscription {
                filter: filter.clone(),
                sender,
            },
        );
        self.publish_live(&state);

        Ok(LogSubscription::new(id, receiver.boxed()))
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        wait_unpaused(&self.release_paused).await;
        let mut state = lock(&self.state);
        *state.releases.entry(id).or_default() += 1;
        state.subscriptions.remove(&id);
        self.publish_live(&state);
        Ok(())
    }
}

// ============================================================================
// Fake Attestation Provider
// ============================================================================

/// What a [`FakeAttestationProvider`] answers with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestorBehavior {
    Signature(Bytes),
    HttpStatus(u16),
    Malformed,
}

/// In-memory [`AttestationProvider`] that records every request.
#[derive(Debug, Clone)]
pub struct FakeAttestationProvider {
    behavior: AttestorBehavior,
    requests: Arc<Mutex<Vec<Bytes>>>,
}

impl FakeAttestationProvider {
    pub fn new(behavior: AttestorBehavior) -> Self {
        Self {
            behavior,
            requests: Arc::default(),
        }
    }

    pub fn signature(signature: impl Into<Bytes>) -> Self {
        Self::new(AttestorBehavior::Signature(signature.into()))
    }

    pub fn http_status(status: u16) -> Self {
        Self::new(AttestorBehavior::HttpStatus(status))
    }

    pub fn malformed() -> Self {
        Self::new(AttestorBehavior::Malformed)
    }

    /// Every encoding the provider was asked to sign, in order.
    pub fn requests(&self) -> Vec<Bytes> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl AttestationProvider for FakeAttestationProvider {
    async fn request_signature(&self, encoded: &Bytes) -> Result<Attestation> {
        lock(&self.requests).push(encoded.clone());

        match &self.behavior {
            AttestorBehavior::Signature(signature) => Attestation::new(signature.clone()),
            AttestorBehavior::HttpStatus(status) => Err(RelayError::AttestationUnavailable {
                reason: format!("attestor returned HTTP {status}"),
            }),
            AttestorBehavior::Malformed => Err(RelayError::AttestationUnavailable {
                reason: "malformed attestor response: invalid hex".to_string(),
            }),
        }
    }
}

// ============================================================================
// Receipt and log builders
// ============================================================================

static NEXT_TX: AtomicU64 = AtomicU64::new(1);

fn next_tx() -> (TxHash, u64) {
    let n = NEXT_TX.fetch_add(1, Ordering::Relaxed);
    (TxHash::from(U256::from(n)), 1_000 + n)
}

/// A log carrying `event` as emitted by `emitter`.
pub fn log<E: SolEvent>(emitter: Address, event: &E) -> Log {
    Log {
        inner: alloy_primitives::Log {
            address: emitter,
            data: event.encode_log_data(),
        },
        ..Default::default()
    }
}

/// A confirmed Yaho dispatch emitting `MessageDispatched(id)`.
pub fn dispatch_receipt(yaho: Address, id: MessageId) -> ChainReceipt {
    let event = IYaho::MessageDispatched {
        messageId: id.as_b256(),
        from: Address::ZERO,
        toChainId: U256::from(5),
        to: Address::ZERO,
        data: Bytes::new(),
    };
    let (tx_hash, block) = next_tx();
    ChainReceipt::new(tx_hash, Some(block), vec![log(yaho, &event)])
}

/// A confirmed AMB registration emitting `MessageDispatched(id)`.
pub fn registration_receipt(amb: Address, id: MessageId) -> ChainReceipt {
    let event = IAmb::MessageDispatched {
        messageId: id.as_b256(),
        encodedData: Bytes::new(),
    };
    let (tx_hash, block) = next_tx();
    ChainReceipt::new(tx_hash, Some(block), vec![log(amb, &event)])
}

/// A confirmed transaction without logs.
pub fn execution_receipt() -> ChainReceipt {
    let (tx_hash, block) = next_tx();
    ChainReceipt::new(tx_hash, Some(block), Vec::new())
}

pub fn reverted_receipt() -> ChainReceipt {
    let (tx_hash, block) = next_tx();
    ChainReceipt::reverted(tx_hash, Some(block))
}

/// A `RequestFulfilled` log from `contract` for request `id`.
pub fn fulfilled_log(contract: Address, id: MessageId, words: &[u64], payment: u64) -> Log {
    let event = RequestFulfilled {
        requestId: id.as_u256(),
        randomWords: words.iter().copied().map(U256::from).collect(),
        payment: U256::from(payment),
    };
    log(contract, &event)
}

/// Shorthand for a message id from a small integer.
pub fn message_id(value: u64) -> MessageId {
    MessageId::from(B256::from(U256::from(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResponseFilter;

    #[tokio::test]
    async fn test_emit_reaches_matching_subscriptions_only() {
        let client = FakeChainClient::new(5);
        let consumer = Address::repeat_byte(0x0c);
        let first = client
            .subscribe(&ResponseFilter::new(consumer, message_id(1)).to_log_filter())
            .await
            .unwrap();
        let _other = client
            .subscribe(&Filter::new().address(Address::repeat_byte(0x0d)))
            .await
            .unwrap();

        assert_eq!(client.emit_log(fulfilled_log(consumer, message_id(1), &[1], 1)), 1);

        client.unsubscribe(first.id()).await.unwrap();
        assert_eq!(client.emit_log(fulfilled_log(consumer, message_id(1), &[1], 1)), 0);
        assert_eq!(client.live_subscriptions(), 1);
    }

    #[tokio::test]
    async fn test_paused_release_completes_on_resume() {
        let client = Arc::new(FakeChainClient::new(5));
        let subscription = client.subscribe(&Filter::new()).await.unwrap();
        client.pause_releases();

        let release = {
            let client = client.clone();
            tokio::spawn(async move { client.unsubscribe(subscription.id()).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(client.total_releases(), 0);

        client.resume_releases();
        release.await.unwrap().unwrap();
        client.wait_for_releases(1).await;
        assert_eq!(client.live_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_unscripted_transaction_fails() {
        let client = FakeChainClient::new(5);
        let err = client
            .submit_transaction(Address::ZERO, Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "Provider");
        assert_eq!(client.submitted_to(Address::ZERO), 1);
    }
}
