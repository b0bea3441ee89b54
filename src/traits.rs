//! Core trait abstractions for the relay pipeline.
//!
//! Every remote collaborator the pipeline talks to sits behind one of these
//! traits, so the same stages run against live networks through the
//! [`providers`](crate::providers) module and against in-memory fakes through
//! the [`testing`](crate::testing) module.
//!
//! # Example: Implementing a Test Fake
//!
//! ```rust,ignore
//! use hashi_vrf_rs::{Attestation, AttestationProvider, Result};
//! use alloy_primitives::Bytes;
//!
//! struct StaticAttestor(Bytes);
//!
//! #[async_trait::async_trait]
//! impl AttestationProvider for StaticAttestor {
//!     async fn request_signature(&self, _encoded: &Bytes) -> Result<Attestation> {
//!         Attestation::new(self.0.clone())
//!     }
//! }
//! ```

use std::fmt;

use alloy_primitives::{Address, Bytes, B256};
use alloy_rpc_types::{Filter, Log};
use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::protocol::Attestation;
use crate::receipt::ChainReceipt;

/// Node-assigned identifier of a log subscription.
pub type SubscriptionId = B256;

/// A live log subscription: its id and the stream of matching logs.
///
/// Dropping the stream does not cancel the subscription on the node side;
/// callers release it through [`ChainClient::unsubscribe`].
pub struct LogSubscription {
    id: SubscriptionId,
    stream: BoxStream<'static, Log>,
}

impl LogSubscription {
    pub fn new(id: SubscriptionId, stream: BoxStream<'static, Log>) -> Self {
        Self { id, stream }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn into_parts(self) -> (SubscriptionId, BoxStream<'static, Log>) {
        (self.id, self.stream)
    }
}

impl fmt::Debug for LogSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSubscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Read/write connection to one network.
///
/// A client is created once per network and shared by every stage and every
/// concurrent run that targets that network. Nonce sequencing is left to the
/// signer layer behind the client.
///
/// # Test Scenarios
///
/// Implementing this trait with fakes enables testing:
/// - Reverted dispatch, registration and execution transactions
/// - Receipts missing the expected bridge event
/// - Subscriptions that fail to establish
/// - Late or foreign response events
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The chain id this client is connected to.
    fn chain_id(&self) -> u64;

    /// Submits a transaction and waits until it is confirmed.
    ///
    /// A reverted transaction is returned as a receipt with
    /// [`ChainReceipt::is_success`] set to `false`, not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction could not be sent or the receipt
    /// could not be fetched.
    async fn submit_transaction(&self, to: Address, data: Bytes) -> Result<ChainReceipt>;

    /// Executes a read-only call and returns the raw return data.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    /// Registers a log subscription for `filter`.
    async fn subscribe(&self, filter: &Filter) -> Result<LogSubscription>;

    /// Cancels a subscription. Unknown or already released ids are a no-op.
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()>;
}

/// Source of attestations over canonical envelope encodings.
///
/// # Test Scenarios
///
/// Implementing this trait with fakes enables testing:
/// - Attestor outages (5xx responses)
/// - Malformed or empty signatures
#[async_trait]
pub trait AttestationProvider: Send + Sync {
    /// Requests a signature over `encoded`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::AttestationUnavailable`](crate::RelayError::AttestationUnavailable)
    /// when no usable signature could be obtained.
    async fn request_signature(&self, encoded: &Bytes) -> Result<Attestation>;
}
