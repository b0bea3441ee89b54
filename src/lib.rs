//! # hashi-vrf-rs
//!
//! Cross-chain VRF requests over Hashi and the Arbitrary Message Bridge.
//!
//! A request is dispatched through Yaho on the source chain, attested,
//! registered with the destination AMB, executed through Yaru, and finally
//! correlated with the VRF consumer's `RequestFulfilled` event on the
//! destination chain.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hashi_vrf_rs::providers::{AlloyChainClient, AmbHelperAttestor};
//! use hashi_vrf_rs::{MessageEnvelope, RelayConfig, RelayError, RelayPipeline};
//! use alloy_provider::ProviderBuilder;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), RelayError> {
//! let config = RelayConfig::from_env()?;
//!
//! let chiado = ProviderBuilder::new().connect(config.source.rpc_url.as_str()).await?;
//! let goerli = ProviderBuilder::new().connect(config.destination.rpc_url.as_str()).await?;
//!
//! let source = Arc::new(AlloyChainClient::new(chiado, config.source.chain_id));
//! let destination = Arc::new(AlloyChainClient::new(goerli, config.destination.chain_id));
//! let helper = config.amb_helper.ok_or_else(|| RelayError::InvalidConfig("no helper".into()))?;
//! let attestor = Arc::new(AmbHelperAttestor::new(Arc::clone(&destination), helper));
//!
//! let pipeline = RelayPipeline::builder()
//!     .config(config.clone())
//!     .source_client(source)
//!     .destination_client(destination)
//!     .attestor(attestor)
//!     .build()?;
//!
//! let envelope = MessageEnvelope::request_random_words(
//!     config.source.chain_id,
//!     config.destination.chain_id,
//!     config.response_contract,
//! );
//! let record = pipeline.run(envelope, CancellationToken::new()).await;
//! match record.into_outcome() {
//!     Ok(response) => println!("random words: {:?}", response.random_words()),
//!     Err(failure) => eprintln!("relay failed: {failure}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Public API
//!
//! - [`RelayPipeline`], [`RequestHandle`] and [`RequestRecord`] - running and observing relays
//! - [`MessageDispatcher`], [`AttestationRelay`], [`MessageExecutor`], [`ResponseCorrelator`] - the individual stages
//! - [`ChainClient`] and [`AttestationProvider`] - collaborator traits
//! - [`RelayConfig`] and [`MessageIdPolicy`] - configuration
//! - [`RelayError`] and [`Result`] - error types
//! - [`providers`] - Alloy and HTTP implementations of the traits
//! - [`testing`] - in-memory fakes

pub mod chain;
pub mod contracts;
mod error;
mod protocol;
pub mod providers;
mod receipt;
mod relay;
mod traits;

pub use chain::HashiDeployment;
pub use error::{RelayError, Result};
pub use protocol::{
    Attestation, MessageEnvelope, MessageId, RandomnessResponse, ResponseFilter,
    SignatureRequest, SignatureResponse,
};
pub use receipt::ChainReceipt;
pub use relay::{
    AttestationRelay, ExecutionConfirmation, MessageDispatcher, MessageExecutor,
    MessageIdPolicy, NetworkConfig, PipelineState, RelayConfig, RelayPipeline, RequestHandle,
    RequestRecord, ResponseCorrelator, StageFailure, SubscriptionGuard,
    DEFAULT_RESPONSE_TIMEOUT_SECS, ENV_PREFIX,
};
pub use traits::{AttestationProvider, ChainClient, LogSubscription, SubscriptionId};

// Public module for advanced users who need custom instrumentation
pub mod spans;

// Fakes for exercising the pipeline without live networks
pub mod testing;
