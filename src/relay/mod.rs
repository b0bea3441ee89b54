// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! The relay pipeline and its stages
//!
//! Each stage owns one remote operation:
//!
//! - [`MessageDispatcher`]: Yaho dispatch on the source chain
//! - [`AttestationRelay`]: attestor signature and AMB registration
//! - [`MessageExecutor`]: Yaru execution on the destination chain
//! - [`ResponseCorrelator`]: response event subscription
//!
//! [`RelayPipeline`] chains them and tracks progress in a [`RequestRecord`].

mod attestation;
mod config;
mod correlator;
mod dispatcher;
mod executor;
mod pipeline;
mod state;
mod subscription;

pub use attestation::AttestationRelay;
pub use config::{
    MessageIdPolicy, NetworkConfig, RelayConfig, DEFAULT_RESPONSE_TIMEOUT_SECS, ENV_PREFIX,
};
pub use correlator::ResponseCorrelator;
pub use dispatcher::MessageDispatcher;
pub use executor::{ExecutionConfirmation, MessageExecutor};
pub use pipeline::{RelayPipeline, RequestHandle};
pub use state::{PipelineState, RequestRecord, StageFailure};
pub use subscription::SubscriptionGuard;
