use std::time::Duration;

use thiserror::Error;

use crate::protocol::MessageId;
use crate::relay::PipelineState;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Dispatch failed: {reason}")]
    DispatchFailure { reason: String },

    #[error("Attestation unavailable: {reason}")]
    AttestationUnavailable { reason: String },

    #[error("Attestation rejected: {reason}")]
    AttestationRejected { reason: String },

    #[error("Execution failed: {reason}")]
    ExecutionFailure { reason: String },

    #[error("Timed out after {timeout:?} waiting for response")]
    ResponseTimeout { timeout: Duration },

    #[error("Operation cancelled")]
    OperationCancelled,

    #[error("Subscription error: {reason}")]
    SubscriptionError { reason: String },

    #[error("Message id mismatch: dispatched {dispatched}, registered {registered}")]
    MessageIdMismatch {
        dispatched: MessageId,
        registered: MessageId,
    },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("RPC error: {0}")]
    Rpc(#[from] alloy_json_rpc::RpcError<alloy_transport::TransportErrorKind>),

    #[error("ABI encoding/decoding error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex conversion error: {0}")]
    Hex(#[from] alloy_primitives::hex::FromHexError),
}

impl RelayError {
    /// Static name of the variant, used for span error attributes.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::DispatchFailure { .. } => "DispatchFailure",
            RelayError::AttestationUnavailable { .. } => "AttestationUnavailable",
            RelayError::AttestationRejected { .. } => "AttestationRejected",
            RelayError::ExecutionFailure { .. } => "ExecutionFailure",
            RelayError::ResponseTimeout { .. } => "ResponseTimeout",
            RelayError::OperationCancelled => "OperationCancelled",
            RelayError::SubscriptionError { .. } => "SubscriptionError",
            RelayError::MessageIdMismatch { .. } => "MessageIdMismatch",
            RelayError::InvalidTransition { .. } => "InvalidTransition",
            RelayError::InvalidConfig(_) => "InvalidConfig",
            RelayError::Provider(_) => "Provider",
            RelayError::Network(_) => "Network",
            RelayError::Rpc(_) => "Rpc",
            RelayError::Abi(_) => "Abi",
            RelayError::Json(_) => "Json",
            RelayError::Hex(_) => "Hex",
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let err = RelayError::DispatchFailure {
            reason: "reverted".to_string(),
        };
        assert_eq!(err.kind(), "DispatchFailure");
        assert_eq!(RelayError::OperationCancelled.kind(), "OperationCancelled");
    }

    #[test]
    fn test_display_formats() {
        let err = RelayError::ResponseTimeout {
            timeout: Duration::from_secs(30),
        };
        insta::assert_snapshot!(err.to_string(), @"Timed out after 30s waiting for response");

        let err = RelayError::AttestationUnavailable {
            reason: "attestor returned HTTP 503".to_string(),
        };
        insta::assert_snapshot!(err.to_string(), @"Attestation unavailable: attestor returned HTTP 503");
    }
}
