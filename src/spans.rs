//! OpenTelemetry span helpers for relay operations
//!
//! Span names are static and every attribute is structured, so traces from
//! different runs can be grouped by stage. Error fields start out empty and
//! are filled in by [`record_error`] when a stage fails.
//!
//! # Example
//!
//! ```rust,no_run
//! use hashi_vrf_rs::{spans, MessageId};
//! use alloy_primitives::{Address, U256};
//! use std::time::Duration;
//!
//! let span = spans::await_response(
//!     MessageId::from(U256::from(0xabc)),
//!     Address::ZERO,
//!     Duration::from_secs(600),
//! );
//! let _guard = span.enter();
//! // Custom correlation logic here
//! ```

use std::time::Duration;

use alloy_primitives::Address;
use tracing::Span;

use crate::error::RelayError;
use crate::protocol::{MessageEnvelope, MessageId};

/// Create the root span for one relay run.
///
/// Parent: caller's span, if any
/// Children: one span per stage
#[inline]
pub fn relay_request(envelope: &MessageEnvelope) -> Span {
    tracing::info_span!(
        "hashi_vrf.relay_request",
        source_chain_id = envelope.source_chain_id(),
        destination_chain_id = envelope.dest_chain_id(),
        target = %envelope.target(),
        message_id = tracing::field::Empty,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.stage = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for dispatching an envelope through Yaho.
///
/// Parent: hashi_vrf.relay_request
/// Children: transaction submission on the source chain
#[inline]
pub fn dispatch_message(envelope: &MessageEnvelope, yaho: Address) -> Span {
    tracing::info_span!(
        "hashi_vrf.dispatch_message",
        source_chain_id = envelope.source_chain_id(),
        destination_chain_id = envelope.dest_chain_id(),
        yaho = %yaho,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for requesting a signature from the attestor.
#[inline]
pub fn request_attestation(envelope: &MessageEnvelope, encoded_len: usize) -> Span {
    tracing::info_span!(
        "hashi_vrf.request_attestation",
        target = %envelope.target(),
        encoded_len = encoded_len,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for registering an attestation with the destination AMB.
#[inline]
pub fn register_attestation(amb: Address, destination_chain_id: u64) -> Span {
    tracing::info_span!(
        "hashi_vrf.register_attestation",
        amb = %amb,
        destination_chain_id = destination_chain_id,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for executing a registered message through Yaru.
#[inline]
pub fn execute_message(message_id: MessageId, yaru: Address) -> Span {
    tracing::info_span!(
        "hashi_vrf.execute_message",
        message_id = %message_id,
        yaru = %yaru,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for waiting on the response event.
///
/// Parent: hashi_vrf.relay_request
/// Children: log subscription and unsubscribe calls
#[inline]
pub fn await_response(message_id: MessageId, contract: Address, timeout: Duration) -> Span {
    tracing::info_span!(
        "hashi_vrf.await_response",
        message_id = %message_id,
        contract = %contract,
        timeout_secs = timeout.as_secs(),
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Record error attributes on `span`.
///
/// Follows OpenTelemetry semantic conventions:
/// - error.type: the [`RelayError::kind`] of the error
/// - error.message: human-readable error message
pub fn record_error(span: &Span, error: &RelayError) {
    span.record("error.type", error.kind());
    span.record("error.message", error.to_string());
    span.record("otel.status_code", "ERROR");
}

/// Record error attributes with custom context on the current span.
///
/// # Example
///
/// ```rust,no_run
/// use hashi_vrf_rs::spans;
///
/// let span = tracing::info_span!("hashi_vrf.operation", error.type = tracing::field::Empty);
/// let _guard = span.enter();
///
/// spans::record_error_with_context(
///     "SubscriptionError",
///     "log stream ended",
///     Some("node closed the WebSocket"),
/// );
/// ```
pub fn record_error_with_context(
    error_type: &str,
    error_message: &str,
    additional_context: Option<&str>,
) {
    let current_span = Span::current();
    current_span.record("error.type", error_type);
    current_span.record("error.message", error_message);
    current_span.record("otel.status_code", "ERROR");

    if let Some(context) = additional_context {
        current_span.record("error.context", context);
    }
}
