//! Production implementations of the relay's trait abstractions.
//!
//! These providers talk to live networks and attestor services. Test code
//! uses the fakes in [`crate::testing`] instead.

mod alloy;
mod amb_helper;
mod http_attestor;

pub use self::alloy::{AlloyChainClient, DEFAULT_GAS_BUFFER_PERCENT, DEFAULT_REQUIRED_CONFIRMATIONS};
pub use self::amb_helper::AmbHelperAttestor;
pub use self::http_attestor::HttpAttestor;
