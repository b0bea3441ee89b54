use std::fmt;

use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};

/// Bridge-assigned identifier of a relayed message.
///
/// Message ids are always read out of an event emitted by a bridge contract;
/// they are never derived locally. The same 32 bytes are interpreted as a
/// `bytes32` by the bridges and as a `uint256` request id by the VRF consumer.
///
/// # Example
///
/// ```rust
/// use hashi_vrf_rs::MessageId;
/// use alloy_primitives::U256;
///
/// let id = MessageId::from(U256::from(0xabc));
/// assert_eq!(id.as_u256(), U256::from(0xabc));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(B256);

impl MessageId {
    /// Wraps raw `bytes32` emitted by a bridge.
    pub const fn new(raw: B256) -> Self {
        Self(raw)
    }

    /// Returns the id as `bytes32`
    pub const fn as_b256(&self) -> B256 {
        self.0
    }

    /// Returns the id as the `uint256` request id used by response events
    pub fn as_u256(&self) -> U256 {
        U256::from_be_bytes(self.0 .0)
    }
}

impl From<B256> for MessageId {
    fn from(raw: B256) -> Self {
        Self(raw)
    }
}

impl From<U256> for MessageId {
    fn from(value: U256) -> Self {
        Self(B256::from(value.to_be_bytes::<32>()))
    }
}

impl From<MessageId> for B256 {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
