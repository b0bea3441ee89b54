use alloy_primitives::{Address, U256};
use alloy_rpc_types::{Filter, Log};
use alloy_sol_types::SolEvent;

use super::MessageId;
use crate::contracts::vrf_consumer::IVrfConsumer::RequestFulfilled;
use crate::error::Result;

/// The randomness delivered back for one relayed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomnessResponse {
    request_id: MessageId,
    random_words: Vec<U256>,
    payment: U256,
}

impl RandomnessResponse {
    pub fn new(request_id: MessageId, random_words: Vec<U256>, payment: U256) -> Self {
        Self {
            request_id,
            random_words,
            payment,
        }
    }

    pub fn request_id(&self) -> MessageId {
        self.request_id
    }

    pub fn random_words(&self) -> &[U256] {
        &self.random_words
    }

    pub fn payment(&self) -> U256 {
        self.payment
    }
}

impl From<RequestFulfilled> for RandomnessResponse {
    fn from(event: RequestFulfilled) -> Self {
        Self {
            request_id: MessageId::from(event.requestId),
            random_words: event.randomWords,
            payment: event.payment,
        }
    }
}

/// Selects the `RequestFulfilled` event for a single request id.
///
/// The consumer does not index `requestId`, so the node-side filter only
/// narrows by contract and event signature; [`ResponseFilter::match_log`]
/// applies the id check to every delivered log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFilter {
    contract: Address,
    request_id: MessageId,
}

impl ResponseFilter {
    pub fn new(contract: Address, request_id: MessageId) -> Self {
        Self {
            contract,
            request_id,
        }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn request_id(&self) -> MessageId {
        self.request_id
    }

    /// The log filter to register with the node.
    pub fn to_log_filter(&self) -> Filter {
        Filter::new()
            .address(self.contract)
            .event_signature(RequestFulfilled::SIGNATURE_HASH)
    }

    /// Returns the response carried by `log` if it belongs to this request.
    ///
    /// Logs from other contracts, other events, or other request ids yield
    /// `Ok(None)`. A log that claims to be `RequestFulfilled` but does not
    /// decode is an error.
    pub fn match_log(&self, log: &Log) -> Result<Option<RandomnessResponse>> {
        if log.address() != self.contract {
            return Ok(None);
        }
        if log.topics().first() != Some(&RequestFulfilled::SIGNATURE_HASH) {
            return Ok(None);
        }

        let event = RequestFulfilled::decode_log_data(log.data())?;
        if event.requestId != self.request_id.as_u256() {
            return Ok(None);
        }

        Ok(Some(event.into()))
    }
}
