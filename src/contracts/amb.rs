//! Arbitrary Message Bridge contract bindings and wrappers
//!
//! The destination-side AMB registers a message once it is presented with the
//! encoded envelope and a valid validator signature. The AMB helper exposes
//! those signatures through a view function.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{sol, SolCall};
use tracing::{debug, info};

use crate::protocol::Attestation;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IAmb {
        event MessageDispatched(bytes32 indexed messageId, bytes encodedData);

        function executeSignature(bytes data, bytes signatures) external;
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IAmbHelper {
        function getSignature(bytes encodedData) external view returns (bytes);
    }
}

/// The AMB contract on the destination chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbContract {
    address: Address,
}

impl AmbContract {
    pub fn new(address: Address) -> Self {
        debug!(
            contract_address = %address,
            event = "amb_contract_initialized"
        );
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Calldata for `executeSignature`, consuming the attestation.
    pub fn execute_signature_calldata(&self, encoded: &Bytes, attestation: Attestation) -> Bytes {
        info!(
            encoded_len = encoded.len(),
            attestation_len = attestation.len(),
            contract_address = %self.address,
            event = "execute_signature_calldata_created"
        );

        IAmb::executeSignatureCall {
            data: encoded.clone(),
            signatures: attestation.into_bytes(),
        }
        .abi_encode()
        .into()
    }
}

/// Read-only helper that returns validator signatures for encoded envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbHelperContract {
    address: Address,
}

impl AmbHelperContract {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn get_signature_calldata(&self, encoded: &Bytes) -> Bytes {
        IAmbHelper::getSignatureCall {
            encodedData: encoded.clone(),
        }
        .abi_encode()
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_signature_calldata() {
        let amb = AmbContract::new(Address::repeat_byte(0x07));
        let encoded = Bytes::from_static(&[0xaa; 64]);
        let attestation = Attestation::new(Bytes::from_static(&[0x51; 65])).unwrap();

        let calldata = amb.execute_signature_calldata(&encoded, attestation);
        let decoded = IAmb::executeSignatureCall::abi_decode(&calldata).unwrap();

        assert_eq!(decoded.data, encoded);
        assert_eq!(decoded.signatures.len(), 65);
    }

    #[test]
    fn test_get_signature_calldata_selector() {
        let helper = AmbHelperContract::new(Address::repeat_byte(0x08));
        let calldata = helper.get_signature_calldata(&Bytes::from_static(&[1, 2, 3]));

        assert_eq!(&calldata[..4], IAmbHelper::getSignatureCall::SELECTOR.as_slice());
    }
}
