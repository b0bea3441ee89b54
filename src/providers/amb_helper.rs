//! Attestations read from the on-chain AMB helper.

use std::sync::Arc;

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::contracts::amb::AmbHelperContract;
use crate::error::{RelayError, Result};
use crate::protocol::Attestation;
use crate::traits::{AttestationProvider, ChainClient};

/// Attestation provider that asks the destination chain's AMB helper for the
/// validator signatures collected for an envelope.
#[derive(Debug)]
pub struct AmbHelperAttestor<C> {
    client: Arc<C>,
    helper: AmbHelperContract,
}

impl<C: ChainClient> AmbHelperAttestor<C> {
    pub fn new(client: Arc<C>, helper: Address) -> Self {
        Self {
            client,
            helper: AmbHelperContract::new(helper),
        }
    }

    pub fn helper(&self) -> Address {
        self.helper.address()
    }
}

fn decode_signature(output: &[u8]) -> Result<Bytes> {
    let decoded = DynSolType::Tuple(vec![DynSolType::Bytes])
        .abi_decode_params(output)
        .map_err(|e| RelayError::AttestationUnavailable {
            reason: format!("malformed getSignature output: {e}"),
        })?;

    match decoded {
        DynSolValue::Tuple(mut values) => match values.pop() {
            Some(DynSolValue::Bytes(bytes)) => Ok(bytes.into()),
            _ => Err(RelayError::AttestationUnavailable {
                reason: "getSignature returned no bytes".to_string(),
            }),
        },
        _ => Err(RelayError::AttestationUnavailable {
            reason: "getSignature returned an unexpected shape".to_string(),
        }),
    }
}

#[async_trait]
impl<C: ChainClient> AttestationProvider for AmbHelperAttestor<C> {
    #[instrument(skip(self, encoded), fields(helper = %self.helper.address(), encoded_len = encoded.len()))]
    async fn request_signature(&self, encoded: &Bytes) -> Result<Attestation> {
        let calldata = self.helper.get_signature_calldata(encoded);
        let output = self
            .client
            .call(self.helper.address(), calldata)
            .await
            .map_err(|e| RelayError::AttestationUnavailable {
                reason: format!("getSignature call failed: {e}"),
            })?;

        let signature = decode_signature(&output)?;
        debug!(
            signature_len = signature.len(),
            event = "attestation_received"
        );
        Attestation::new(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeChainClient;

    fn encoded_bytes(value: &[u8]) -> Bytes {
        DynSolValue::Tuple(vec![DynSolValue::Bytes(value.to_vec())])
            .abi_encode_params()
            .into()
    }

    #[tokio::test]
    async fn test_signature_is_read_from_helper() {
        let helper = Address::repeat_byte(0x42);
        let client = Arc::new(FakeChainClient::new(5));
        client.set_call_response(helper, encoded_bytes(&[0x51; 65]));

        let attestor = AmbHelperAttestor::new(client.clone(), helper);
        let attestation = attestor
            .request_signature(&Bytes::from_static(&[1, 2, 3]))
            .await
            .unwrap();

        assert_eq!(attestation.len(), 65);
    }

    #[tokio::test]
    async fn test_empty_signature_is_unavailable() {
        let helper = Address::repeat_byte(0x42);
        let client = Arc::new(FakeChainClient::new(5));
        client.set_call_response(helper, encoded_bytes(&[]));

        let attestor = AmbHelperAttestor::new(client, helper);
        let err = attestor
            .request_signature(&Bytes::from_static(&[1]))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::AttestationUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_missing_helper_is_unavailable() {
        let client = Arc::new(FakeChainClient::new(5));
        let attestor = AmbHelperAttestor::new(client, Address::repeat_byte(0x43));

        let err = attestor
            .request_signature(&Bytes::from_static(&[1]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "AttestationUnavailable");
    }

    #[test]
    fn test_garbage_output_is_unavailable() {
        assert!(decode_signature(&[0xff; 3]).is_err());
    }
}
