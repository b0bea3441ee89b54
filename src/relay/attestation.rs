use std::sync::Arc;

use alloy_primitives::{Address, Bytes};
use tracing::{error, info};

use crate::contracts::amb::{AmbContract, IAmb::MessageDispatched};
use crate::error::{RelayError, Result};
use crate::protocol::{Attestation, MessageEnvelope, MessageId};
use crate::traits::{AttestationProvider, ChainClient};

/// Obtains attestations and registers them with the destination AMB.
#[derive(Debug)]
pub struct AttestationRelay<C, A> {
    client: Arc<C>,
    attestor: Arc<A>,
    amb: AmbContract,
}

fn rejected(reason: impl Into<String>) -> RelayError {
    RelayError::AttestationRejected {
        reason: reason.into(),
    }
}

impl<C, A> AttestationRelay<C, A>
where
    C: ChainClient,
    A: AttestationProvider,
{
    pub fn new(client: Arc<C>, attestor: Arc<A>, amb: Address) -> Self {
        Self {
            client,
            attestor,
            amb: AmbContract::new(amb),
        }
    }

    /// Asks the attestor to sign the envelope's canonical encoding.
    pub async fn request_attestation(&self, envelope: &MessageEnvelope) -> Result<Attestation> {
        let encoded = envelope.canonical_encoding();
        self.attestor
            .request_signature(&encoded)
            .await
            .map_err(|e| match e {
                e @ RelayError::AttestationUnavailable { .. } => e,
                other => RelayError::AttestationUnavailable {
                    reason: other.to_string(),
                },
            })
    }

    /// Presents `encoded` and its attestation to the AMB and returns the id
    /// the AMB registered the message under.
    ///
    /// The attestation is consumed whether or not registration succeeds.
    pub async fn register_attestation(
        &self,
        encoded: &Bytes,
        attestation: Attestation,
    ) -> Result<MessageId> {
        let calldata = self.amb.execute_signature_calldata(encoded, attestation);
        let receipt = self
            .client
            .submit_transaction(self.amb.address(), calldata)
            .await
            .map_err(|e| rejected(e.to_string()))?;

        if !receipt.is_success() {
            error!(
                tx_hash = %receipt.tx_hash(),
                event = "registration_reverted"
            );
            return Err(rejected(format!(
                "transaction {} reverted",
                receipt.tx_hash()
            )));
        }

        let event = receipt
            .find_event::<MessageDispatched>(self.amb.address())
            .ok_or_else(|| {
                rejected(format!(
                    "no MessageDispatched event in transaction {}",
                    receipt.tx_hash()
                ))
            })?;

        let message_id = MessageId::from(event.messageId);
        info!(
            tx_hash = %receipt.tx_hash(),
            message_id = %message_id,
            event = "attestation_registered"
        );
        Ok(message_id)
    }
}
