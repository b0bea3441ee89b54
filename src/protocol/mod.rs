//! Relay protocol types
//!
//! This module contains the data model shared by every relay stage: the
//! message envelope being carried across chains, the bridge-assigned message
//! identifier, attestations, and the randomness response delivered back.

mod attestation;
mod envelope;
mod message_id;
mod response;

pub use attestation::{Attestation, SignatureRequest, SignatureResponse};
pub use envelope::MessageEnvelope;
pub use message_id::MessageId;
pub use response::{RandomnessResponse, ResponseFilter};
