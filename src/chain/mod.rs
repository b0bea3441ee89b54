//! Chain-specific deployment lookups
//!
//! Maps [`NamedChain`] values onto the Hashi, AMB and VRF deployments the relay
//! can use on that chain.

mod addresses;

pub use addresses::*;

use alloy_chains::NamedChain;
use alloy_primitives::Address;

use crate::error::{RelayError, Result};

/// Hashi deployments known for a chain
pub trait HashiDeployment {
    /// The Yaho dispatcher, when this chain can be a relay source
    fn yaho_address(&self) -> Result<Address>;
    /// Adapters Yaho dispatches through
    fn source_adapters(&self) -> Result<Vec<Address>>;
    /// The Yaru executor, when this chain can be a relay destination
    fn yaru_address(&self) -> Result<Address>;
    /// The AMB that registers signatures and serves as Yaru's adapter
    fn amb_address(&self) -> Result<Address>;
    /// The AMB helper that exposes validator signatures
    fn amb_helper_address(&self) -> Result<Address>;
    /// The VRF consumer deployed on this chain
    fn vrf_consumer_address(&self) -> Result<Address>;
}

fn unsupported(chain: &NamedChain, role: &str) -> RelayError {
    RelayError::InvalidConfig(format!("No {role} deployment known for {chain}"))
}

impl HashiDeployment for NamedChain {
    fn yaho_address(&self) -> Result<Address> {
        match self {
            NamedChain::Chiado => Ok(CHIADO_YAHO_ADDRESS),
            _ => Err(unsupported(self, "Yaho")),
        }
    }

    fn source_adapters(&self) -> Result<Vec<Address>> {
        match self {
            NamedChain::Chiado => Ok(vec![CHIADO_AMB_ADAPTER_ADDRESS]),
            _ => Err(unsupported(self, "AMB adapter")),
        }
    }

    fn yaru_address(&self) -> Result<Address> {
        match self {
            NamedChain::Goerli => Ok(GOERLI_YARU_ADDRESS),
            _ => Err(unsupported(self, "Yaru")),
        }
    }

    fn amb_address(&self) -> Result<Address> {
        match self {
            NamedChain::Goerli => Ok(GOERLI_AMB_ADDRESS),
            _ => Err(unsupported(self, "AMB")),
        }
    }

    fn amb_helper_address(&self) -> Result<Address> {
        match self {
            NamedChain::Goerli => Ok(GOERLI_AMB_HELPER_ADDRESS),
            _ => Err(unsupported(self, "AMB helper")),
        }
    }

    fn vrf_consumer_address(&self) -> Result<Address> {
        match self {
            NamedChain::Goerli => Ok(GOERLI_VRF_CONSUMER_ADDRESS),
            _ => Err(unsupported(self, "VRF consumer")),
        }
    }
}
