// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Published Hashi and AMB deployment addresses
//!
//! Only the Chiado → Goerli route is deployed with a VRF consumer on the
//! destination side.

use alloy_primitives::{address, Address};

// Hashi

/// Yaho dispatcher on Chiado
pub const CHIADO_YAHO_ADDRESS: Address = address!("0e729b11661B3f1C1E829AAdF764D5C3295e1256");

/// Yaru executor on Goerli
pub const GOERLI_YARU_ADDRESS: Address = address!("2EFf4B88Cfa00180409A5cF2f248CBF6Af4e22D6");

// Arbitrary Message Bridge

/// AMB adapter Yaho dispatches through on Chiado
pub const CHIADO_AMB_ADAPTER_ADDRESS: Address =
    address!("02EF808c1235EC235BdfEf9b5768527D86093711");

/// AMB on Goerli, used both for signature registration and as Yaru's adapter
pub const GOERLI_AMB_ADDRESS: Address = address!("87A19d769D875964E9Cd41dDBfc397B2543764E6");

/// AMB helper exposing collected validator signatures on Goerli
pub const GOERLI_AMB_HELPER_ADDRESS: Address =
    address!("Ed0dC0AA8A61c3Ac912072f50c4c5bd830d79E36");

// Chainlink VRF

/// VRF v2 direct-funding consumer on Goerli
pub const GOERLI_VRF_CONSUMER_ADDRESS: Address =
    address!("a340bb99457D4E676824da9F20bD9df1684B1529");
