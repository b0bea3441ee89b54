// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
//! Contract bindings for the relay path
//!
//! Alloy `sol!` bindings and thin wrappers for every contract a relay touches:
//!
//! - [`YahoContract`](hashi::YahoContract): source-chain dispatch
//! - [`AmbContract`](amb::AmbContract): destination-chain signature registration
//! - [`AmbHelperContract`](amb::AmbHelperContract): on-chain signature lookup
//! - [`YaruContract`](hashi::YaruContract): destination-chain execution
//! - [`IVrfConsumer`](vrf_consumer::IVrfConsumer): the randomness consumer being called
//!
//! Wrappers only build calldata; submission goes through a
//! [`ChainClient`](crate::ChainClient).

pub mod amb;
pub mod hashi;
pub mod vrf_consumer;
