//! # Chain Registry Subsystem
//!
//! Owns what the core knows about chains:
//!
//! - **Address forms** per namespace: canonical (storage/comparison) and
//!   display (EIP-55 for eip155).
//! - **Metadata validation**: EIP-3085-like input is normalized (decimal
//!   chain reference, lowercased hex id, deduplicated http(s) URLs) or
//!   rejected at the gate.
//! - **Known-chains catalog**: seeded entries for the common EVM chains,
//!   extended by `wallet_addEthereumChain`.
//!
//! The registry persists through the chain-registry storage port and holds
//! no other state.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod catalog;
pub mod metadata;
pub mod namespace;
pub mod service;

pub use metadata::{normalize_chain_metadata, Eip3085ChainInput};
pub use namespace::{canonicalize_address, format_address};
pub use service::ChainRegistry;

/// Schema version stamped into registry rows.
pub const REGISTRY_SCHEMA_VERSION: u16 = 1;
