//! # Network Subsystem
//!
//! Tracks the active chain, the set of known chains, and the health of
//! each chain's RPC endpoint pool.
//!
//! Per chain: an ordered endpoint list, per-endpoint health counters with
//! a failure cooldown, and a routing strategy: `round-robin` (advance on
//! failure), `sticky` (advance after a consecutive-failure threshold), or
//! `failover` (strict order, always prefer the earliest healthy
//! endpoint).
//!
//! The controller also owns the eip155 namespace-client port: callers ask
//! it for a client bound to a chain's currently-active endpoint and report
//! the call outcome back so rotation and recovery work.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod pool;
pub mod ports;
pub mod service;
pub mod test_support;
pub mod topics;

pub use ports::{ClientFactory, Eip155Client};
pub use service::{NetworkConfig, NetworkController};

/// Default failure cooldown applied to an endpoint.
pub const DEFAULT_COOLDOWN_MS: u64 = 10_000;

/// Default consecutive-failure threshold for the sticky strategy.
pub const DEFAULT_STICKY_THRESHOLD: u32 = 3;
