//! # RPC Engine Subsystem
//!
//! The ordered middleware chain every request traverses:
//!
//! ```text
//! resolve-invocation ─▶ locked-guard ─▶ permission-guard ─▶ dispatch ─▶ passthrough
//! ```
//!
//! - **resolve-invocation** attaches `{origin, method, namespace,
//!   chainRef}` using the active chain for unset values.
//! - **locked-guard** (untrusted origins only) applies each method's
//!   locked policy: allow, a literal response, or reject with
//!   `session-locked` plus an `unlock-required` attention request.
//!   Unknown methods that are not passthrough reads reject
//!   `method-not-found`.
//! - **permission-guard** (untrusted origins only) enforces `connected`
//!   or capability-`scope` checks.
//! - **dispatch** parses params against the method's schema and runs the
//!   handler.
//! - **passthrough** forwards unhandled methods on the per-namespace
//!   read-only allowlist to the chain's RPC client, reporting the
//!   outcome to the endpoint pool.
//!
//! The trusted UI origin bypasses both guards: it acts as the user and
//! must be able to drive lock/unlock and onboarding.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod controllers;
pub mod eip155;
pub mod engine;
pub mod methods;

pub use controllers::Controllers;
pub use engine::RpcEngine;
pub use methods::{HandlerContext, LockedPolicy, MethodDef, PermissionCheck};

/// Client string answered locally for `web3_clientVersion`.
pub const CLIENT_VERSION: &str = concat!("Warden/v", env!("CARGO_PKG_VERSION"), "/rust");
