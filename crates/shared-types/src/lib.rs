//! # Shared Types - Domain Types for the Warden Wallet Core
//!
//! Defines the vocabulary every subsystem speaks: chain references, account
//! identifiers, capabilities, shared records, the domain error, and the
//! request context attached to every inbound call.
//!
//! ## Clusters
//!
//! - **Identity**: [`ChainRef`], [`AccountId`], [`Origin`]
//! - **Authorization**: [`Capability`], [`PermissionRecord`]
//! - **Lifecycle records**: [`TransactionRecord`], [`ApprovalTask`],
//!   [`AttentionRequest`]
//! - **Errors**: [`WalletError`], [`ErrorReason`]

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod capability;
pub mod chain;
pub mod context;
pub mod entities;
pub mod errors;
pub mod time;

pub use capability::Capability;
pub use chain::{AccountId, ChainRef};
pub use context::{Invocation, Origin, RequestContext};
pub use entities::{
    AccountRecord, ApprovalKind, ApprovalTask, AttentionReason, AttentionRequest, ChainMetadata,
    KeyringKind, KeyringMeta, NativeCurrency, PermissionRecord, TransactionCall, TransactionRecord,
    TransactionStatus, VaultCiphertext, VAULT_ALGORITHM,
};
pub use errors::{ErrorReason, ExpiryReason, WalletError, WalletResult};
pub use time::{SystemTimeSource, TimeSource, Timestamp};

/// Protocol version stamped into persisted snapshots and wire envelopes.
pub const PROTOCOL_VERSION: u16 = 1;
