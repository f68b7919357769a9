//! # Approval Subsystem
//!
//! Every user decision is a rendezvous: an RPC handler enqueues a task
//! and suspends on a one-shot channel; the UI observes the pending list,
//! decides, and finalizes the task. Finalization runs the caller-supplied
//! executor *inside* the controller so side-effects (granting a
//! permission, committing a transaction) land atomically with the
//! decision.
//!
//! ```text
//! [pending] ──resolve(executor ok)──▶ [approved(value)]
//!     │ ──reject──────────────────▶ [rejected(error)]
//!     │ ──ttl / session-lost──────▶ [expired(reason)]
//! ```
//!
//! Terminal states are final; finalizing a task that is no longer pending
//! is a no-op returning `false`, and a task's resolver runs at most once.
//!
//! The attention service rides along: a TTL-deduplicated queue of "the UI
//! should surface now" hints (unlock needed, approval waiting).

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod attention;
pub mod service;
pub mod topics;

pub use attention::{AttentionConfig, AttentionService};
pub use service::{ApprovalConfig, ApprovalController, ApprovalExecutor, ApprovalOutcome};

/// Default time a task may sit in the queue: ten minutes. One TTL covers
/// every approval kind, `send-transaction` included.
pub const DEFAULT_APPROVAL_TTL_MS: u64 = 600_000;

/// Default attention-entry TTL: one minute.
pub const DEFAULT_ATTENTION_TTL_MS: u64 = 60_000;
