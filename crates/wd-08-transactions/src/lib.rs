//! # Transaction Subsystem
//!
//! Carries a user-authorized transaction from draft to a terminal state:
//!
//! ```text
//! pending ──approve──▶ approved ──sign──▶ signed ──broadcast──▶ broadcast
//!    │                                                             │
//!    │                                                             ├── receipt.success ──▶ confirmed
//!    │                                                             ├── receipt.failure ──▶ failed
//!    │                                                             ├── replacement     ──▶ replaced
//!    │                                                             └── timeout         ──▶ failed
//!    └──reject──▶ failed (userRejected)
//! ```
//!
//! Every transition is CAS-guarded through the transactions store: the
//! write applies only while the persisted status still matches, and a
//! mismatch is a benign race the other writer won.
//!
//! The receipt tracker polls per in-flight transaction with exponential
//! backoff (3s doubling to 30s, 20 attempts), detects replacement by
//! nonce advance, and resumes `broadcast` rows on cold start while
//! failing stale `pending` rows that outlived their session.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod assembly;
pub mod draft;
pub mod machine;
pub mod service;
pub mod topics;
pub mod tracker;

pub use service::{TransactionConfig, TransactionController};
pub use tracker::{ReceiptTracker, TrackerConfig};
