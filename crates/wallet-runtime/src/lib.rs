//! # Wallet Runtime
//!
//! The composition root. Everything the source kept in module-level
//! singletons lives here instead: one explicit [`Runtime`] value owning
//! the messenger, the storage adapters, every controller, and both
//! bridges, with an `initialize` / `start` / `destroy` lifecycle and no
//! statics.
//!
//! ```text
//!   initialize  ─ load persisted state, seed the catalog, wire
//!                 subscriptions
//!   start       ─ cold-start resume: restart receipt tracking, fail
//!                 stale pending transactions
//!   destroy     ─ unsubscribe everything, stop all timers, lock the
//!                 vault
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod runtime;
pub mod stores;

pub use config::RuntimeConfig;
pub use runtime::Runtime;
pub use stores::StorageAdapters;

/// Install the tracing subscriber, honoring `RUST_LOG`. Call once at
/// process start; returns quietly if a subscriber is already set.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}
