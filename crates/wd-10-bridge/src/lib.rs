//! # Bridge Subsystem
//!
//! The two faces of the core:
//!
//! - **Provider bridge**: per-session handshake with a web origin over
//!   an abstract sink, JSON-RPC request/response envelopes into the RPC
//!   engine, and `chainChanged`/`accountsChanged`/`connect`/`disconnect`
//!   event fan-out. Losing a session expires its pending approvals as
//!   `session_lost`.
//! - **UI bridge**: named `ui.*` methods the trusted interface drives,
//!   plus a denormalized snapshot re-derived from every controller on
//!   each publication and emitted as `ui:snapshotChanged`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod provider;
pub mod snapshot;
pub mod ui;
pub mod wire;

pub use provider::{ProviderBridge, ProviderSink};
pub use snapshot::{UiSnapshot, UI_SNAPSHOT_CHANGED};
pub use ui::UiBridge;
pub use wire::{Envelope, EnvelopeBody, JsonRpcRequest, JsonRpcResponse, PROVIDER_CHANNEL};
