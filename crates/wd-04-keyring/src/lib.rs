//! # Keyring Subsystem
//!
//! Holds the in-memory account set and performs every signature the core
//! produces. State exists only between vault unlock and lock:
//!
//! - On `vault:unlocked` the service decrypts the payload, re-derives each
//!   HD keyring's accounts deterministically, and builds the address
//!   index.
//! - On `vault:locked` every keyring instance is dropped (zeroing its
//!   secrets) and the index is cleared.
//!
//! Persisted keyring metadata (alias, created-at, backed-up flag) lives in
//! a separate store and survives lock.
//!
//! Secrets never leave the service boundary: derived public addresses
//! cross it, private material does not, except through the explicit
//! export operations that re-verify the vault password first.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod service;
pub mod topics;

pub use domain::payload::{KeyringPayload, PayloadEntry, PAYLOAD_VERSION};
pub use service::KeyringService;
