//! # Warden Unified Test Suite
//!
//! Cross-subsystem flows exercised against a fully-wired runtime with
//! in-memory storage adapters and a scripted RPC client: onboarding and
//! auto-lock, deterministic HD derivation, the `eth_requestAccounts`
//! grant flow, the full send-transaction lifecycle, replacement
//! detection, and session-loss expiry.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod support;

#[cfg(test)]
mod integration;
