//! Vault bus topics.

use crate::service::{LockReason, SessionState};
use shared_bus::Topic;

/// Fired once per successful unlock. Keyring hydration hangs off this.
pub const VAULT_UNLOCKED: Topic<()> = Topic::event("vault:unlocked");

/// Fired on every lock with its reason.
pub const VAULT_LOCKED: Topic<LockReason> = Topic::event("vault:locked");

/// Session snapshot: initialized/unlocked flags and auto-lock schedule.
pub const SESSION_CHANGED: Topic<SessionState> = Topic::state("vault:session", |a, b| a == b);
