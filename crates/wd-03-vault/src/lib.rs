//! # Vault Subsystem
//!
//! Custodies the encrypted keyring payload and the per-session symmetric
//! key.
//!
//! ```text
//! [locked] ──unlock(password)──▶ [unlocked] ──lock(reason)──▶ [locked]
//!                                    │
//!                                    └── auto-lock timer ──▶ lock("timeout")
//! ```
//!
//! The 256-bit session key is derived with PBKDF2-SHA-256 and lives in a
//! zeroize-on-drop buffer. `encrypt`/`decrypt`/`export_key` operate only
//! while unlocked; `lock` wipes the key and is idempotent. The auto-lock
//! controller keeps at most one pending timer: unlock, an explicit reset,
//! and duration changes each cancel and reschedule it.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod autolock;
pub mod ciphertext;
pub mod service;
pub mod topics;

pub use autolock::AutoLockController;
pub use service::{LockReason, SessionState, VaultConfig, VaultService};

/// Auto-lock clamp floor: one minute.
pub const MIN_AUTO_LOCK_MS: u64 = 60_000;

/// Auto-lock clamp ceiling: sixty minutes.
pub const MAX_AUTO_LOCK_MS: u64 = 3_600_000;

/// Default auto-lock duration: five minutes.
pub const DEFAULT_AUTO_LOCK_MS: u64 = 300_000;

/// Round to whole minutes, then clamp to the permitted window.
#[must_use]
pub fn clamp_auto_lock_duration(ms: u64) -> u64 {
    let minutes = (ms + 30_000) / 60_000;
    (minutes * 60_000).clamp(MIN_AUTO_LOCK_MS, MAX_AUTO_LOCK_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_boundaries() {
        assert_eq!(clamp_auto_lock_duration(0), MIN_AUTO_LOCK_MS);
        assert_eq!(clamp_auto_lock_duration(61 * 60_000), MAX_AUTO_LOCK_MS);
        // 59.5 minutes rounds up to 60.
        assert_eq!(clamp_auto_lock_duration(59 * 60_000 + 30_000), MAX_AUTO_LOCK_MS);
        // 59.4 minutes rounds down to 59.
        assert_eq!(clamp_auto_lock_duration(59 * 60_000 + 24_000), 59 * 60_000);
        assert_eq!(clamp_auto_lock_duration(DEFAULT_AUTO_LOCK_MS), DEFAULT_AUTO_LOCK_MS);
    }
}
