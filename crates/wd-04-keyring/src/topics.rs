//! Keyring bus topics.

use shared_bus::Topic;

/// The in-memory canonical address list changed (hydrate, wipe, derive,
/// import, delete).
pub const ACCOUNTS_CHANGED: Topic<Vec<String>> = Topic::state("accounts:changed", |a, b| a == b);
