//! Permission bus topics.

use shared_bus::Topic;
use shared_types::PermissionRecord;

/// The full grant table changed.
pub const PERMISSIONS_CHANGED: Topic<Vec<PermissionRecord>> =
    Topic::state("permissions:changed", |a, b| a == b);
