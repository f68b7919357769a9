//! Time source port.
//!
//! Abstracted so record timestamps and TTL arithmetic are deterministic in
//! tests. Timer scheduling itself uses the tokio clock, which tests pause.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Milliseconds since the unix epoch.
pub type Timestamp = u64;

/// Source of wall-clock timestamps.
pub trait TimeSource: Send + Sync {
    /// The current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Manually-advanced clock for tests.
#[derive(Debug, Default)]
pub struct MockTimeSource {
    time: AtomicU64,
}

impl MockTimeSource {
    #[must_use]
    pub fn new(initial: Timestamp) -> Arc<Self> {
        Arc::new(Self {
            time: AtomicU64::new(initial),
        })
    }

    pub fn advance(&self, ms: u64) {
        self.time.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, time: Timestamp) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_source() {
        let source = SystemTimeSource;
        // After Jan 1, 2020.
        assert!(source.now() > 1_577_836_800_000);
    }

    #[test]
    fn test_mock_time_source() {
        let source = MockTimeSource::new(1_000);
        assert_eq!(source.now(), 1_000);
        source.advance(500);
        assert_eq!(source.now(), 1_500);
        source.set(3_000);
        assert_eq!(source.now(), 3_000);
    }
}
