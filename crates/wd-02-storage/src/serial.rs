//! One-at-a-time write queue.
//!
//! Settings and network-preferences writes are read-modify-write cycles
//! against single-row stores. Running them through this queue removes the
//! interleaving race: within the queue, last write wins.

use std::future::Future;
use tokio::sync::Mutex;

/// Serializes asynchronous critical sections.
#[derive(Default)]
pub struct SerialQueue {
    gate: Mutex<()>,
}

impl SerialQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `operation` after every previously-enqueued operation has
    /// finished.
    pub async fn run<T, F>(&self, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        let _gate = self.gate.lock().await;
        operation.await
    }
}
