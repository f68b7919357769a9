//! Attention service.
//!
//! A deduplicated queue of "the UI should surface now" requests. Dedup
//! key is `(reason, origin, method, chainRef, namespace)`; a request
//! matching a live entry is dropped.

use crate::topics::ATTENTION_CHANGED;
use crate::DEFAULT_ATTENTION_TTL_MS;
use parking_lot::Mutex;
use shared_bus::Messenger;
use shared_types::{AttentionReason, AttentionRequest, ChainRef, TimeSource};
use std::sync::Arc;
use tracing::debug;

/// Attention tuning.
#[derive(Debug, Clone, Copy)]
pub struct AttentionConfig {
    pub ttl_ms: u64,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_ATTENTION_TTL_MS,
        }
    }
}

/// TTL-deduplicated UI-surfacing queue.
pub struct AttentionService {
    messenger: Messenger,
    time: Arc<dyn TimeSource>,
    config: AttentionConfig,
    queue: Mutex<Vec<AttentionRequest>>,
}

impl AttentionService {
    pub fn new(messenger: Messenger, time: Arc<dyn TimeSource>, config: AttentionConfig) -> Self {
        Self {
            messenger,
            time,
            config,
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Enqueue a request. Returns `false` when an equivalent live entry
    /// already exists.
    pub fn request(
        &self,
        reason: AttentionReason,
        origin: &str,
        method: &str,
        chain_ref: Option<ChainRef>,
        namespace: Option<String>,
    ) -> bool {
        let now = self.time.now();
        let request = AttentionRequest {
            reason,
            origin: origin.to_string(),
            method: method.to_string(),
            chain_ref,
            namespace,
            requested_at: now,
            expires_at: now + self.config.ttl_ms,
        };

        let enqueued = {
            let mut queue = self.queue.lock();
            queue.retain(|entry| entry.expires_at > now);
            if queue
                .iter()
                .any(|entry| entry.dedup_key() == request.dedup_key())
            {
                false
            } else {
                queue.push(request);
                true
            }
        };

        if enqueued {
            debug!(?reason, origin, method, "attention requested");
            self.publish();
        }
        enqueued
    }

    /// The live queue, pruned of expired entries.
    #[must_use]
    pub fn list(&self) -> Vec<AttentionRequest> {
        let now = self.time.now();
        let mut queue = self.queue.lock();
        queue.retain(|entry| entry.expires_at > now);
        queue.clone()
    }

    /// Drop every entry (the UI surfaced).
    pub fn clear(&self) {
        self.queue.lock().clear();
        self.publish();
    }

    fn publish(&self) {
        self.messenger.publish(&ATTENTION_CHANGED, self.list());
    }
}
