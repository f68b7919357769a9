//! The messenger: subscriber table, snapshot cache, synchronous fan-out.

use crate::topic::{Flavor, Topic};
use parking_lot::Mutex;
use shared_types::WalletError;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

type Payload = Arc<dyn Any + Send + Sync>;
type Handler = Arc<dyn Fn(&Payload) -> Result<(), WalletError> + Send + Sync>;

struct Subscriber {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct TopicState {
    snapshot: Option<Payload>,
    subscribers: Vec<Subscriber>,
}

#[derive(Default)]
struct Inner {
    topics: HashMap<&'static str, TopicState>,
}

/// The process-wide pub/sub hub.
///
/// Cheap to clone; all clones share the same subscriber table.
#[derive(Clone, Default)]
pub struct Messenger {
    inner: Arc<Mutex<Inner>>,
    next_id: Arc<AtomicU64>,
}

impl Messenger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a payload.
    ///
    /// For state topics, a payload equal to the cached snapshot (per the
    /// topic's equality function) returns without emitting; otherwise the
    /// snapshot is replaced and every current subscriber is delivered to,
    /// in subscription order. Delivery happens outside the internal lock,
    /// so handlers may publish and subscribe re-entrantly.
    pub fn publish<T: Send + Sync + 'static>(&self, topic: &Topic<T>, payload: T) {
        let delivery: Vec<Handler>;
        let shared: Payload;
        {
            let mut inner = self.inner.lock();
            let state = inner.topics.entry(topic.name()).or_default();

            if let Flavor::State { equal } = &topic.flavor {
                if let Some(previous) = state.snapshot.as_ref().and_then(|p| p.downcast_ref::<T>())
                {
                    if equal(previous, &payload) {
                        return;
                    }
                }
                shared = Arc::new(payload);
                state.snapshot = Some(Arc::clone(&shared));
            } else {
                shared = Arc::new(payload);
            }

            delivery = state
                .subscribers
                .iter()
                .map(|s| Arc::clone(&s.handler))
                .collect();
        }

        debug!(topic = topic.name(), receivers = delivery.len(), "publish");
        for handler in delivery {
            if let Err(error) = handler(&shared) {
                warn!(topic = topic.name(), %error, "subscriber failed; continuing fan-out");
            }
        }
    }

    /// Subscribe to a topic.
    ///
    /// For state topics with a cached snapshot, the handler is invoked
    /// immediately with the cached payload. Returns a handle that removes
    /// the subscription when [`SubscriptionHandle::unsubscribe`] is called.
    pub fn subscribe<T, F>(&self, topic: &Topic<T>, handler: F) -> SubscriptionHandle
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> Result<(), WalletError> + Send + Sync + 'static,
    {
        let name = topic.name();
        let erased: Handler = Arc::new(move |payload: &Payload| match payload.downcast_ref::<T>() {
            Some(typed) => handler(typed),
            None => {
                warn!(topic = name, "payload type mismatch; dropping delivery");
                Ok(())
            }
        });

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let replay = {
            let mut inner = self.inner.lock();
            let state = inner.topics.entry(name).or_default();
            state.subscribers.push(Subscriber {
                id,
                handler: Arc::clone(&erased),
            });
            if topic.is_state() {
                state.snapshot.clone()
            } else {
                None
            }
        };

        if let Some(snapshot) = replay {
            if let Err(error) = erased(&snapshot) {
                warn!(topic = name, %error, "subscriber failed on snapshot replay");
            }
        }

        SubscriptionHandle {
            messenger: Arc::downgrade(&self.inner),
            topic: name,
            id,
        }
    }

    /// The cached snapshot of a state topic, if any has been published.
    #[must_use]
    pub fn snapshot<T: Clone + Send + Sync + 'static>(&self, topic: &Topic<T>) -> Option<T> {
        let inner = self.inner.lock();
        inner
            .topics
            .get(topic.name())
            .and_then(|state| state.snapshot.as_ref())
            .and_then(|payload| payload.downcast_ref::<T>())
            .cloned()
    }

    /// Number of current subscribers on a topic.
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> usize {
        let inner = self.inner.lock();
        inner
            .topics
            .get(name)
            .map_or(0, |state| state.subscribers.len())
    }
}

/// Removes a subscription when asked.
///
/// Held by the subscriber, next to whatever state the handler captures.
/// Dropping the handle without calling [`unsubscribe`](Self::unsubscribe)
/// leaves the subscription in place.
pub struct SubscriptionHandle {
    messenger: Weak<Mutex<Inner>>,
    topic: &'static str,
    id: u64,
}

impl SubscriptionHandle {
    /// Remove the subscription. Idempotent.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.messenger.upgrade() {
            let mut inner = inner.lock();
            if let Some(state) = inner.topics.get_mut(self.topic) {
                state.subscribers.retain(|s| s.id != self.id);
            }
        }
    }
}
