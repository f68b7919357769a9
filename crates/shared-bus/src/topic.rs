//! Typed topic descriptors.
//!
//! A topic is a name plus a payload type plus a flavor. Descriptors are
//! declared as constants by the publishing crate, so subscriber and
//! publisher agree on the payload type at compile time.

use std::marker::PhantomData;

/// Equality function used by state topics to suppress duplicate
/// publications.
pub type EqualityFn<T> = fn(&T, &T) -> bool;

#[derive(Clone, Copy)]
pub(crate) enum Flavor<T> {
    State { equal: EqualityFn<T> },
    Event,
}

/// A typed topic descriptor.
///
/// ```
/// use shared_bus::Topic;
///
/// pub const CHAIN_CHANGED: Topic<String> = Topic::state("chain:changed", |a, b| a == b);
/// pub const RPC_RECOVERED: Topic<String> = Topic::event("network:recovered");
/// ```
pub struct Topic<T> {
    name: &'static str,
    pub(crate) flavor: Flavor<T>,
    _payload: PhantomData<fn(T)>,
}

impl<T> Topic<T> {
    /// Declare a state topic with an equality function.
    #[must_use]
    pub const fn state(name: &'static str, equal: EqualityFn<T>) -> Self {
        Self {
            name,
            flavor: Flavor::State { equal },
            _payload: PhantomData,
        }
    }

    /// Declare an event topic.
    #[must_use]
    pub const fn event(name: &'static str) -> Self {
        Self {
            name,
            flavor: Flavor::Event,
            _payload: PhantomData,
        }
    }

    /// The topic's unique name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this topic caches its last payload.
    #[must_use]
    pub fn is_state(&self) -> bool {
        matches!(self.flavor, Flavor::State { .. })
    }
}
