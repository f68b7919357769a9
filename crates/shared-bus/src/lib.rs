//! # Shared Bus - In-Process Messenger
//!
//! A single process-wide typed pub/sub hub. Controllers own their state and
//! hold the messenger by reference; the messenger owns only its subscriber
//! table and the last-published snapshot of each state topic. Subscriptions
//! return an unsubscribe handle that is stored next to the subscriber,
//! never inside the messenger, so there are no ownership cycles.
//!
//! ## Topic Flavors
//!
//! - **State topics** cache the last payload. New subscribers replay the
//!   snapshot immediately; publications equal to the cached payload (per
//!   the topic's equality function) do not re-emit.
//! - **Event topics** never cache and always fan out.
//!
//! ## Delivery Contract
//!
//! - Fan-out is synchronous, in subscription order, over a snapshot of the
//!   subscriber set: a subscription made during fan-out does not receive
//!   the in-flight payload, and an unsubscription does not prevent it.
//! - Handlers are fallible. An erring handler is logged and does not abort
//!   delivery to the remaining subscribers.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod messenger;
pub mod topic;

pub use messenger::{Messenger, SubscriptionHandle};
pub use topic::Topic;
