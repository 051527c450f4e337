//! Push-based value feeds.
//!
//! A feed holds the latest published value and pushes every new value (or
//! refresh failure) to registered subscriber callbacks. Subscriptions have an
//! explicit lifecycle: they detach on `unsubscribe()` or when dropped, so an
//! owner that is torn down never keeps receiving updates.

pub mod bus;
pub mod in_memory_bus;

pub use bus::{Feed, FeedEvent, FeedHandler, Subscription, SubscriptionId};
pub use in_memory_bus::InMemoryFeed;
