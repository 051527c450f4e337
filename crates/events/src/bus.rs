//! Feed abstraction (mechanics only).
//!
//! This module provides a **behavior-subject** style pub/sub: the feed caches the
//! latest value, hands it to every new subscriber immediately, and then pushes
//! each subsequent value as it is published.
//!
//! ## Delivery
//!
//! - Delivery is serialized: every handler sees events in publish order, even
//!   when several threads publish at once. A publish that lands while another
//!   call is delivering is handed to that call, so the publishing thread may
//!   return before its own value has been delivered.
//! - Within one event, handlers run in subscription order.
//! - A failed refresh is delivered as [`FeedEvent::Error`]; the cached value is
//!   left untouched so late subscribers still get the last good value.
//! - Handlers must not block: they run inside the publisher's call.

use std::sync::Arc;

/// What a subscriber receives.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent<M> {
    /// A new current value.
    Next(M),
    /// The source failed to produce a value.
    Error(String),
}

/// Subscriber callback.
pub type FeedHandler<M> = Arc<dyn Fn(&FeedEvent<M>) + Send + Sync>;

/// Opaque identifier of a registered handler.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A live registration on a feed.
///
/// Dropping the subscription detaches the handler, which ties the
/// registration to the lifetime of its owner.
pub struct Subscription {
    id: SubscriptionId,
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(id: SubscriptionId, detach: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            detach: Some(Box::new(detach)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    /// Detach the handler now.
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach_now();
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Latest-value feed.
///
/// The trait requires `Send + Sync`; implementations may be shared across
/// tasks and published to from any of them.
pub trait Feed<M>: Send + Sync {
    /// Replace the current value and push it to every subscriber.
    fn publish(&self, value: M);

    /// Push a refresh failure to every subscriber.
    fn fail(&self, error: String);

    /// Register a handler. It receives the current value, when one exists,
    /// before any later event.
    fn subscribe(&self, handler: FeedHandler<M>) -> Subscription;

    /// The cached current value.
    fn latest(&self) -> Option<M>;
}

impl<M, F> Feed<M> for Arc<F>
where
    F: Feed<M> + ?Sized,
{
    fn publish(&self, value: M) {
        (**self).publish(value)
    }

    fn fail(&self, error: String) {
        (**self).fail(error)
    }

    fn subscribe(&self, handler: FeedHandler<M>) -> Subscription {
        (**self).subscribe(handler)
    }

    fn latest(&self) -> Option<M> {
        (**self).latest()
    }
}
