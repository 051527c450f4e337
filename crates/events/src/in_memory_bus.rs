//! In-memory latest-value feed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::bus::{Feed, FeedEvent, FeedHandler, Subscription, SubscriptionId};

struct Pending<M> {
    // `None` goes to every subscriber.
    target: Option<SubscriptionId>,
    event: FeedEvent<M>,
}

struct FeedState<M> {
    latest: Option<M>,
    next_id: u64,
    subscribers: Vec<(SubscriptionId, FeedHandler<M>)>,
    queue: VecDeque<Pending<M>>,
    draining: bool,
}

/// In-memory feed.
///
/// - No IO / no async
/// - Events are queued under the internal lock and delivered by a single
///   drainer at a time, so every handler sees them in the order they were
///   queued, whichever thread published them
/// - Handlers run outside the internal lock, so a handler may itself
///   publish, subscribe, unsubscribe or read `latest()`; a nested publish is
///   delivered after the current event, by the call already draining
pub struct InMemoryFeed<M> {
    state: Arc<Mutex<FeedState<M>>>,
}

impl<M> InMemoryFeed<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed that already holds a current value.
    pub fn with_value(value: M) -> Self {
        let feed = Self::default();
        feed.state().latest = Some(value);
        feed
    }

    /// Number of attached handlers.
    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }

    fn state(&self) -> MutexGuard<'_, FeedState<M>> {
        lock(&self.state)
    }

    /// Make `value` current and queue it for every subscriber without running
    /// any handler. Callers that stage while holding their own lock get
    /// delivery in that lock's order; `flush` then delivers.
    pub fn stage(&self, value: M)
    where
        M: Clone,
    {
        let mut state = self.state();
        state.latest = Some(value.clone());
        state.queue.push_back(Pending {
            target: None,
            event: FeedEvent::Next(value),
        });
    }

    /// Deliver everything queued.
    ///
    /// Returns at once when another call is already draining; that call
    /// delivers whatever was queued meanwhile.
    pub fn flush(&self) {
        {
            let mut state = self.state();
            if state.draining {
                return;
            }
            state.draining = true;
        }
        let _guard = DrainGuard(&self.state);

        loop {
            let (event, handlers) = {
                let mut state = self.state();
                let Some(next) = state.queue.pop_front() else {
                    state.draining = false;
                    return;
                };
                let handlers: Vec<FeedHandler<M>> = state
                    .subscribers
                    .iter()
                    .filter(|(id, _)| next.target.is_none_or(|target| target == *id))
                    .map(|(_, handler)| handler.clone())
                    .collect();
                (next.event, handlers)
            };
            for handler in handlers {
                handler(&event);
            }
        }
    }

    fn enqueue(&self, pending: Pending<M>) {
        self.state().queue.push_back(pending);
        self.flush();
    }
}

// Releases the drain slot when a handler panics, so later publishes still
// deliver.
struct DrainGuard<'a, M>(&'a Mutex<FeedState<M>>);

impl<M> Drop for DrainGuard<'_, M> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::warn!("feed handler panicked; remaining events wait for the next publish");
            lock(self.0).draining = false;
        }
    }
}

impl<M> Default for InMemoryFeed<M> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(FeedState {
                latest: None,
                next_id: 0,
                subscribers: Vec::new(),
                queue: VecDeque::new(),
                draining: false,
            })),
        }
    }
}

impl<M> core::fmt::Debug for InMemoryFeed<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryFeed")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn lock<M>(state: &Mutex<FeedState<M>>) -> MutexGuard<'_, FeedState<M>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn detach<M>(state: &Weak<Mutex<FeedState<M>>>, id: SubscriptionId) {
    let Some(state) = state.upgrade() else {
        return;
    };
    lock(&state).subscribers.retain(|(sid, _)| *sid != id);
}

impl<M> Feed<M> for InMemoryFeed<M>
where
    M: Clone + Send + Sync + 'static,
{
    fn publish(&self, value: M) {
        self.stage(value);
        self.flush();
    }

    fn fail(&self, error: String) {
        self.enqueue(Pending {
            target: None,
            event: FeedEvent::Error(error),
        });
    }

    fn subscribe(&self, handler: FeedHandler<M>) -> Subscription {
        let id = {
            let mut state = self.state();
            let id = SubscriptionId(state.next_id);
            state.next_id += 1;
            state.subscribers.push((id, handler));
            if let Some(value) = state.latest.clone() {
                state.queue.push_back(Pending {
                    target: Some(id),
                    event: FeedEvent::Next(value),
                });
            }
            id
        };
        self.flush();

        let weak = Arc::downgrade(&self.state);
        Subscription::new(id, move || detach(&weak, id))
    }

    fn latest(&self) -> Option<M> {
        self.state().latest.clone()
    }
}
