//! Cancelable delayed execution for the wheel reveal.
//!
//! The wheel never sleeps itself: it hands the reveal to a [`RevealScheduler`]
//! and keeps the returned handle so a reset or teardown can cancel it.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Work to run once the delay elapses.
pub type RevealTask = Box<dyn FnOnce() + Send + 'static>;

pub trait RevealScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: RevealTask) -> Box<dyn ScheduledReveal>;
}

/// Handle to a scheduled reveal. Cancelling after the task ran is a no-op.
pub trait ScheduledReveal: Send + Sync {
    fn cancel(&self);
}

impl<S> RevealScheduler for Arc<S>
where
    S: RevealScheduler + ?Sized,
{
    fn schedule(&self, delay: Duration, task: RevealTask) -> Box<dyn ScheduledReveal> {
        (**self).schedule(delay, task)
    }
}

/// Runs reveals as tokio tasks on a runtime handle.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler on the runtime of the calling context, if there is one.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl RevealScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: RevealTask) -> Box<dyn ScheduledReveal> {
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        Box::new(TokioReveal(join.abort_handle()))
    }
}

struct TokioReveal(AbortHandle);

impl ScheduledReveal for TokioReveal {
    fn cancel(&self) {
        self.0.abort();
    }
}

/// Scheduler driven by hand: nothing runs until [`ManualScheduler::fire_all`].
#[derive(Default, Clone)]
pub struct ManualScheduler {
    queue: Arc<Mutex<ManualQueue>>,
}

#[derive(Default)]
struct ManualQueue {
    next_id: u64,
    entries: Vec<(u64, Duration, RevealTask)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reveals scheduled and not yet fired or cancelled.
    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Delays of the pending reveals, in scheduling order.
    pub fn pending_delays(&self) -> Vec<Duration> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, delay, _)| *delay)
            .collect()
    }

    /// Run every pending reveal now; returns how many ran.
    pub fn fire_all(&self) -> usize {
        let entries = std::mem::take(
            &mut self
                .queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entries,
        );
        let count = entries.len();
        for (_, _, task) in entries {
            task();
        }
        count
    }
}

impl RevealScheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: RevealTask) -> Box<dyn ScheduledReveal> {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        let id = queue.next_id;
        queue.next_id += 1;
        queue.entries.push((id, delay, task));
        Box::new(ManualReveal {
            queue: Arc::downgrade(&self.queue),
            id,
        })
    }
}

impl core::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

struct ManualReveal {
    queue: Weak<Mutex<ManualQueue>>,
    id: u64,
}

impl ScheduledReveal for ManualReveal {
    fn cancel(&self) {
        // Drop the task outside the queue lock.
        let removed = self.queue.upgrade().and_then(|queue| {
            let mut queue = queue.lock().unwrap_or_else(PoisonError::into_inner);
            let pos = queue.entries.iter().position(|(id, _, _)| *id == self.id)?;
            Some(queue.entries.remove(pos))
        });
        drop(removed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> RevealTask) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let make = move || -> RevealTask {
            let h = h.clone();
            Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            })
        };
        (hits, make)
    }

    #[test]
    fn manual_scheduler_runs_only_when_fired() {
        let scheduler = ManualScheduler::new();
        let (hits, task) = counter();
        let _handle = scheduler.schedule(Duration::from_secs(3), task());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending_delays(), vec![Duration::from_secs(3)]);

        assert_eq!(scheduler.fire_all(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.fire_all(), 0);
    }

    #[test]
    fn cancelled_manual_reveal_never_runs() {
        let scheduler = ManualScheduler::new();
        let (hits, task) = counter();
        let first = scheduler.schedule(Duration::ZERO, task());
        let _second = scheduler.schedule(Duration::ZERO, task());

        first.cancel();
        first.cancel();

        assert_eq!(scheduler.pending(), 1);
        scheduler.fire_all();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_runs_after_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let (hits, task) = counter();
        let _handle = scheduler.schedule(Duration::from_millis(3000), task());

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_tokio_reveal_never_runs() {
        let scheduler = TokioScheduler::current().unwrap();
        let (hits, task) = counter();
        let handle = scheduler.schedule(Duration::from_millis(10), task());
        handle.cancel();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
