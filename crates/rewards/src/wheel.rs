//! Single-use reward wheel.
//!
//! ```text
//!   Idle ──spin()──▶ Spinning ──reveal delay──▶ Resolved
//!    ▲                  │                          │
//!    └──── reset() ─────┴──────── reset() ─────────┘
//! ```
//!
//! `Resolved` is terminal until `reset()`. Teardown (`shutdown()` or drop)
//! while spinning cancels the reveal and goes back to `Idle` without marking
//! the identity as having spun.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use storefront_core::CurrentIdentity;
use storefront_infra::{PersistenceAdapter, WheelState};

use crate::notification::{NotificationDispatcher, NotifyError};
use crate::prize::{Prize, PrizeTable};
use crate::scheduler::{RevealScheduler, ScheduledReveal};

/// Delay between the spin and the prize reveal.
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelPhase {
    Idle,
    Spinning,
    Resolved,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SpinRejected {
    #[error("You have already spun the wheel.")]
    AlreadySpun,

    #[error("The wheel is already spinning.")]
    InProgress,
}

/// A revealed draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinOutcome {
    pub prize: Prize,
    pub rotation: f64,
    pub resolved_at: DateTime<Utc>,
}

/// An accepted spin whose prize is not revealed yet.
#[derive(Debug)]
pub struct PendingSpin {
    pub prize_index: usize,
    pub rotation: f64,
    outcome: oneshot::Receiver<SpinOutcome>,
}

impl PendingSpin {
    /// Wait for the reveal. `None` if the spin was cancelled by a reset or
    /// teardown.
    pub async fn outcome(self) -> Option<SpinOutcome> {
        self.outcome.await.ok()
    }
}

/// Snapshot handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelView {
    pub phase: WheelPhase,
    pub has_spun: bool,
    pub rotation: f64,
    pub result: Option<Prize>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub segments: Vec<String>,
}

struct WheelInner {
    phase: WheelPhase,
    has_spun: bool,
    rotation: f64,
    result: Option<Prize>,
    resolved_at: Option<DateTime<Utc>>,
    message: Option<String>,
    pending: Option<Box<dyn ScheduledReveal>>,
    // Bumped whenever a pending reveal is invalidated.
    generation: u64,
}

impl WheelInner {
    fn cancel_pending(&mut self) {
        self.generation += 1;
        if let Some(reveal) = self.pending.take() {
            reveal.cancel();
        }
    }
}

pub struct RewardWheelEngine {
    identity: CurrentIdentity,
    persistence: PersistenceAdapter,
    table: PrizeTable,
    scheduler: Arc<dyn RevealScheduler>,
    notifier: Option<NotificationDispatcher>,
    reveal_delay: Duration,
    rng: Mutex<StdRng>,
    inner: Arc<Mutex<WheelInner>>,
}

impl RewardWheelEngine {
    /// Wheel for `identity`, restoring its persisted anti-replay flag.
    pub fn new(identity: CurrentIdentity, persistence: PersistenceAdapter, scheduler: Arc<dyn RevealScheduler>) -> Self {
        let has_spun = identity
            .user_id()
            .map(|user| persistence.load_wheel_state(user).has_spun)
            .unwrap_or(false);
        if has_spun {
            debug!(user = ?identity.user_id(), "wheel already used by this identity");
        }

        Self {
            identity,
            persistence,
            table: PrizeTable::default(),
            scheduler,
            notifier: None,
            reveal_delay: DEFAULT_REVEAL_DELAY,
            rng: Mutex::new(StdRng::from_entropy()),
            inner: Arc::new(Mutex::new(WheelInner {
                phase: if has_spun { WheelPhase::Resolved } else { WheelPhase::Idle },
                has_spun,
                rotation: 0.0,
                result: None,
                resolved_at: None,
                message: None,
                pending: None,
                generation: 0,
            })),
        }
    }

    pub fn with_table(mut self, table: PrizeTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_reveal_delay(mut self, delay: Duration) -> Self {
        self.reveal_delay = delay;
        self
    }

    pub fn with_notifier(mut self, notifier: NotificationDispatcher) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Use a fixed random source (reproducible draws).
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn table(&self) -> &PrizeTable {
        &self.table
    }

    fn state(&self) -> MutexGuard<'_, WheelInner> {
        lock(&self.inner)
    }

    pub fn phase(&self) -> WheelPhase {
        self.state().phase
    }

    pub fn has_spun(&self) -> bool {
        self.state().has_spun
    }

    /// Start a spin: draw the prize now, reveal it after the delay.
    pub fn spin(&self) -> Result<PendingSpin, SpinRejected> {
        let mut inner = self.state();

        let rejection = if inner.has_spun {
            Some(SpinRejected::AlreadySpun)
        } else if inner.phase == WheelPhase::Spinning {
            Some(SpinRejected::InProgress)
        } else {
            None
        };
        if let Some(rejected) = rejection {
            info!(user = ?self.identity.user_id(), reason = %rejected, "spin rejected");
            inner.message = Some(rejected.to_string());
            return Err(rejected);
        }

        let (prize_index, prize, turns) = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let (index, prize) = self.table.draw(&mut *rng);
            (index, prize.clone(), 5.0 + rng.r#gen::<f64>() * 5.0)
        };
        let rotation = self.table.rotation_for(prize_index, turns);

        inner.generation += 1;
        inner.phase = WheelPhase::Spinning;
        inner.rotation = rotation;
        inner.result = None;
        inner.resolved_at = None;
        inner.message = None;

        let (tx, rx) = oneshot::channel();
        let reveal = Reveal {
            inner: Arc::downgrade(&self.inner),
            generation: inner.generation,
            identity: self.identity.clone(),
            persistence: self.persistence.clone(),
            notifier: self.notifier.clone(),
            prize,
            rotation,
            outcome: tx,
        };
        inner.pending = Some(self.scheduler.schedule(self.reveal_delay, Box::new(move || reveal.run())));

        info!(
            user = ?self.identity.user_id(),
            prize_index,
            rotation,
            delay_ms = self.reveal_delay.as_millis() as u64,
            "wheel spinning"
        );
        Ok(PendingSpin {
            prize_index,
            rotation,
            outcome: rx,
        })
    }

    /// Back to `Idle` with the anti-replay flag cleared and persisted.
    pub fn reset(&self) {
        let mut inner = self.state();
        inner.cancel_pending();
        inner.phase = WheelPhase::Idle;
        inner.has_spun = false;
        inner.rotation = 0.0;
        inner.result = None;
        inner.resolved_at = None;
        inner.message = None;
        if let Some(user) = self.identity.user_id() {
            self.persistence.save_wheel_state(user, WheelState::default());
        }
        info!(user = ?self.identity.user_id(), "wheel reset");
    }

    /// Cancel a pending reveal. A spinning wheel returns to `Idle` and the
    /// identity keeps its spin.
    pub fn shutdown(&self) {
        let mut inner = self.state();
        if inner.phase == WheelPhase::Spinning {
            inner.cancel_pending();
            inner.phase = WheelPhase::Idle;
            inner.rotation = 0.0;
            warn!(user = ?self.identity.user_id(), "wheel torn down mid-spin; reveal cancelled");
        }
    }

    pub fn view(&self) -> WheelView {
        let inner = self.state();
        WheelView {
            phase: inner.phase,
            has_spun: inner.has_spun,
            rotation: inner.rotation,
            result: inner.result.clone(),
            resolved_at: inner.resolved_at,
            message: inner.message.clone(),
            segments: self.table.prizes().iter().map(|p| p.label().to_string()).collect(),
        }
    }
}

impl Drop for RewardWheelEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl core::fmt::Debug for RewardWheelEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RewardWheelEngine")
            .field("user", &self.identity.user_id())
            .field("phase", &self.phase())
            .field("reveal_delay", &self.reveal_delay)
            .finish_non_exhaustive()
    }
}

/// Everything the delayed reveal needs, detached from the engine.
struct Reveal {
    inner: Weak<Mutex<WheelInner>>,
    generation: u64,
    identity: CurrentIdentity,
    persistence: PersistenceAdapter,
    notifier: Option<NotificationDispatcher>,
    prize: Prize,
    rotation: f64,
    outcome: oneshot::Sender<SpinOutcome>,
}

impl Reveal {
    fn run(self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let resolved_at = Utc::now();
        {
            let mut state = lock(&inner);
            if state.generation != self.generation || state.phase != WheelPhase::Spinning {
                debug!("stale wheel reveal ignored");
                return;
            }
            state.phase = WheelPhase::Resolved;
            state.has_spun = true;
            state.result = Some(self.prize.clone());
            state.resolved_at = Some(resolved_at);
            state.pending = None;
            if let Some(user) = self.identity.user_id() {
                self.persistence.save_wheel_state(user, WheelState::spun());
            }
            if let Some(notifier) = &self.notifier {
                match notifier.notify(&self.identity, &self.prize) {
                    Err(e @ NotifyError::NoRecipient) => {
                        state.message = Some(format!("Failed to send prize notification: {e}"));
                    }
                    Ok(_) | Err(NotifyError::NoWin) => {}
                }
            }
        }

        info!(user = ?self.identity.user_id(), prize = %self.prize.label(), "wheel resolved");
        let _ = self.outcome.send(SpinOutcome {
            prize: self.prize.clone(),
            rotation: self.rotation,
            resolved_at,
        });
    }
}

fn lock(inner: &Mutex<WheelInner>) -> MutexGuard<'_, WheelInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
