//! Reward wheel engine.
//!
//! One spin per identity: the draw happens at `spin()`, the reveal after a
//! cancelable delay, and a winning reveal is handed to a fire-and-forget
//! notification task.

pub mod notification;
pub mod prize;
pub mod scheduler;
pub mod wheel;

pub use notification::{
    InMemoryTransport, NotificationDispatcher, NotificationSettings, NotificationTransport, NotifyError,
    PrizeMessage, SentNotification, TransportError,
};
pub use prize::{NO_WIN_CODE, Prize, PrizeTable};
pub use scheduler::{ManualScheduler, RevealScheduler, RevealTask, ScheduledReveal, TokioScheduler};
pub use wheel::{
    DEFAULT_REVEAL_DELAY, PendingSpin, RewardWheelEngine, SpinOutcome, SpinRejected, WheelPhase, WheelView,
};
