//! # Runtime events emitted by the supervisor and worker actors.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Worker lifecycle**: launch, spawn, exit, restart scheduling, terminal stop
//! - **Output**: rejected messages and sink failures
//! - **Shutdown**: coordinator transitions and grace accounting
//! - **Subscribers**: overflow and panic reports
//!
//! The [`Event`] struct carries additional metadata such as timestamps, worker name,
//! pid, exit code, reasons and restart delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use rigvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RestartScheduled)
//!     .with_worker("gps")
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(2));
//!
//! assert_eq!(ev.kind, EventKind::RestartScheduled);
//! assert_eq!(ev.worker.as_deref(), Some("gps"));
//! assert_eq!(ev.delay_ms, Some(2000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `worker` (subscriber name) and `reason` (panic info).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `worker` (subscriber name) and `reason`.
    SubscriberOverflow,

    // === Shutdown events ===
    /// Shutdown transition fired (signal, fault, request or all workers finished).
    ///
    /// Sets `reason`.
    ShutdownRequested,

    /// All worker actors stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some actors were aborted.
    ///
    /// Sets `reason` (stuck worker names).
    GraceExceeded,

    // === Worker lifecycle events ===
    /// Actor is about to launch the worker process.
    ///
    /// Sets `worker` and `attempt` (restart counter, 0 for the first launch).
    WorkerStarting,

    /// Worker process is running.
    ///
    /// Sets `worker`, `pid`, `attempt`.
    WorkerSpawned,

    /// The current run delivered its first message; the worker counts as online.
    ///
    /// Sets `worker`.
    WorkerOnline,

    /// The worker executable could not be launched.
    ///
    /// Sets `worker`, `attempt`, `reason`.
    SpawnFailed,

    /// Worker process ended (normal exit, signal or kill during shutdown).
    ///
    /// Sets `worker`, `pid`, `exit_code` (absent when killed by a signal), `reason`.
    WorkerExited,

    /// A relaunch was armed on a one-shot timer.
    ///
    /// Sets `worker`, `attempt` (restart counter the relaunch will carry), `delay_ms`.
    RestartScheduled,

    /// An armed relaunch was dropped because shutdown began during the delay.
    ///
    /// Sets `worker`.
    RestartCancelled,

    /// Actor finished; the worker stays stopped.
    ///
    /// Sets `worker`, `reason` (`policy`, `terminating`).
    WorkerStopped,

    /// Too many consecutive spawn failures; the worker stays stopped.
    ///
    /// Sets `worker`, `attempt`, `reason`.
    WorkerGaveUp,

    // === Output events ===
    /// A chunk of worker stdout could not be decoded into a message.
    ///
    /// Sets `worker`, `reason`.
    MessageRejected,

    /// The sink refused a message.
    ///
    /// Sets `worker`, `reason`.
    SinkFailed,

    /// An exit hook or teardown hook failed.
    ///
    /// Sets `worker` (absent for teardown hooks) and `reason`.
    HookFailed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the worker, if applicable.
    pub worker: Option<Arc<str>>,
    /// OS process id.
    pub pid: Option<u32>,
    /// Process exit code (absent when terminated by a signal).
    pub exit_code: Option<i32>,
    /// Restart counter.
    pub attempt: Option<u64>,
    /// Restart delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, exit status, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            pid: None,
            exit_code: None,
            attempt: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a worker name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a process id.
    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// Attaches an exit code.
    #[inline]
    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// Attaches a restart counter.
    #[inline]
    pub fn with_attempt(mut self, n: u64) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a restart delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }

    /// True for events emitted by the subscriber machinery itself.
    #[inline]
    pub fn is_subscriber_report(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
