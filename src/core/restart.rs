//! # Restart scheduling.
//!
//! [`RestartScheduler::schedule`] arms a one-shot, cancellable timer for a relaunch
//! and decides on fire whether the relaunch may proceed.
//!
//! ```text
//! schedule(delay)
//!   ├─ flag set?            → Abandon            (checked when scheduling)
//!   ├─ publish RestartScheduled
//!   ├─ select {
//!   │    sleep(delay)       → flag set? → RestartCancelled, Abandon   (checked on fire)
//!   │                                   → Relaunch
//!   │    token.cancelled()  → RestartCancelled, Abandon
//!   │  }
//! ```
//!
//! The token is the worker's cancellation token; `stop_all` cancels it, so pending
//! timers end immediately instead of waiting out the delay.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    core::TerminatingFlag,
    events::{Bus, Event, EventKind},
};

/// Outcome of a scheduled restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RestartDecision {
    /// The timer fired while the supervisor was still running.
    Relaunch,
    /// Shutdown began before or during the delay.
    Abandon,
}

pub(crate) struct RestartScheduler<'a> {
    pub worker: &'a Arc<str>,
    pub flag: &'a TerminatingFlag,
    pub token: &'a CancellationToken,
    pub bus: &'a Bus,
}

impl RestartScheduler<'_> {
    /// Waits `delay`, then tells whether relaunch `next_restart` may go ahead.
    pub(crate) async fn schedule(&self, delay: Duration, next_restart: u64) -> RestartDecision {
        if self.halted() {
            return RestartDecision::Abandon;
        }

        self.bus.publish(
            Event::new(EventKind::RestartScheduled)
                .with_worker(Arc::clone(self.worker))
                .with_attempt(next_restart)
                .with_delay(delay),
        );

        let sleep = time::sleep(delay);
        tokio::pin!(sleep);
        tokio::select! {
            _ = &mut sleep => {}
            _ = self.token.cancelled() => return self.cancel(),
        }

        if self.halted() {
            return self.cancel();
        }
        RestartDecision::Relaunch
    }

    fn halted(&self) -> bool {
        self.flag.is_set() || self.token.is_cancelled()
    }

    fn cancel(&self) -> RestartDecision {
        self.bus.publish(Event::new(EventKind::RestartCancelled).with_worker(Arc::clone(self.worker)));
        RestartDecision::Abandon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        worker: Arc<str>,
        flag: TerminatingFlag,
        token: CancellationToken,
        bus: Bus,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                worker: Arc::from("sensor"),
                flag: TerminatingFlag::new(),
                token: CancellationToken::new(),
                bus: Bus::new(16),
            }
        }

        fn scheduler(&self) -> RestartScheduler<'_> {
            RestartScheduler {
                worker: &self.worker,
                flag: &self.flag,
                token: &self.token,
                bus: &self.bus,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn relaunches_after_delay() {
        let fx = Fixture::new();
        let mut rx = fx.bus.subscribe();
        let started = time::Instant::now();

        let decision = fx.scheduler().schedule(Duration::from_millis(1000), 1).await;

        assert_eq!(decision, RestartDecision::Relaunch);
        assert!(started.elapsed() >= Duration::from_millis(1000));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::RestartScheduled);
        assert_eq!(ev.attempt, Some(1));
        assert_eq!(ev.delay_ms, Some(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn flag_set_before_scheduling_abandons_without_timer() {
        let fx = Fixture::new();
        let mut rx = fx.bus.subscribe();
        fx.flag.trip();

        let decision = fx.scheduler().schedule(Duration::from_secs(2), 1).await;

        assert_eq!(decision, RestartDecision::Abandon);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn flag_set_during_delay_is_rechecked_on_fire() {
        let fx = Fixture::new();
        let mut rx = fx.bus.subscribe();

        let flag = fx.flag.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(500)).await;
            flag.trip();
        });

        let decision = fx.scheduler().schedule(Duration::from_secs(2), 1).await;

        assert_eq!(decision, RestartDecision::Abandon);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::RestartScheduled);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::RestartCancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_pending_timer_early() {
        let fx = Fixture::new();
        let token = fx.token.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });
        let started = time::Instant::now();

        let decision = fx.scheduler().schedule(Duration::from_secs(60), 3).await;

        assert_eq!(decision, RestartDecision::Abandon);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
