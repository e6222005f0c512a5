//! # WorkerActor: single-worker supervisor.
//!
//! Supervises the processes of one [`WorkerSpec`]:
//! - relaunches per [`RestartPolicy`](crate::RestartPolicy) after the
//!   [`BackoffPolicy`](crate::BackoffPolicy) delay,
//! - runs the exit hook and exit notice after every exit,
//! - stops for good once the [`TerminatingFlag`] is set or its token is cancelled.
//!
//! ## Architecture
//! ```text
//! WorkerSpec ──► Registry ──► WorkerActor::run()
//!
//! [start_delay]
//! loop {
//!   ├─► run_once() ──► spawn, pump output, wait / kill
//!   ├─► status: Exited, pid = None, last_exit_code
//!   ├─► exit notice (null message), if enabled
//!   ├─► exit hook (awaited while terminating, detached otherwise)
//!   ├─► terminating?                        → Stopped("terminating")
//!   ├─► spawn failure cap reached?          → WorkerGaveUp, Stopped
//!   ├─► RestartPolicy::should_restart(kind) → else Stopped("policy")
//!   └─► RestartScheduler::schedule(delay)
//!         ├─► Relaunch → restarts += 1, continue
//!         └─► Abandon  → Stopped("terminating")
//! }
//! ```
//!
//! ## Rules
//! - Processes run **sequentially** within one actor (never overlapping).
//! - `restarts` increments by exactly one per relaunch and never resets.
//! - The backoff exponent counts **consecutive** failed runs; a clean exit resets it.

use std::sync::Arc;

use tokio::{sync::watch, time};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        SupervisorConfig, TerminatingFlag,
        pump::Outlet,
        restart::{RestartDecision, RestartScheduler},
        runner::run_once,
    },
    events::{Bus, Event, EventKind},
    policies::ExitKind,
    sinks::SinkRef,
    workers::{WorkerSpec, WorkerState, WorkerStatus, hook::run_guarded},
};

/// Shared runtime pieces every actor needs.
#[derive(Clone)]
pub(crate) struct ActorContext {
    pub bus: Bus,
    pub sink: SinkRef,
    pub cfg: Arc<SupervisorConfig>,
    pub flag: TerminatingFlag,
}

/// Why an actor finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActorExit {
    /// The restart policy declined a relaunch.
    Policy,
    /// Shutdown began.
    Terminating,
    /// Too many consecutive spawn failures.
    GaveUp,
}

impl ActorExit {
    fn as_str(self) -> &'static str {
        match self {
            ActorExit::Policy => "policy",
            ActorExit::Terminating => "terminating",
            ActorExit::GaveUp => "gave_up",
        }
    }
}

/// Supervises every process of a single worker.
pub(crate) struct WorkerActor {
    spec: WorkerSpec,
    ctx: ActorContext,
    status: watch::Sender<WorkerStatus>,
    outlet: Outlet,
}

impl WorkerActor {
    pub(crate) fn new(spec: WorkerSpec, ctx: ActorContext, status: watch::Sender<WorkerStatus>) -> Self {
        let outlet = Outlet::new(spec.name_arc(), Arc::clone(&ctx.sink), ctx.bus.clone());
        Self {
            spec,
            ctx,
            status,
            outlet,
        }
    }

    /// Runs the actor until the restart policy, a spawn-failure cap, or shutdown
    /// ends it. Always leaves the status in `Stopped`.
    pub(crate) async fn run(self, token: CancellationToken) -> ActorExit {
        let exit = self.supervise(&token).await;

        self.status.send_modify(|s| {
            s.state = WorkerState::Stopped;
            s.pid = None;
        });
        self.ctx.bus.publish(
            Event::new(EventKind::WorkerStopped)
                .with_worker(self.spec.name_arc())
                .with_reason(exit.as_str()),
        );
        exit
    }

    async fn supervise(&self, token: &CancellationToken) -> ActorExit {
        if let Some(delay) = self.spec.start_delay() {
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = token.cancelled() => return ActorExit::Terminating,
            }
        }

        let name = self.spec.name_arc();
        let mut restarts: u64 = 0;
        let mut failures: u32 = 0;
        let mut spawn_failures: u32 = 0;

        loop {
            if self.terminating(token) {
                return ActorExit::Terminating;
            }

            let out = run_once(&self.spec, &self.ctx, &self.outlet, &self.status, restarts, token).await;
            self.status.send_modify(|s| {
                s.state = WorkerState::Exited;
                s.pid = None;
                s.last_exit_code = out.code;
            });

            if self.spec.exit_notice() {
                self.outlet.deliver_exit_notice().await;
            }

            let shutting_down = self.terminating(token);
            self.fire_exit_hook(shutting_down).await;
            if shutting_down {
                return ActorExit::Terminating;
            }

            match out.kind {
                ExitKind::Clean => {
                    failures = 0;
                    spawn_failures = 0;
                }
                ExitKind::Failed => {
                    failures = failures.saturating_add(1);
                    spawn_failures = 0;
                }
                ExitKind::SpawnFailed => {
                    failures = failures.saturating_add(1);
                    spawn_failures = spawn_failures.saturating_add(1);
                }
            }

            if let Some(cap) = self.ctx.cfg.spawn_failure_cap() {
                if spawn_failures >= cap {
                    tracing::error!(worker = self.spec.name(), spawn_failures, reason = %out.reason, "worker given up");
                    self.ctx.bus.publish(
                        Event::new(EventKind::WorkerGaveUp)
                            .with_worker(Arc::clone(&name))
                            .with_attempt(restarts)
                            .with_reason(format!("{spawn_failures} consecutive spawn failures: {}", out.reason)),
                    );
                    return ActorExit::GaveUp;
                }
            }

            if !self.spec.restart().should_restart(out.kind) {
                tracing::info!(worker = self.spec.name(), reason = %out.reason, "worker exited; not restarting");
                return ActorExit::Policy;
            }

            let delay = self.spec.backoff().next(failures.saturating_sub(1));
            tracing::info!(worker = self.spec.name(), reason = %out.reason, delay_ms = delay.as_millis() as u64, "worker exited; restart scheduled");
            self.status.send_modify(|s| s.state = WorkerState::Backoff);

            let scheduler = RestartScheduler {
                worker: &name,
                flag: &self.ctx.flag,
                token,
                bus: &self.ctx.bus,
            };
            match scheduler.schedule(delay, restarts + 1).await {
                RestartDecision::Relaunch => {
                    restarts += 1;
                    self.status.send_modify(|s| s.restarts = restarts);
                }
                RestartDecision::Abandon => return ActorExit::Terminating,
            }
        }
    }

    fn terminating(&self, token: &CancellationToken) -> bool {
        self.ctx.flag.is_set() || token.is_cancelled()
    }

    /// Runs the exit hook: awaited during shutdown so teardown completes before the
    /// process exits, detached otherwise so a slow hook never delays a relaunch.
    async fn fire_exit_hook(&self, await_it: bool) {
        let Some(hook) = self.spec.exit_hook() else {
            return;
        };
        let limit = self.ctx.cfg.hook_limit();
        let worker = self.spec.name_arc();

        if await_it {
            run_guarded(hook.as_ref(), limit, Some(&worker), &self.ctx.bus).await;
        } else {
            let hook = Arc::clone(hook);
            let bus = self.ctx.bus.clone();
            tokio::spawn(async move {
                run_guarded(hook.as_ref(), limit, Some(&worker), &bus).await;
            });
        }
    }
}

impl Drop for WorkerActor {
    /// An aborted or panicked actor still leaves its handle in `Stopped`.
    fn drop(&mut self) {
        self.status.send_if_modified(|s| {
            if s.state.is_terminal() {
                return false;
            }
            s.state = WorkerState::Stopped;
            s.pid = None;
            true
        });
    }
}
