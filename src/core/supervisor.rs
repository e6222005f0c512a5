//! # Supervisor: owns named workers, wires their output, restarts them.
//!
//! The [`Supervisor`] owns the worker registry, the event bus, the output sink and
//! the [`TerminatingFlag`]. Each started worker gets its own actor task; the
//! supervisor itself never blocks on a worker.
//!
//! ## High-level architecture
//! ```text
//! start(spec) ──► Registry::spawn ──► WorkerActor::run(child token)
//!                                          │
//!                                          ├──► run_once ──► stdout pump ──► Sink
//!                                          └──► RestartScheduler (flag + token)
//!
//! Event flow:
//!   actors / pumps ── publish(Event) ──► Bus ──► listener ──► AliveTracker::update
//!                                                        └──► SubscriberSet::emit
//!
//! stop_all():
//!   flag.trip() ──► Registry::stop_all(grace) ──► cancel root token
//!                                                  (kills children, ends timers)
//!                                              ──► join actors until deadline
//!                                              ──► abort stragglers → GraceExceeded
//! ```
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use rigvisor::{LogSink, Supervisor, SupervisorConfig, WorkerCommand, WorkerSpec};
//!
//! #[tokio::main]
//! async fn main() {
//!     let sup = Supervisor::builder(SupervisorConfig::default())
//!         .with_sink(std::sync::Arc::new(LogSink))
//!         .build();
//!
//!     let sensor = WorkerSpec::new("sensor", WorkerCommand::new("node").arg("scripts/sensor.js"))
//!         .with_delay(Duration::from_millis(1000));
//!
//!     let outcome = sup.run(vec![sensor]).await;
//!     std::process::exit(outcome.exit_code);
//! }
//! ```

use std::sync::{Arc, Mutex};

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        SupervisorBuilder, SupervisorConfig, TerminatingFlag,
        actor::ActorContext,
        alive::AliveTracker,
        coordinator::{ShutdownCoordinator, ShutdownOutcome, ShutdownReason},
        registry::Registry,
    },
    error::RuntimeError,
    events::{Bus, Event, EventKind},
    subscribers::SubscriberSet,
    workers::{HookRef, WorkerHandle, WorkerSpec},
};

/// Owns named workers, their restart scheduling and event delivery.
pub struct Supervisor {
    ctx: ActorContext,
    registry: Registry,
    alive: Arc<AliveTracker>,
    teardown: Vec<HookRef>,
    listener_token: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    /// Returns a builder.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    /// Creates the supervisor and spawns its event listener.
    pub(crate) fn new_internal(
        ctx: ActorContext,
        subs: SubscriberSet,
        teardown: Vec<HookRef>,
    ) -> Self {
        let alive = Arc::new(AliveTracker::new());
        let listener_token = CancellationToken::new();
        let listener = tokio::spawn(Self::listen(
            ctx.bus.subscribe(),
            subs,
            Arc::clone(&alive),
            listener_token.clone(),
        ));

        Self {
            ctx,
            registry: Registry::new(),
            alive,
            teardown,
            listener_token,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Launches a worker and returns its handle.
    ///
    /// The process itself is launched by the worker's actor task (after the spec's
    /// start delay, if any); this returns as soon as the actor is registered.
    ///
    /// # Errors
    /// - [`RuntimeError::Terminating`] once shutdown has begun.
    /// - [`RuntimeError::DuplicateWorker`] if a live worker already uses the name.
    pub async fn start(&self, spec: WorkerSpec) -> Result<WorkerHandle, RuntimeError> {
        let name = spec.name().to_string();
        let handle = self.registry.spawn(spec, &self.ctx).await?;
        tracing::debug!(worker = %name, "worker registered");
        Ok(handle)
    }

    /// Stops every worker and waits for them, bounded by `SupervisorConfig::grace`.
    ///
    /// Sets the terminating flag first, so no restart is scheduled or fired
    /// afterwards. Idempotent.
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] if some actors had to be aborted.
    pub async fn stop_all(&self) -> Result<(), RuntimeError> {
        if self.ctx.flag.trip() {
            tracing::info!("terminating; stopping all workers");
        }

        let grace = self.ctx.cfg.grace;
        let stuck = self.registry.stop_all(grace).await;

        if stuck.is_empty() {
            self.ctx.bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        } else {
            tracing::error!(?stuck, ?grace, "grace period exceeded; workers aborted");
            self.ctx
                .bus
                .publish(Event::new(EventKind::GraceExceeded).with_reason(stuck.join(",")));
            Err(RuntimeError::GraceExceeded { grace, stuck })
        }
    }

    /// Returns the handle of a registered worker.
    pub async fn handle(&self, name: &str) -> Option<WorkerHandle> {
        self.registry.handle(name).await
    }

    /// Returns sorted list of registered worker names.
    pub async fn list(&self) -> Vec<String> {
        self.registry.list().await
    }

    /// Returns sorted names of workers with a live process, as seen on the bus.
    pub async fn alive(&self) -> Vec<String> {
        self.alive.snapshot().await
    }

    /// True once shutdown has begun.
    pub fn is_terminating(&self) -> bool {
        self.ctx.flag.is_set()
    }

    /// Shared terminating flag.
    pub fn terminating(&self) -> TerminatingFlag {
        self.ctx.flag.clone()
    }

    /// Event bus, for publishing or observing runtime events.
    pub fn bus(&self) -> &Bus {
        &self.ctx.bus
    }

    /// Runtime configuration.
    pub fn config(&self) -> &SupervisorConfig {
        &self.ctx.cfg
    }

    /// Teardown hooks run by the coordinator after `stop_all`.
    pub(crate) fn teardown_hooks(&self) -> &[HookRef] {
        &self.teardown
    }

    /// Resolves when every worker registered at call time has stopped.
    pub async fn wait_idle(&self) {
        for handle in self.registry.handles().await {
            handle.stopped().await;
        }
    }

    /// Creates the shutdown coordinator for this supervisor.
    pub fn coordinator(self: &Arc<Self>) -> ShutdownCoordinator {
        ShutdownCoordinator::new(Arc::clone(self))
    }

    /// Starts `specs` and blocks until the first shutdown trigger has been handled.
    ///
    /// A spec that cannot be started is a fault: everything already running is
    /// torn down and the outcome carries exit code 1.
    pub async fn run(self: &Arc<Self>, specs: Vec<WorkerSpec>) -> ShutdownOutcome {
        let coordinator = self.coordinator();
        self.run_with(&coordinator, specs).await
    }

    /// Like [`Supervisor::run`], with a caller-provided coordinator (for example one
    /// whose panic hook is installed).
    pub async fn run_with(
        &self,
        coordinator: &ShutdownCoordinator,
        specs: Vec<WorkerSpec>,
    ) -> ShutdownOutcome {
        for spec in specs {
            if let Err(e) = self.start(spec).await {
                tracing::error!(error = %e, "failed to start worker");
                return coordinator.trigger(ShutdownReason::Fault(e.to_string())).await;
            }
        }
        coordinator.wait().await
    }

    /// Stops the event listener after flushing pending events to subscribers.
    pub(crate) async fn close(&self) {
        self.listener_token.cancel();
        let listener = match self.listener.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(join) = listener {
            let _ = join.await;
        }
    }

    async fn listen(
        mut rx: broadcast::Receiver<Event>,
        subs: SubscriberSet,
        alive: Arc<AliveTracker>,
        token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => {
                        alive.update(&ev).await;
                        subs.emit(&ev);
                    }
                    Err(RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        alive.update(&ev).await;
                        subs.emit(&ev);
                    }
                    break;
                }
            }
        }
        subs.shutdown().await;
    }
}
