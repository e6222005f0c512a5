//! # Shutdown coordinator: the Running → Terminating transition.
//!
//! [`ShutdownCoordinator`] fires the teardown sequence exactly once, on the first of:
//! - a shutdown signal (`SIGINT`, `SIGTERM`, `SIGUSR1`, `SIGUSR2`),
//! - a fault reported through a [`FaultReporter`] (or the installed panic hook),
//! - every registered worker finishing on its own,
//! - an explicit [`ShutdownCoordinator::trigger`] call.
//!
//! ## Teardown sequence
//! ```text
//! trigger(reason)
//!   ├─ latch already set? ──► await the running teardown, return its outcome
//!   ├─ publish ShutdownRequested
//!   ├─ Supervisor::stop_all()      (trips the terminating flag, kills workers)
//!   ├─ teardown hooks, in order   (best effort, failures logged)
//!   ├─ flush event subscribers
//!   └─ ShutdownOutcome { reason, exit_code, stuck }
//! ```
//!
//! The latch is a [`tokio::sync::OnceCell`]: concurrent callers all wait for the
//! single initialization and receive the same outcome.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, OnceCell, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        shutdown::{SignalKind, wait_for_signal},
        supervisor::Supervisor,
    },
    error::RuntimeError,
    events::{Event, EventKind},
    workers::hook::run_guarded,
};

/// What started the shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A process signal was received.
    Signal(SignalKind),
    /// An unrecoverable fault was reported.
    Fault(String),
    /// Every worker stopped on its own.
    WorkersFinished,
    /// Shutdown was requested programmatically.
    Requested,
}

impl ShutdownReason {
    /// Process exit status implied by this reason alone.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownReason::Fault(_) => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(sig) => write!(f, "signal {sig}"),
            ShutdownReason::Fault(msg) => write!(f, "fault: {msg}"),
            ShutdownReason::WorkersFinished => f.write_str("all workers finished"),
            ShutdownReason::Requested => f.write_str("requested"),
        }
    }
}

/// Result of the teardown sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownOutcome {
    /// The trigger that won the latch.
    pub reason: ShutdownReason,
    /// Status the process should exit with: 1 for faults or an exceeded grace period.
    pub exit_code: i32,
    /// Workers whose actors had to be aborted after the grace period.
    pub stuck: Vec<String>,
}

/// Cloneable handle for reporting unrecoverable faults to the coordinator.
#[derive(Clone, Debug)]
pub struct FaultReporter {
    tx: mpsc::UnboundedSender<String>,
}

impl FaultReporter {
    /// Reports a fault. Only the first report (or trigger) starts the shutdown.
    pub fn report(&self, fault: impl Into<String>) {
        let _ = self.tx.send(fault.into());
    }
}

/// Runs the shutdown sequence exactly once.
pub struct ShutdownCoordinator {
    sup: Arc<Supervisor>,
    outcome: OnceCell<ShutdownOutcome>,
    triggered: AtomicBool,
    started: CancellationToken,
    faults_tx: mpsc::UnboundedSender<String>,
    faults_rx: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl ShutdownCoordinator {
    /// Creates a coordinator for `sup`.
    pub fn new(sup: Arc<Supervisor>) -> Self {
        let (faults_tx, faults_rx) = mpsc::unbounded_channel();
        Self {
            sup,
            outcome: OnceCell::new(),
            triggered: AtomicBool::new(false),
            started: CancellationToken::new(),
            faults_tx,
            faults_rx: Mutex::new(faults_rx),
        }
    }

    /// Returns a reporter that funnels faults into [`ShutdownCoordinator::wait`].
    pub fn fault_reporter(&self) -> FaultReporter {
        FaultReporter {
            tx: self.faults_tx.clone(),
        }
    }

    /// Installs a process panic hook that reports every panic as a fault.
    ///
    /// The previous hook still runs first. Panics caught further up (for example in
    /// subscribers) are reported too.
    pub fn install_panic_hook(&self) {
        let reporter = self.fault_reporter();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            previous(info);
            reporter.report(format!("panic: {info}"));
        }));
    }

    /// True once a trigger has fired.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Fires the teardown sequence, or waits for the one already running.
    ///
    /// Every caller receives the same outcome; the teardown runs once.
    pub async fn trigger(&self, reason: ShutdownReason) -> ShutdownOutcome {
        if self.triggered.swap(true, Ordering::SeqCst) {
            tracing::debug!(%reason, "shutdown already in progress");
        } else {
            self.started.cancel();
        }
        self.outcome
            .get_or_init(|| self.teardown(reason))
            .await
            .clone()
    }

    /// Waits for the first shutdown trigger and runs the teardown.
    pub async fn wait(&self) -> ShutdownOutcome {
        let reason = tokio::select! {
            sig = signal_or_pending() => ShutdownReason::Signal(sig),
            fault = self.next_fault() => ShutdownReason::Fault(fault),
            _ = self.sup.wait_idle() => ShutdownReason::WorkersFinished,
            _ = self.started.cancelled() => ShutdownReason::Requested,
        };
        self.trigger(reason).await
    }

    async fn next_fault(&self) -> String {
        let mut rx = self.faults_rx.lock().await;
        match rx.recv().await {
            Some(fault) => fault,
            // The coordinator holds a sender, so the channel never closes.
            None => std::future::pending().await,
        }
    }

    async fn teardown(&self, reason: ShutdownReason) -> ShutdownOutcome {
        tracing::info!(%reason, "shutdown in progress");
        let bus = self.sup.bus();
        bus.publish(Event::new(EventKind::ShutdownRequested).with_reason(reason.to_string()));

        let stuck = match self.sup.stop_all().await {
            Ok(()) => Vec::new(),
            Err(RuntimeError::GraceExceeded { stuck, .. }) => stuck,
            Err(e) => {
                tracing::error!(error = %e, "stop_all failed");
                Vec::new()
            }
        };

        let limit = self.sup.config().hook_limit();
        for hook in self.sup.teardown_hooks() {
            run_guarded(hook.as_ref(), limit, None, bus).await;
        }

        let exit_code = if stuck.is_empty() { reason.exit_code() } else { 1 };
        tracing::info!(%reason, exit_code, "shutdown complete");
        self.sup.close().await;

        ShutdownOutcome {
            reason,
            exit_code,
            stuck,
        }
    }
}

async fn signal_or_pending() -> SignalKind {
    match wait_for_signal().await {
        Ok(sig) => sig,
        Err(e) => {
            tracing::error!(error = %e, "cannot listen for shutdown signals");
            std::future::pending().await
        }
    }
}
