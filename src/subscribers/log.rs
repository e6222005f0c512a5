//! # LogWriter: event logger
//!
//! Renders every runtime [`Event`] as a `tracing` record, one line per worker state
//! transition. Level follows severity: crashes and failures are `warn`, routine
//! lifecycle is `info`, restart bookkeeping is `debug`.
//!
//! ## Example output
//! ```text
//! INFO  worker launching worker="gps" restarts=0
//! INFO  worker running worker="gps" pid=4121
//! WARN  worker exited worker="gps" pid=4121 code=Some(1) reason="exit status: 1"
//! DEBUG restart scheduled worker="gps" delay_ms=2000 restarts=1
//! INFO  shutdown in progress reason="signal SIGINT"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event logger subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::WorkerStarting => {
                tracing::info!(worker, restarts = e.attempt, "worker launching");
            }
            EventKind::WorkerSpawned => {
                tracing::info!(worker, pid = e.pid, "worker running");
            }
            EventKind::WorkerOnline => {
                tracing::info!(worker, "worker online");
            }
            EventKind::SpawnFailed => {
                tracing::warn!(worker, restarts = e.attempt, reason, "worker failed to spawn");
            }
            EventKind::WorkerExited => {
                tracing::warn!(worker, pid = e.pid, code = e.exit_code, reason, "worker exited");
            }
            EventKind::RestartScheduled => {
                tracing::debug!(worker, delay_ms = e.delay_ms, restarts = e.attempt, "restart scheduled");
            }
            EventKind::RestartCancelled => {
                tracing::debug!(worker, "restart cancelled");
            }
            EventKind::WorkerStopped => {
                tracing::info!(worker, reason, "worker stopped");
            }
            EventKind::WorkerGaveUp => {
                tracing::error!(worker, restarts = e.attempt, reason, "worker given up");
            }
            EventKind::MessageRejected => {
                tracing::warn!(worker, reason, "message rejected");
            }
            EventKind::SinkFailed => {
                tracing::warn!(worker, reason, "sink failed");
            }
            EventKind::HookFailed => {
                tracing::warn!(worker, reason, "hook failed");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(reason, "shutdown in progress");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!("all workers stopped");
            }
            EventKind::GraceExceeded => {
                tracing::error!(stuck = reason, "grace period exceeded");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(subscriber = worker, reason, "subscriber trouble");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
