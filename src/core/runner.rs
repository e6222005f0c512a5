//! # Run a single process of a worker.
//!
//! [`run_once`] launches one process for a [`WorkerSpec`], wires its output pumps,
//! waits for it to end (or kills it on cancellation), drains trailing output, and
//! reports how it ended.
//!
//! ## Event flow
//! ```text
//! Spawn error:
//!   WorkerStarting → SpawnFailed                         → ExitKind::SpawnFailed
//!
//! Normal run:
//!   WorkerStarting → WorkerSpawned → [wait] → WorkerExited → ExitKind::Clean / Failed
//!
//! Cancellation (shutdown):
//!   WorkerStarting → WorkerSpawned → [kill] → WorkerExited → ExitKind::Failed
//! ```
//!
//! ## Rules
//! - At most one live process per call; the child is killed if this future is dropped.
//! - Always publishes **exactly one** terminal event: `SpawnFailed` or `WorkerExited`.
//! - Output pumps are given at most `SupervisorConfig::drain` after the exit.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::{sync::watch, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        actor::ActorContext,
        pump::{Outlet, pump_stderr, pump_stdout},
    },
    events::{Event, EventKind},
    policies::ExitKind,
    workers::{WorkerSpec, WorkerState, WorkerStatus},
};

/// How one process ended.
#[derive(Debug, Clone)]
pub(crate) struct RunOutcome {
    pub kind: ExitKind,
    pub pid: Option<u32>,
    /// Exit code; `None` when killed by a signal or never spawned.
    pub code: Option<i32>,
    pub reason: String,
}

/// Launches one process of `spec` and waits for it to end.
///
/// `restarts` is the relaunch counter carried by the events of this run.
pub(crate) async fn run_once(
    spec: &WorkerSpec,
    ctx: &ActorContext,
    outlet: &Outlet,
    status: &watch::Sender<WorkerStatus>,
    restarts: u64,
    token: &CancellationToken,
) -> RunOutcome {
    let name = spec.name_arc();
    ctx.bus.publish(
        Event::new(EventKind::WorkerStarting)
            .with_worker(Arc::clone(&name))
            .with_attempt(restarts),
    );
    tracing::info!(worker = spec.name(), command = %spec.command().display(), restarts, "worker launching");

    let mut child = match spec.command().piped().spawn() {
        Ok(child) => child,
        Err(e) => {
            let reason = e.to_string();
            ctx.bus.publish(
                Event::new(EventKind::SpawnFailed)
                    .with_worker(name)
                    .with_attempt(restarts)
                    .with_reason(reason.as_str()),
            );
            return RunOutcome {
                kind: ExitKind::SpawnFailed,
                pid: None,
                code: None,
                reason,
            };
        }
    };

    let pid = child.id();
    outlet.begin_run();
    status.send_modify(|s| {
        s.state = WorkerState::Running;
        s.pid = pid;
    });
    ctx.bus.publish(
        Event::new(EventKind::WorkerSpawned)
            .with_worker(Arc::clone(&name))
            .with_pid(pid)
            .with_attempt(restarts),
    );

    let stdout = child.stdout.take().map(|out| {
        tokio::spawn(pump_stdout(out, outlet.clone(), ctx.cfg.max_frame_len))
    });
    let stderr = child
        .stderr
        .take()
        .map(|err| tokio::spawn(pump_stderr(err, Arc::clone(&name))));

    let waited = tokio::select! {
        res = child.wait() => res,
        _ = token.cancelled() => {
            if let Err(e) = child.start_kill() {
                tracing::warn!(worker = spec.name(), error = %e, "failed to kill worker");
            }
            child.wait().await
        }
    };

    drain(stdout, ctx.cfg.drain, spec.name()).await;
    drain(stderr, ctx.cfg.drain, spec.name()).await;

    let outcome = match waited {
        Ok(st) => RunOutcome {
            kind: classify(st),
            pid,
            code: st.code(),
            reason: st.to_string(),
        },
        Err(e) => RunOutcome {
            kind: ExitKind::Failed,
            pid,
            code: None,
            reason: format!("wait failed: {e}"),
        },
    };

    ctx.bus.publish(
        Event::new(EventKind::WorkerExited)
            .with_worker(name)
            .with_pid(outcome.pid)
            .with_exit_code(outcome.code)
            .with_reason(outcome.reason.as_str()),
    );
    outcome
}

fn classify(status: ExitStatus) -> ExitKind {
    if status.success() {
        ExitKind::Clean
    } else {
        ExitKind::Failed
    }
}

/// Waits for a pump to hit EOF, abandoning it after `limit`.
async fn drain(pump: Option<JoinHandle<()>>, limit: Duration, worker: &str) {
    let Some(mut join) = pump else {
        return;
    };
    if time::timeout(limit, &mut join).await.is_err() {
        // A grandchild still holds the pipe open.
        join.abort();
        tracing::debug!(worker, "output pipe still open after exit; abandoned");
    }
}
