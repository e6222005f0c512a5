//! # Worker runtime record.
//!
//! Each supervised worker has a [`WorkerStatus`] published through a
//! `tokio::sync::watch` channel. The worker's actor owns the only sender, so only
//! the supervisor mutates it; [`WorkerHandle`] is the cloneable read side handed to
//! callers of `Supervisor::start`.
//!
//! ```text
//!            start_delay        spawn ok        exit       notice + hook
//!  Pending ─────────────► Running ─────────► Exited ─────────────► Backoff ──► Running ...
//!     │                                         │                     │
//!     └──── shutdown ───────────────────────────┴── policy/shutdown ──┴──► Stopped (terminal)
//! ```

use std::sync::Arc;

use tokio::sync::watch;

/// Lifecycle state of a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// Registered, waiting for the first launch.
    Pending,
    /// A live process exists.
    Running,
    /// The process ended; its exit notice and exit hook are being handled.
    Exited,
    /// Exited; a relaunch timer is armed.
    Backoff,
    /// No process and no relaunch will happen.
    Stopped,
}

impl WorkerState {
    /// True once the actor has finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Stopped)
    }

    /// Lowercase label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Pending => "pending",
            WorkerState::Running => "running",
            WorkerState::Exited => "exited",
            WorkerState::Backoff => "backoff",
            WorkerState::Stopped => "stopped",
        }
    }
}

/// Snapshot of a worker's runtime record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerStatus {
    /// Current lifecycle state.
    pub state: WorkerState,
    /// Pid of the live process (`None` when not running).
    pub pid: Option<u32>,
    /// Number of relaunches so far (0 for the first process).
    pub restarts: u64,
    /// Exit code of the most recent run (`None` if killed by a signal or never exited).
    pub last_exit_code: Option<i32>,
}

impl WorkerStatus {
    fn pending() -> Self {
        Self {
            state: WorkerState::Pending,
            pid: None,
            restarts: 0,
            last_exit_code: None,
        }
    }
}

/// Read-only view over one worker's runtime record.
#[derive(Clone, Debug)]
pub struct WorkerHandle {
    name: Arc<str>,
    rx: watch::Receiver<WorkerStatus>,
}

impl WorkerHandle {
    /// Creates the status channel for a new worker.
    pub(crate) fn channel(name: Arc<str>) -> (watch::Sender<WorkerStatus>, WorkerHandle) {
        let (tx, rx) = watch::channel(WorkerStatus::pending());
        (tx, WorkerHandle { name, rx })
    }

    /// Worker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current snapshot.
    pub fn status(&self) -> WorkerStatus {
        self.rx.borrow().clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.rx.borrow().state
    }

    /// Pid of the live process, if any.
    pub fn pid(&self) -> Option<u32> {
        self.rx.borrow().pid
    }

    /// Number of relaunches so far.
    pub fn restarts(&self) -> u64 {
        self.rx.borrow().restarts
    }

    /// True while a live process exists.
    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    /// Waits until the status satisfies `pred` and returns that snapshot.
    ///
    /// If the actor is gone, returns the last published snapshot whether or not it
    /// matches.
    pub async fn wait_for(&self, mut pred: impl FnMut(&WorkerStatus) -> bool) -> WorkerStatus {
        let mut rx = self.rx.clone();
        let res = rx.wait_for(|s| pred(s)).await.map(|s| s.clone());
        match res {
            Ok(status) => status,
            Err(_closed) => rx.borrow().clone(),
        }
    }

    /// Waits until the worker is stopped for good.
    pub async fn stopped(&self) -> WorkerStatus {
        self.wait_for(|s| s.state.is_terminal()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_observes_sender_updates() {
        let (tx, handle) = WorkerHandle::channel(Arc::from("sensor"));
        assert_eq!(handle.state(), WorkerState::Pending);

        tx.send_modify(|s| {
            s.state = WorkerState::Running;
            s.pid = Some(42);
        });
        assert!(handle.is_running());
        assert_eq!(handle.pid(), Some(42));

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.stopped().await })
        };
        tx.send_modify(|s| {
            s.state = WorkerState::Stopped;
            s.pid = None;
        });
        let last = waiter.await.unwrap();
        assert_eq!(last.state, WorkerState::Stopped);
        assert_eq!(last.pid, None);
    }

    #[tokio::test]
    async fn dropped_sender_returns_last_snapshot() {
        let (tx, handle) = WorkerHandle::channel(Arc::from("gps"));
        tx.send_modify(|s| s.restarts = 3);
        drop(tx);
        let status = handle.wait_for(|s| s.state == WorkerState::Running).await;
        assert_eq!(status.restarts, 3);
    }

    #[test]
    fn only_stopped_is_terminal() {
        assert!(WorkerState::Stopped.is_terminal());
        assert!(!WorkerState::Backoff.is_terminal());
        assert_eq!(WorkerState::Backoff.as_str(), "backoff");
    }
}
