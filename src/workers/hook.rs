//! # Exit hooks and teardown hooks.
//!
//! A [`Hook`] is an async side effect tied to the rig lifecycle: disabling the GPS
//! radio after the GPS reader exits, telling the stream launcher to stop, releasing
//! a device. Two implementations are provided:
//!
//! - [`HookFn`] wraps a closure producing a fresh future per run.
//! - [`CommandHook`] runs an external command to completion.
//!
//! Hooks are always run through [`run_guarded`], which applies the configured time
//! limit, catches panics and turns every failure into a log line plus a
//! `HookFailed` event. A failing hook never blocks restarts or shutdown.

use std::borrow::Cow;
use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;

use crate::{
    error::HookError,
    events::{Bus, Event, EventKind},
    workers::spec::WorkerCommand,
};

/// Async lifecycle side effect.
#[async_trait]
pub trait Hook: Send + Sync + 'static {
    /// Stable name used in logs and events.
    fn name(&self) -> &str;

    /// Performs the side effect once.
    async fn run(&self) -> Result<(), HookError>;
}

/// Shared handle to a hook.
pub type HookRef = Arc<dyn Hook>;

/// Closure-backed hook.
///
/// ```rust
/// use rigvisor::{HookError, HookFn, HookRef};
///
/// let hook: HookRef = HookFn::arc("close-browser", || async { Ok::<(), HookError>(()) });
/// assert_eq!(hook.name(), "close-browser");
/// ```
pub struct HookFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HookFn<F> {
    /// Creates a closure-backed hook.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the hook and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Hook for HookFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HookError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), HookError> {
        (self.f)().await
    }
}

/// Hook that runs an external command and waits for it.
///
/// Output is discarded; a non-zero exit status is a [`HookError::Status`].
#[derive(Clone, Debug)]
pub struct CommandHook {
    name: String,
    command: WorkerCommand,
}

impl CommandHook {
    /// Creates a command hook.
    pub fn new(name: impl Into<String>, command: WorkerCommand) -> Self {
        Self {
            name: name.into(),
            command,
        }
    }

    /// Creates the hook and returns it as a shared handle.
    pub fn arc(name: impl Into<String>, command: WorkerCommand) -> Arc<Self> {
        Arc::new(Self::new(name, command))
    }
}

#[async_trait]
impl Hook for CommandHook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), HookError> {
        let mut cmd = self.command.command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let status = cmd
            .status()
            .await
            .map_err(|source| HookError::Launch {
                hook: self.name.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(HookError::Status {
                hook: self.name.clone(),
                status: status.to_string(),
            })
        }
    }
}

/// Runs `hook` with an optional time limit and panic isolation.
///
/// Returns `true` if the hook succeeded. Failures are logged and published as
/// `HookFailed` (tagged with `worker` when the hook belongs to one).
pub(crate) async fn run_guarded(
    hook: &dyn Hook,
    limit: Option<Duration>,
    worker: Option<&Arc<str>>,
    bus: &Bus,
) -> bool {
    let run = std::panic::AssertUnwindSafe(hook.run()).catch_unwind();

    let outcome = match limit {
        Some(dur) => match tokio::time::timeout(dur, run).await {
            Ok(res) => res,
            Err(_elapsed) => Ok(Err(HookError::Timeout {
                hook: hook.name().to_string(),
                timeout: dur,
            })),
        },
        None => run.await,
    };

    let reason = match outcome {
        Ok(Ok(())) => {
            tracing::debug!(hook = hook.name(), "hook finished");
            return true;
        }
        Ok(Err(e)) => e.to_string(),
        Err(_panic) => format!("hook '{}' panicked", hook.name()),
    };

    tracing::warn!(hook = hook.name(), worker = worker.map(|w| &**w), %reason, "hook failed");
    let mut ev = Event::new(EventKind::HookFailed).with_reason(reason);
    if let Some(w) = worker {
        ev = ev.with_worker(Arc::clone(w));
    }
    bus.publish(ev);
    false
}
