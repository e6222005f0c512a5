//! # Worker definition.
//!
//! [`WorkerSpec`] is the immutable description of one supervised worker: a unique
//! name, the command that launches it, and the policies the supervisor applies when
//! it exits. [`WorkerCommand`] is the launch recipe (program, arguments, extra
//! environment, working directory).
//!
//! A spec can be created:
//! - **Explicitly** with [`WorkerSpec::new`] and the `with_*` adjusters
//! - **From config** with [`WorkerSpec::with_defaults`] (inherit restart/backoff)
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use rigvisor::{RestartPolicy, WorkerCommand, WorkerSpec};
//!
//! let gps = WorkerSpec::new("gps", WorkerCommand::new("node").arg("scripts/gps.js"))
//!     .with_delay(Duration::from_millis(1000))
//!     .with_start_delay(Duration::from_millis(600));
//! assert_eq!(gps.name(), "gps");
//!
//! let stream = WorkerSpec::new("webrtc", WorkerCommand::new("node").args(["scripts/webrtc.js", "restart"]))
//!     .with_restart(RestartPolicy::Never);
//! assert_eq!(stream.restart(), RestartPolicy::Never);
//! ```

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    core::SupervisorConfig,
    policies::{BackoffPolicy, RestartPolicy},
    workers::hook::HookRef,
};

/// Launch recipe for an external executable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerCommand {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    current_dir: Option<PathBuf>,
}

impl WorkerCommand {
    /// Starts a recipe for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable for the child (on top of the inherited environment).
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Adds several environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.envs
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets the working directory of the child.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Program to execute.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Renders the command line for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Builds a tokio command without configuring stdio.
    pub(crate) fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Builds a command with piped stdout/stderr, closed stdin, killed on drop.
    pub(crate) fn piped(&self) -> tokio::process::Command {
        let mut cmd = self.command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Specification for running a worker under supervision.
///
/// Created once, never mutated after it is handed to the supervisor; relaunches
/// reuse the same spec.
#[derive(Clone)]
pub struct WorkerSpec {
    name: Arc<str>,
    command: WorkerCommand,
    restart: RestartPolicy,
    backoff: BackoffPolicy,
    start_delay: Option<Duration>,
    exit_notice: bool,
    on_exit: Option<HookRef>,
}

impl WorkerSpec {
    /// Creates a spec with `RestartPolicy::Always` and the default fixed 2s delay.
    pub fn new(name: impl Into<Arc<str>>, command: WorkerCommand) -> Self {
        Self {
            name: name.into(),
            command,
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
            start_delay: None,
            exit_notice: false,
            on_exit: None,
        }
    }

    /// Creates a spec inheriting restart and backoff policies from `cfg`.
    pub fn with_defaults(
        name: impl Into<Arc<str>>,
        command: WorkerCommand,
        cfg: &SupervisorConfig,
    ) -> Self {
        Self::new(name, command)
            .with_restart(cfg.restart)
            .with_backoff(cfg.backoff)
    }

    /// Unique worker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Launch recipe.
    pub fn command(&self) -> &WorkerCommand {
        &self.command
    }

    /// Restart policy.
    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    /// Relaunch delay policy.
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Delay before the very first launch, if any.
    pub fn start_delay(&self) -> Option<Duration> {
        self.start_delay
    }

    /// Whether a `null` message is delivered to the sink after each exit.
    pub fn exit_notice(&self) -> bool {
        self.exit_notice
    }

    /// Hook run after every exit of this worker.
    pub fn exit_hook(&self) -> Option<&HookRef> {
        self.on_exit.as_ref()
    }

    /// Returns a new spec with updated restart policy.
    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Returns a new spec with updated backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Shorthand for a fixed relaunch delay.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.with_backoff(BackoffPolicy::fixed(delay))
    }

    /// Returns a new spec that waits `delay` before its first launch.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay).filter(|d| !d.is_zero());
        self
    }

    /// Returns a new spec with the exit notice toggled.
    pub fn with_exit_notice(mut self, enabled: bool) -> Self {
        self.exit_notice = enabled;
        self
    }

    /// Returns a new spec that runs `hook` after every exit.
    pub fn with_exit_hook(mut self, hook: HookRef) -> Self {
        self.on_exit = Some(hook);
        self
    }
}

impl fmt::Debug for WorkerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSpec")
            .field("name", &self.name)
            .field("command", &self.command.display())
            .field("restart", &self.restart)
            .field("backoff", &self.backoff)
            .field("start_delay", &self.start_delay)
            .field("exit_notice", &self.exit_notice)
            .field("on_exit", &self.on_exit.as_ref().map(|h| h.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::hook::HookFn;

    #[test]
    fn command_display_joins_program_and_args() {
        let cmd = WorkerCommand::new("node").args(["scripts/webrtc.js", "stop"]);
        assert_eq!(cmd.display(), "node scripts/webrtc.js stop");
        assert_eq!(cmd.arguments().len(), 2);
    }

    #[test]
    fn defaults_come_from_config() {
        let cfg = SupervisorConfig {
            restart: RestartPolicy::OnFailure,
            backoff: BackoffPolicy::fixed(Duration::from_millis(1000)),
            ..SupervisorConfig::default()
        };
        let spec = WorkerSpec::with_defaults("sensor", WorkerCommand::new("true"), &cfg);
        assert_eq!(spec.restart(), RestartPolicy::OnFailure);
        assert_eq!(spec.backoff().next(3), Duration::from_millis(1000));
    }

    #[test]
    fn zero_start_delay_is_dropped() {
        let spec = WorkerSpec::new("gps", WorkerCommand::new("true")).with_start_delay(Duration::ZERO);
        assert_eq!(spec.start_delay(), None);
    }

    #[test]
    fn debug_shows_hook_name() {
        let spec = WorkerSpec::new("gps", WorkerCommand::new("true"))
            .with_exit_hook(HookFn::arc("gps-off", || async { Ok::<(), crate::HookError>(()) }));
        let rendered = format!("{spec:?}");
        assert!(rendered.contains("gps-off"));
    }
}
