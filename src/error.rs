//! Error types used by the rigvisor runtime, sinks, hooks and settings.
//!
//! - [`RuntimeError`]: errors raised by the supervisor itself.
//! - [`SinkError`]: delivery failures of an output sink.
//! - [`HookError`]: failures of exit hooks and teardown hooks.
//! - [`ConfigError`]: invalid or missing startup configuration.
//!
//! All of them provide `as_label` for logs and event reasons.
//! Worker-local failures are never errors here: they are observed as
//! process lifecycle events.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some workers had to be aborted.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of workers whose actors did not finish in time.
        stuck: Vec<String>,
    },

    /// A live worker with the same name is already registered.
    #[error("worker '{name}' is already running")]
    DuplicateWorker {
        /// The conflicting worker name.
        name: String,
    },

    /// The supervisor is terminating and refuses to start workers.
    #[error("supervisor is terminating; refusing to start '{name}'")]
    Terminating {
        /// The worker that was refused.
        name: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rigvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::DuplicateWorker { .. } => "runtime_duplicate_worker",
            RuntimeError::Terminating { .. } => "runtime_terminating",
        }
    }
}

/// # Errors produced while delivering a message to a sink.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SinkError {
    /// The receiving side of the sink is gone.
    #[error("sink closed")]
    Closed,

    /// Writing the message failed.
    #[error("sink i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The message could not be serialized.
    #[error("sink encode: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SinkError {
    /// Returns a short stable label (snake_case).
    pub fn as_label(&self) -> &'static str {
        match self {
            SinkError::Closed => "sink_closed",
            SinkError::Io(_) => "sink_io",
            SinkError::Encode(_) => "sink_encode",
        }
    }
}

/// # Errors produced by exit hooks and teardown hooks.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HookError {
    /// The hook command could not be launched.
    #[error("hook '{hook}' failed to launch: {source}")]
    Launch {
        /// Hook name.
        hook: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The hook command finished with a non-zero status.
    #[error("hook '{hook}' exited with {status}")]
    Status {
        /// Hook name.
        hook: String,
        /// Rendered exit status.
        status: String,
    },

    /// The hook did not finish within its time limit.
    #[error("hook '{hook}' timed out after {timeout:?}")]
    Timeout {
        /// Hook name.
        hook: String,
        /// The limit that was exceeded.
        timeout: Duration,
    },

    /// Closure hook failure.
    #[error("hook failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl HookError {
    /// Returns a short stable label (snake_case).
    ///
    /// # Example
    /// ```
    /// use rigvisor::HookError;
    ///
    /// let err = HookError::Fail { error: "radio busy".into() };
    /// assert_eq!(err.as_label(), "hook_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HookError::Launch { .. } => "hook_launch",
            HookError::Status { .. } => "hook_status",
            HookError::Timeout { .. } => "hook_timeout",
            HookError::Fail { .. } => "hook_failed",
        }
    }
}

/// # Startup configuration errors.
///
/// All of these are fatal: the binary exits with status 1 before any worker starts.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment value is absent or empty.
    #[error("missing {0} property in environment")]
    Missing(&'static str),

    /// An environment value could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The rig file could not be read.
    #[error("cannot read rig file: {0}")]
    Read(#[from] std::io::Error),

    /// The rig file is not valid JSON for the expected schema.
    #[error("cannot parse rig file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The rig file lists the same worker twice.
    #[error("worker '{0}' is defined more than once")]
    DuplicateWorker(String),
}

impl ConfigError {
    /// Returns a short stable label (snake_case).
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Missing(_) => "config_missing",
            ConfigError::Invalid { .. } => "config_invalid",
            ConfigError::Read(_) => "config_read",
            ConfigError::Parse(_) => "config_parse",
            ConfigError::DuplicateWorker(_) => "config_duplicate_worker",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(
            RuntimeError::DuplicateWorker { name: "gps".into() }.as_label(),
            "runtime_duplicate_worker"
        );
        assert_eq!(SinkError::Closed.as_label(), "sink_closed");
        assert_eq!(ConfigError::Missing("API_KEY").as_label(), "config_missing");
    }

    #[test]
    fn missing_config_names_the_variable() {
        let err = ConfigError::Missing("API_URL");
        assert_eq!(err.to_string(), "missing API_URL property in environment");
    }
}
