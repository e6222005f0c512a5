//! # Restart policies for worker actors.
//!
//! [`RestartPolicy`] determines whether a worker process is relaunched after it ends.
//! The supervisor does not interpret exit codes beyond "clean" (status 0) versus
//! everything else; see [`ExitKind`].
//!
//! ```text
//! RestartPolicy::Always     → any exit relaunches (sensor, GPS, modem readers)
//! RestartPolicy::OnFailure  → only non-zero status, signal death or spawn failure
//! RestartPolicy::Never      → the first exit is final (one-shot stream launcher)
//! ```

use serde::Deserialize;

/// How a worker run ended, as far as restart decisions are concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitKind {
    /// Exited with status 0.
    Clean,
    /// Exited with a non-zero status or was killed by a signal.
    Failed,
    /// The executable could not be launched at all.
    SpawnFailed,
}

/// Policy controlling whether a worker is relaunched after its process ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Never relaunch: the worker runs once.
    Never,
    /// Relaunch only when the run did not end cleanly.
    OnFailure,
    /// Relaunch after every exit (default).
    #[default]
    Always,
}

impl RestartPolicy {
    /// Returns true if a run that ended with `exit` should be followed by a relaunch.
    pub fn should_restart(self, exit: ExitKind) -> bool {
        match self {
            RestartPolicy::Never => false,
            RestartPolicy::OnFailure => exit != ExitKind::Clean,
            RestartPolicy::Always => true,
        }
    }
}
