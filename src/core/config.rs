//! # Supervisor runtime configuration.
//!
//! Provides [`SupervisorConfig`], the centralized settings for the supervisor.
//!
//! Config is used in two ways:
//! 1. **Supervisor creation**: `Supervisor::builder(config)`
//! 2. **WorkerSpec defaults**: `WorkerSpec::with_defaults(name, command, &config)`
//!
//! ## Sentinel values
//! - `spawn_failure_limit = 0` → unlimited relaunches after spawn failures
//! - `drain = 0s` → do not wait for trailing output after exit
//! - `hook_timeout = 0s` → hooks run without a time limit

use std::time::Duration;

use crate::policies::{BackoffPolicy, RestartPolicy};

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `grace`: Maximum wait for worker actors to stop during `stop_all`
/// - `bus_capacity`: Event bus ring buffer size (min 1)
/// - `restart`: Default restart policy (can be overridden per worker)
/// - `backoff`: Default relaunch delay (can be overridden per worker)
/// - `drain`: How long to keep reading stdout after a worker exited
/// - `spawn_failure_limit`: Consecutive spawn failures before giving up (`0` = never)
/// - `hook_timeout`: Limit for exit hooks and teardown hooks (`0s` = none)
/// - `max_frame_len`: Largest single JSON message accepted from a worker
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Maximum time `stop_all` waits for actors before aborting them.
    ///
    /// Aborted actors drop their child process handle, which kills the child.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Default restart policy for workers.
    pub restart: RestartPolicy,

    /// Default relaunch delay policy for workers.
    pub backoff: BackoffPolicy,

    /// How long the output pump may keep draining stdout after the process ended.
    ///
    /// A grandchild that inherited stdout can keep the pipe open forever; the
    /// pump is abandoned once this elapses.
    pub drain: Duration,

    /// Number of consecutive spawn failures after which a worker is given up.
    ///
    /// - `0` = unlimited (spawn failures are retried like crashes)
    pub spawn_failure_limit: u32,

    /// Time limit for exit hooks and teardown hooks.
    pub hook_timeout: Duration,

    /// Largest single JSON value accepted on a worker's stdout, in bytes.
    pub max_frame_len: usize,
}

impl SupervisorConfig {
    /// Returns the spawn failure cap as an `Option`.
    #[inline]
    pub fn spawn_failure_cap(&self) -> Option<u32> {
        if self.spawn_failure_limit == 0 {
            None
        } else {
            Some(self.spawn_failure_limit)
        }
    }

    /// Returns the hook time limit as an `Option`.
    #[inline]
    pub fn hook_limit(&self) -> Option<Duration> {
        if self.hook_timeout == Duration::ZERO {
            None
        } else {
            Some(self.hook_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `grace = 10s`
    /// - `bus_capacity = 1024`
    /// - `restart = RestartPolicy::Always`
    /// - `backoff = BackoffPolicy::default()` (fixed 2s)
    /// - `drain = 500ms`
    /// - `spawn_failure_limit = 0` (unlimited)
    /// - `hook_timeout = 10s`
    /// - `max_frame_len = 1 MiB`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10),
            bus_capacity: 1024,
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
            drain: Duration::from_millis(500),
            spawn_failure_limit: 0,
            hook_timeout: Duration::from_secs(10),
            max_frame_len: 1 << 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_map_to_none() {
        let cfg = SupervisorConfig {
            hook_timeout: Duration::ZERO,
            bus_capacity: 0,
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.spawn_failure_cap(), None);
        assert_eq!(cfg.hook_limit(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn explicit_cap_is_reported() {
        let cfg = SupervisorConfig {
            spawn_failure_limit: 3,
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.spawn_failure_cap(), Some(3));
    }
}
