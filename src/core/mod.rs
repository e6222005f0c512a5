//! Runtime core: orchestration and lifecycle.
//!
//! The public API from this module is [`Supervisor`] (built with
//! [`SupervisorBuilder`]), the [`ShutdownCoordinator`] and their configuration
//! and outcome types.
//!
//! Internal modules:
//! - `actor`: supervises the processes of one worker (restart policy, hooks, notices);
//! - `runner`: launches one process, waits or kills it, drains its output;
//! - `pump`: stdout → sink delivery and stderr logging;
//! - `restart`: cancellable restart timers with the terminating-flag re-check;
//! - `registry`: named actor slots, `stop_all` with grace;
//! - `alive`: live-process tracking from bus events;
//! - `shutdown`: cross-platform signal listening;
//! - `coordinator`: the idempotent teardown sequence.

mod actor;
mod alive;
mod builder;
mod config;
mod coordinator;
mod pump;
mod registry;
mod restart;
mod runner;
mod shutdown;
mod supervisor;
mod terminating;

pub use alive::AliveTracker;
pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use coordinator::{FaultReporter, ShutdownCoordinator, ShutdownOutcome, ShutdownReason};
pub use shutdown::{SignalKind, wait_for_signal};
pub use supervisor::Supervisor;
pub use terminating::TerminatingFlag;
