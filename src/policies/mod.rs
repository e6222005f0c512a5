//! Restart and delay policies.
//!
//! This module groups the knobs that control **if** an exited worker is relaunched
//! and **how long** the supervisor waits before relaunching it.
//!
//! ## Contents
//! - [`RestartPolicy`] when to relaunch a worker (never / on-failure / always)
//! - [`BackoffPolicy`] how relaunch delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization of the delay
//!
//! ## Quick wiring
//! ```text
//! WorkerSpec { restart: RestartPolicy, backoff: BackoffPolicy, .. }
//!      └─► core::actor::WorkerActor uses:
//!           - restart.should_restart(&exit) to decide relaunch/stop
//!           - backoff.next(consecutive_failures) to arm the restart timer
//! ```
//!
//! ## Defaults
//! - `RestartPolicy::Always`: any exit relaunches the worker.
//! - `BackoffPolicy::default()`: fixed 2s delay (factor=1.0, no jitter).

mod backoff;
mod jitter;
mod restart;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::{ExitKind, RestartPolicy};
