//! # rigvisor
//!
//! **rigvisor** supervises the worker processes of an in-car streaming rig: sensor,
//! GPS and modem readers and the stream launcher. It launches each worker, relays
//! the JSON values the worker prints on stdout to an output sink, relaunches the
//! worker after it exits, and tears everything down exactly once on shutdown.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  WorkerSpec  │   │  WorkerSpec  │   │  WorkerSpec  │
//!     │   (sensor)   │   │    (gps)     │   │   (webrtc)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - Registry (named worker slots)                                  │
//! │  - TerminatingFlag (one-way latch)                                │
//! │  - Sink (destination of worker messages)                          │
//! │  - Bus → AliveTracker + SubscriberSet                             │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ WorkerActor  │   │ WorkerActor  │   │ WorkerActor  │
//!     │(restart loop)│   │(restart loop)│   │(restart loop)│
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      ▼                  ▼                  ▼
//!   child process      child process      child process
//!   stdout ─► JsonStreamCodec ─► Message ─► Sink (in order, per worker)
//!   stderr ─► tracing::debug!
//! ```
//!
//! ### Lifecycle of one worker
//! ```text
//! Pending ─(start_delay)─► Running ─(exit)─► exit notice, exit hook
//!                             ▲                 │
//!                             │      terminating? ──yes──► Stopped
//!                             │                 │
//!                             │      RestartPolicy says no ──► Stopped
//!                             │                 │
//!                             └──── Backoff: timer(delay), re-check flag on fire
//! ```
//!
//! ### Shutdown
//! ```text
//! SIGINT | SIGTERM | SIGUSR1 | SIGUSR2 | fault | all workers finished | trigger()
//!   └─► ShutdownCoordinator (runs once)
//!         ├─► TerminatingFlag = true
//!         ├─► Supervisor::stop_all()   kill children, cancel timers, join (grace)
//!         ├─► teardown hooks           best effort
//!         └─► ShutdownOutcome { exit_code: 0 | 1 }
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                      |
//! |-------------------|------------------------------------------------------------------|-----------------------------------------|
//! | **Supervision**   | Named workers, one live process each, relaunch on exit           | [`Supervisor`], [`WorkerSpec`]          |
//! | **Policies**      | Restart rules and fixed or exponential delays                    | [`RestartPolicy`], [`BackoffPolicy`]    |
//! | **Output**        | Streamed JSON decoding, ordered delivery                         | [`Sink`], [`Message`], [`JsonStreamCodec`] |
//! | **Hooks**         | Per-worker exit hooks and teardown commands                      | [`Hook`], [`HookFn`], [`CommandHook`]   |
//! | **Shutdown**      | Idempotent teardown on signals, faults or completion             | [`ShutdownCoordinator`], [`ShutdownOutcome`] |
//! | **Observability** | Every transition published as an [`Event`]                       | [`Subscribe`], [`LogWriter`]            |
//! | **State uplink**  | Worker online/offline table delivered to the sink                | [`StateRelay`], [`MessageKind`]         |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rigvisor::{
//!     ChannelSink, LogWriter, RestartPolicy, Supervisor, SupervisorConfig, WorkerCommand, WorkerSpec,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let (sink, mut messages) = ChannelSink::new(256);
//!     let sup = Supervisor::builder(SupervisorConfig::default())
//!         .with_sink(Arc::new(sink))
//!         .with_subscriber(Arc::new(LogWriter::new()))
//!         .build();
//!
//!     tokio::spawn(async move {
//!         while let Some(msg) = messages.recv().await {
//!             println!("{} #{}: {}", msg.worker, msg.seq, msg.payload);
//!         }
//!     });
//!
//!     let specs = vec![
//!         WorkerSpec::new("sensor", WorkerCommand::new("node").arg("scripts/sensor.js"))
//!             .with_delay(Duration::from_millis(1000))
//!             .with_exit_notice(true),
//!         WorkerSpec::new("webrtc", WorkerCommand::new("node").args(["scripts/webrtc.js", "restart"]))
//!             .with_restart(RestartPolicy::Never)
//!             .with_start_delay(Duration::from_millis(900)),
//!     ];
//!
//!     let outcome = sup.run(specs).await;
//!     std::process::exit(outcome.exit_code);
//! }
//! ```

mod core;
mod error;
mod events;
mod policies;
mod settings;
mod sinks;
mod subscribers;
mod telemetry;
mod workers;

// ---- Public re-exports ----

pub use crate::core::{
    AliveTracker, FaultReporter, ShutdownCoordinator, ShutdownOutcome, ShutdownReason, SignalKind,
    Supervisor, SupervisorBuilder, SupervisorConfig, TerminatingFlag, wait_for_signal,
};
pub use error::{ConfigError, HookError, RuntimeError, SinkError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, ExitKind, JitterPolicy, RestartPolicy};
pub use settings::{CommandEntry, RigFile, Settings, WorkerEntry};
pub use sinks::{ChannelSink, DedupSink, JsonLinesSink, LogSink, Message, MessageKind, Sink, SinkRef};
pub use subscribers::{LogWriter, StateRelay, Subscribe, SubscriberSet};
pub use telemetry::init_tracing;
pub use workers::{
    CommandHook, Frame, Hook, HookFn, HookRef, JsonStreamCodec, WorkerCommand, WorkerHandle,
    WorkerSpec, WorkerState, WorkerStatus,
};
