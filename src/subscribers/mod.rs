//! # Event subscribers for the rigvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out, the
//! built-in [`LogWriter`] and the [`StateRelay`] that pushes worker state to a sink.
//!
//! ```text
//! WorkerActor ── publish(Event) ──► Bus ──► supervisor listener
//!                                              │
//!                                              ├──► AliveTracker (internal state)
//!                                              └──► SubscriberSet::emit(&Event)
//!                                                        │
//!                                                ┌───────┴───────┬─────────┐
//!                                                ▼               ▼         ▼
//!                                            LogWriter     StateRelay    custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use async_trait::async_trait;
//! use rigvisor::{Event, EventKind, Subscribe};
//!
//! struct CrashCounter;
//!
//! #[async_trait]
//! impl Subscribe for CrashCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::WorkerExited {
//!             // bump a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "crash-counter" }
//! }
//! ```

mod log;
mod set;
mod state;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use state::StateRelay;
pub use subscriber::Subscribe;
