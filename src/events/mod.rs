//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the supervisor, worker
//! actors, output pumps and the shutdown coordinator.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor`, `WorkerActor`, output pumps, `ShutdownCoordinator`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the supervisor listener (fans out to `SubscriberSet`
//!   and updates `AliveTracker`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
