//! # Worker definitions and runtime records.
//!
//! - [`WorkerSpec`] / [`WorkerCommand`] - what to launch and how to supervise it
//! - [`WorkerHandle`] / [`WorkerStatus`] / [`WorkerState`] - read view of a live worker
//! - [`JsonStreamCodec`] / [`Frame`] - decoding of worker stdout into messages
//! - [`Hook`] / [`HookFn`] / [`CommandHook`] - exit and teardown side effects

mod codec;
mod handle;
pub(crate) mod hook;
mod spec;

pub use codec::{Frame, JsonStreamCodec};
pub use handle::{WorkerHandle, WorkerState, WorkerStatus};
pub use hook::{CommandHook, Hook, HookFn, HookRef};
pub use spec::{WorkerCommand, WorkerSpec};
