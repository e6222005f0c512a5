//! # Sink trait and message type.
//!
//! A [`Sink`] is the destination of worker output: a parent channel, a push to a
//! remote service, or a log stream. Implementations must be cheap to share
//! (`Arc<dyn Sink>`) and handle their own retries; a returned error is logged and
//! published as `SinkFailed`, and the message is dropped.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use rigvisor::{Message, Sink, SinkError};
//!
//! struct Uplink;
//!
//! #[async_trait]
//! impl Sink for Uplink {
//!     async fn deliver(&self, msg: &Message) -> Result<(), SinkError> {
//!         let _body = msg.envelope();
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &'static str { "uplink" }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::SinkError;

/// What a [`Message`] carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MessageKind {
    /// A value the worker printed.
    #[default]
    Data,
    /// The `null` notice delivered after the worker exited.
    ExitNotice,
    /// The online/offline table of every worker, keyed under `"state"`.
    State,
}

/// One structured payload produced by a worker.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// Name of the worker that printed it (`"state"` for state tables).
    pub worker: Arc<str>,
    /// Per-worker sequence number, starting at 1 and continuing across relaunches.
    pub seq: u64,
    /// The decoded JSON value, forwarded verbatim.
    pub payload: Value,
    /// Data, exit notice or state table.
    pub kind: MessageKind,
}

impl Message {
    /// Creates a data message.
    pub fn new(worker: impl Into<Arc<str>>, seq: u64, payload: Value) -> Self {
        Self {
            worker: worker.into(),
            seq,
            payload,
            kind: MessageKind::Data,
        }
    }

    /// Creates the `null` notice delivered after a worker exits.
    pub fn exit_notice(worker: impl Into<Arc<str>>, seq: u64) -> Self {
        Self {
            kind: MessageKind::ExitNotice,
            ..Self::new(worker, seq, Value::Null)
        }
    }

    /// Creates a state table message: `{ "<worker>": online, ... }`.
    pub fn state(seq: u64, table: Value) -> Self {
        Self {
            kind: MessageKind::State,
            ..Self::new("state", seq, table)
        }
    }

    /// True for exit notices. A worker printing `null` is still data.
    pub fn is_exit_notice(&self) -> bool {
        self.kind == MessageKind::ExitNotice
    }

    /// Wraps the payload as `{ "<worker>": payload }`.
    pub fn envelope(&self) -> Value {
        let mut map = Map::with_capacity(1);
        map.insert(self.worker.to_string(), self.payload.clone());
        Value::Object(map)
    }
}

/// Destination for worker messages.
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    /// Delivers one message.
    ///
    /// Called sequentially for messages of the same worker; calls for different
    /// workers may overlap.
    async fn deliver(&self, msg: &Message) -> Result<(), SinkError>;

    /// Returns the sink name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to a sink.
pub type SinkRef = Arc<dyn Sink>;
