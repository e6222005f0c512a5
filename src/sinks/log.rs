//! # Tracing sink.
//!
//! Writes every message to the log at `info` level. Useful when the rig runs
//! without an uplink and for bench testing of new worker scripts.

use async_trait::async_trait;

use crate::error::SinkError;

use super::{Message, Sink};

/// Sink that logs messages through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

#[async_trait]
impl Sink for LogSink {
    async fn deliver(&self, msg: &Message) -> Result<(), SinkError> {
        tracing::info!(
            worker = &*msg.worker,
            seq = msg.seq,
            payload = %msg.payload,
            "message"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
