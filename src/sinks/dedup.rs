//! # Change-only forwarding.
//!
//! Modem and GPS readers poll at a fixed rate and mostly repeat themselves; the
//! uplink only needs changes. [`DedupSink`] forwards a message only when its payload
//! differs from the last payload forwarded for the same worker.
//!
//! Exit notices are always forwarded and reset the worker's memory, so the first
//! reading after a relaunch always goes through.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::SinkError;

use super::{Message, Sink};

/// Wrapper that suppresses repeated payloads per worker.
pub struct DedupSink<S> {
    inner: S,
    last: Mutex<HashMap<Arc<str>, Value>>,
}

impl<S: Sink> DedupSink<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            last: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<S: Sink> Sink for DedupSink<S> {
    async fn deliver(&self, msg: &Message) -> Result<(), SinkError> {
        let mut last = self.last.lock().await;

        if msg.is_exit_notice() {
            last.remove(&msg.worker);
            return self.inner.deliver(msg).await;
        }
        if last.get(&msg.worker) == Some(&msg.payload) {
            return Ok(());
        }

        self.inner.deliver(msg).await?;
        last.insert(Arc::clone(&msg.worker), msg.payload.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
