//! # In-process channel sink.
//!
//! Forwards messages into a bounded `tokio::sync::mpsc` channel. This is the
//! parent-channel mode: an embedding process reads the receiver. When the channel
//! is full, delivery waits, which back-pressures only the producing worker's pump.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SinkError;

use super::{Message, Sink};

/// Sink that forwards into an mpsc channel.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<Message>,
}

impl ChannelSink {
    /// Creates the sink and the receiving end (capacity clamped to at least 1).
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Wraps an existing sender.
    pub fn from_sender(tx: mpsc::Sender<Message>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Sink for ChannelSink {
    async fn deliver(&self, msg: &Message) -> Result<(), SinkError> {
        self.tx
            .send(msg.clone())
            .await
            .map_err(|_| SinkError::Closed)
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn forwards_in_order() {
        let (sink, mut rx) = ChannelSink::new(4);
        sink.deliver(&Message::new("gps", 1, json!(1))).await.unwrap();
        sink.deliver(&Message::new("gps", 2, json!(2))).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().seq, 1);
        assert_eq!(rx.recv().await.unwrap().seq, 2);
    }

    #[tokio::test]
    async fn closed_receiver_is_an_error() {
        let (sink, rx) = ChannelSink::new(1);
        drop(rx);
        let err = sink
            .deliver(&Message::new("gps", 1, json!(null)))
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Closed));
    }
}
