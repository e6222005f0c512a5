//! # Output pumps: worker stdout → sink, worker stderr → log.
//!
//! Every launched process gets two pump tasks:
//!
//! ```text
//! child stdout ──► FramedRead<JsonStreamCodec> ──► Frame::Value ──► Outlet::deliver ──► Sink
//!                                               └─► Frame::Malformed ──► MessageRejected
//! child stderr ──► read_until('\n') ──► tracing::debug!(worker)
//! ```
//!
//! ## Rules
//! - Stdout frames are delivered strictly one at a time: the next frame is not decoded
//!   before the previous delivery has returned. This is what keeps per-worker order.
//! - Delivery failures never stop the pump; they are logged and published as `SinkFailed`.
//! - Stderr is drained continuously so a chatty worker never blocks on a full pipe.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::codec::FramedRead;

use crate::{
    events::{Bus, Event, EventKind},
    sinks::{Message, SinkRef},
    workers::{Frame, JsonStreamCodec},
};

/// Per-worker delivery endpoint shared by every run of that worker.
///
/// Owns the message sequence counter, so numbering continues across relaunches.
/// The first message of each run publishes `WorkerOnline`.
#[derive(Clone)]
pub(crate) struct Outlet {
    worker: Arc<str>,
    sink: SinkRef,
    bus: Bus,
    seq: Arc<AtomicU64>,
    online: Arc<AtomicBool>,
}

impl Outlet {
    pub(crate) fn new(worker: Arc<str>, sink: SinkRef, bus: Bus) -> Self {
        Self {
            worker,
            sink,
            bus,
            seq: Arc::new(AtomicU64::new(0)),
            online: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Marks the start of a new run; the worker is offline until it prints.
    pub(crate) fn begin_run(&self) {
        self.online.store(false, Ordering::SeqCst);
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Delivers one decoded value; failures are reported, not returned.
    pub(crate) async fn deliver(&self, payload: Value) {
        if !self.online.swap(true, Ordering::SeqCst) {
            self.bus
                .publish(Event::new(EventKind::WorkerOnline).with_worker(Arc::clone(&self.worker)));
        }
        let msg = Message::new(Arc::clone(&self.worker), self.next_seq(), payload);
        self.send(msg).await;
    }

    /// Delivers the `null` exit notice.
    pub(crate) async fn deliver_exit_notice(&self) {
        let msg = Message::exit_notice(Arc::clone(&self.worker), self.next_seq());
        self.send(msg).await;
    }

    async fn send(&self, msg: Message) {
        if let Err(e) = self.sink.deliver(&msg).await {
            tracing::warn!(
                worker = &*self.worker,
                sink = self.sink.name(),
                seq = msg.seq,
                error = %e,
                "message delivery failed"
            );
            self.bus.publish(
                Event::new(EventKind::SinkFailed)
                    .with_worker(Arc::clone(&self.worker))
                    .with_reason(format!("{}: {e}", e.as_label())),
            );
        }
    }
}

/// Decodes JSON values from `stdout` and delivers them in order until EOF.
pub(crate) async fn pump_stdout<R>(stdout: R, outlet: Outlet, max_frame_len: usize)
where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(stdout, JsonStreamCodec::new(max_frame_len));

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(Frame::Value(value)) => outlet.deliver(value).await,
            Ok(Frame::Malformed(reason)) => {
                tracing::warn!(worker = &*outlet.worker, %reason, "unparseable worker output skipped");
                outlet.bus.publish(
                    Event::new(EventKind::MessageRejected)
                        .with_worker(Arc::clone(&outlet.worker))
                        .with_reason(reason),
                );
            }
            Err(e) => {
                tracing::debug!(worker = &*outlet.worker, error = %e, "stdout read failed");
                break;
            }
        }
    }
}

/// Logs every stderr line of the worker at debug level until EOF.
pub(crate) async fn pump_stderr<R>(stderr: R, worker: Arc<str>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end();
                if !line.is_empty() {
                    tracing::debug!(worker = &*worker, "{line}");
                }
            }
            Err(e) => {
                tracing::debug!(worker = &*worker, error = %e, "stderr read failed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::sinks::{ChannelSink, Sink};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Refusing;

    #[async_trait]
    impl Sink for Refusing {
        async fn deliver(&self, _msg: &Message) -> Result<(), SinkError> {
            Err(SinkError::Closed)
        }
    }

    #[tokio::test]
    async fn values_are_delivered_in_order_with_sequence() {
        let (sink, mut rx) = ChannelSink::new(16);
        let bus = Bus::new(16);
        let mut events = bus.subscribe();
        let outlet = Outlet::new(Arc::from("sensor"), Arc::new(sink), bus);

        let input: &[u8] = b"{\"m\":1}\n{\"m\":2}garbage\n{\"m\":3}";
        pump_stdout(input, outlet.clone(), 1024).await;
        outlet.deliver_exit_notice().await;

        let mut got = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            got.push((msg.seq, msg.payload));
        }
        assert_eq!(
            got,
            vec![
                (1, json!({"m": 1})),
                (2, json!({"m": 2})),
                (3, json!({"m": 3})),
                (4, Value::Null),
            ]
        );

        assert_eq!(events.recv().await.unwrap().kind, EventKind::WorkerOnline);
        let ev = events.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::MessageRejected);
        assert_eq!(ev.worker.as_deref(), Some("sensor"));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn each_run_goes_online_once_on_first_output() {
        let (sink, mut rx) = ChannelSink::new(16);
        let bus = Bus::new(16);
        let mut events = bus.subscribe();
        let outlet = Outlet::new(Arc::from("gps"), Arc::new(sink), bus);

        outlet.begin_run();
        pump_stdout(&b"{\"fix\":1}\n{\"fix\":2}\n"[..], outlet.clone(), 1024).await;
        outlet.deliver_exit_notice().await;
        outlet.begin_run();
        pump_stdout(&b"null\n"[..], outlet.clone(), 1024).await;

        let online = std::iter::from_fn(|| events.try_recv().ok())
            .filter(|ev| ev.kind == EventKind::WorkerOnline)
            .count();
        assert_eq!(online, 2);

        let notices: Vec<bool> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|m| m.is_exit_notice())
            .collect();
        assert_eq!(notices, vec![false, false, true, false]);
    }

    #[tokio::test]
    async fn sink_failures_are_published() {
        let bus = Bus::new(16);
        let mut events = bus.subscribe();
        let outlet = Outlet::new(Arc::from("modem"), Arc::new(Refusing), bus);

        pump_stdout(&b"{\"rssi\":-71}\n"[..], outlet, 1024).await;

        assert_eq!(events.recv().await.unwrap().kind, EventKind::WorkerOnline);
        let ev = events.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SinkFailed);
        assert_eq!(ev.reason.as_deref(), Some("sink_closed: sink closed"));
    }

    #[tokio::test]
    async fn stderr_pump_reads_to_eof() {
        let input: &[u8] = b"warming up\n\xff\xfe not utf8\nready";
        pump_stderr(input, Arc::from("gps")).await;
    }
}
