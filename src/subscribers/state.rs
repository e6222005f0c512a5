//! # StateRelay: worker online/offline table for the uplink.
//!
//! The backend shows which rig workers are up. [`StateRelay`] keeps one boolean per
//! worker and delivers the whole table to a [`Sink`] as a
//! [`MessageKind::State`](crate::MessageKind::State) message whenever it changes:
//!
//! ```text
//! WorkerStarting ──► { "gps": false }   (first time the worker is seen)
//! WorkerOnline   ──► { "gps": true }    (first output of a run)
//! WorkerExited | SpawnFailed | WorkerStopped ──► { "gps": false }
//! ```
//!
//! A worker counts as online only once it has printed something, not when its
//! process is spawned.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::{
    events::{Event, EventKind},
    sinks::{Message, SinkRef},
};

use super::Subscribe;

#[derive(Default)]
struct Table {
    online: BTreeMap<Arc<str>, bool>,
    seq: u64,
}

/// Subscriber that relays the worker state table to a sink.
pub struct StateRelay {
    sink: SinkRef,
    table: Mutex<Table>,
}

impl StateRelay {
    /// Creates a relay delivering to `sink`.
    pub fn new(sink: SinkRef) -> Self {
        Self {
            sink,
            table: Mutex::new(Table::default()),
        }
    }

    /// Current table as `{ "<worker>": online }`.
    pub async fn snapshot(&self) -> Value {
        to_value(&self.table.lock().await.online)
    }
}

fn to_value(online: &BTreeMap<Arc<str>, bool>) -> Value {
    let map: Map<String, Value> = online
        .iter()
        .map(|(name, up)| (name.to_string(), Value::Bool(*up)))
        .collect();
    Value::Object(map)
}

#[async_trait]
impl Subscribe for StateRelay {
    async fn on_event(&self, e: &Event) {
        let Some(worker) = e.worker.as_ref() else {
            return;
        };
        let up = match e.kind {
            EventKind::WorkerStarting => None,
            EventKind::WorkerOnline => Some(true),
            EventKind::WorkerExited | EventKind::SpawnFailed | EventKind::WorkerStopped => Some(false),
            _ => return,
        };

        let msg = {
            let mut table = self.table.lock().await;
            let changed = match (table.online.get(worker).copied(), up) {
                (None, next) => {
                    table.online.insert(Arc::clone(worker), next.unwrap_or(false));
                    true
                }
                (Some(_), None) => false,
                (Some(prev), Some(next)) => {
                    table.online.insert(Arc::clone(worker), next);
                    prev != next
                }
            };
            if !changed {
                return;
            }
            table.seq += 1;
            Message::state(table.seq, to_value(&table.online))
        };

        if let Err(err) = self.sink.deliver(&msg).await {
            tracing::warn!(sink = self.sink.name(), error = %err, "state delivery failed");
        }
    }

    fn name(&self) -> &'static str {
        "state-relay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{ChannelSink, MessageKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ev(kind: EventKind, worker: &str) -> Event {
        Event::new(kind).with_worker(worker)
    }

    #[tokio::test]
    async fn table_follows_output_and_exits() {
        let (sink, mut rx) = ChannelSink::new(16);
        let relay = StateRelay::new(Arc::new(sink));

        relay.on_event(&ev(EventKind::WorkerStarting, "sensor")).await;
        relay.on_event(&ev(EventKind::WorkerStarting, "gps")).await;
        relay.on_event(&ev(EventKind::WorkerSpawned, "gps")).await;
        relay.on_event(&ev(EventKind::WorkerOnline, "gps")).await;
        relay.on_event(&ev(EventKind::WorkerExited, "gps")).await;
        relay.on_event(&ev(EventKind::WorkerStopped, "gps")).await;
        relay.on_event(&ev(EventKind::WorkerStarting, "gps")).await;

        let got: Vec<(u64, Value)> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|m| {
                assert_eq!(m.kind, MessageKind::State);
                (m.seq, m.envelope())
            })
            .collect();
        assert_eq!(
            got,
            vec![
                (1, json!({"state": {"sensor": false}})),
                (2, json!({"state": {"gps": false, "sensor": false}})),
                (3, json!({"state": {"gps": true, "sensor": false}})),
                (4, json!({"state": {"gps": false, "sensor": false}})),
            ]
        );
        assert_eq!(relay.snapshot().await, json!({"gps": false, "sensor": false}));
    }

    #[tokio::test]
    async fn events_without_worker_are_ignored() {
        let (sink, mut rx) = ChannelSink::new(4);
        let relay = StateRelay::new(Arc::new(sink));
        relay.on_event(&Event::new(EventKind::ShutdownRequested)).await;
        assert!(rx.try_recv().is_err());
    }
}
