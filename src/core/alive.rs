//! # Worker liveness tracker with sequence-based ordering.
//!
//! Maintains which workers currently have a live process, using event sequence
//! numbers to handle out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! WorkerActor ──► Bus ──► supervisor listener ──► AliveTracker::update()
//!                                                         │
//!                                                         ▼
//!                                              HashMap<Arc<str>, WorkerLiveness>
//!                                                  (name → {seq, alive})
//! ```
//!
//! ## Rules
//! - `WorkerSpawned` marks a worker alive.
//! - `WorkerExited`, `SpawnFailed` and `WorkerStopped` mark it dead.
//! - Other events with a worker name only advance `last_seq`.
//! - Events with `seq <= last_seq` are **rejected** (stale).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone, Copy)]
struct WorkerLiveness {
    last_seq: u64,
    alive: bool,
}

/// Thread-safe tracker of live worker processes.
#[derive(Debug, Default)]
pub struct AliveTracker {
    state: RwLock<HashMap<Arc<str>, WorkerLiveness>>,
}

impl AliveTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last event seen for its worker.
    ///
    /// Returns `true` if the alive status changed.
    ///
    /// ```text
    /// update(WorkerExited,  seq=100) → alive=false, last_seq=100
    /// update(WorkerSpawned, seq=99)  → rejected (stale)
    /// ```
    pub async fn update(&self, ev: &Event) -> bool {
        // Subscriber reports reuse `worker` for the subscriber name.
        if ev.is_subscriber_report() {
            return false;
        }
        let Some(name) = ev.worker.as_ref() else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(Arc::clone(name)).or_insert(WorkerLiveness {
            last_seq: 0,
            alive: false,
        });

        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;

        let alive = match ev.kind {
            EventKind::WorkerSpawned => true,
            EventKind::WorkerExited | EventKind::SpawnFailed | EventKind::WorkerStopped => false,
            _ => return false,
        };
        let changed = entry.alive != alive;
        entry.alive = alive;
        changed
    }

    /// Returns the sorted names of workers with a live process.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut alive: Vec<String> = state
            .iter()
            .filter(|(_, w)| w.alive)
            .map(|(name, _)| name.to_string())
            .collect();
        alive.sort_unstable();
        alive
    }

    /// True if the named worker currently has a live process.
    pub async fn is_alive(&self, name: &str) -> bool {
        self.state
            .read()
            .await
            .get(name)
            .is_some_and(|w| w.alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawned_then_exited() {
        let tracker = AliveTracker::new();
        assert!(
            tracker
                .update(&Event::new(EventKind::WorkerSpawned).with_worker("gps"))
                .await
        );
        assert!(tracker.is_alive("gps").await);
        assert_eq!(tracker.snapshot().await, vec!["gps".to_string()]);

        tracker
            .update(&Event::new(EventKind::WorkerExited).with_worker("gps"))
            .await;
        assert!(!tracker.is_alive("gps").await);
        assert!(tracker.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn stale_events_are_rejected() {
        let tracker = AliveTracker::new();
        let spawned = Event::new(EventKind::WorkerSpawned).with_worker("sensor");
        let exited = Event::new(EventKind::WorkerExited).with_worker("sensor");

        tracker.update(&exited).await;
        assert!(!tracker.update(&spawned).await);
        assert!(!tracker.is_alive("sensor").await);
    }

    #[tokio::test]
    async fn subscriber_reports_are_ignored() {
        let tracker = AliveTracker::new();
        let ev = Event::subscriber_overflow("log-writer", "full");
        assert!(!tracker.update(&ev).await);
        assert!(tracker.snapshot().await.is_empty());
    }
}
