//! # Worker registry: named actors owned by the supervisor.
//!
//! The registry is the explicit map of named, independently restartable workers.
//! Each slot owns the actor's join handle and a read handle on its status.
//!
//! ## Rules
//! - At most one live actor per name. A name whose actor has finished may be reused.
//! - Slots are kept after their actor stops, so `handle()` keeps answering.
//! - The terminating flag is checked **under the write lock** when spawning, and
//!   `stop_all` takes the same lock after tripping it. A start racing a stop either
//!   lands before the stop collects its joins or is refused.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::{sync::RwLock, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{
    core::actor::{ActorContext, ActorExit, WorkerActor},
    error::RuntimeError,
    workers::{WorkerHandle, WorkerSpec},
};

struct Slot {
    handle: WorkerHandle,
    join: Option<JoinHandle<ActorExit>>,
}

impl Slot {
    fn is_live(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }
}

/// Map of worker name to actor slot.
pub(crate) struct Registry {
    slots: RwLock<HashMap<Arc<str>, Slot>>,
    root: CancellationToken,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            root: CancellationToken::new(),
        }
    }

    /// Spawns an actor for `spec` and registers it.
    pub(crate) async fn spawn(&self, spec: WorkerSpec, ctx: &ActorContext) -> Result<WorkerHandle, RuntimeError> {
        let name = spec.name_arc();
        let mut slots = self.slots.write().await;

        if ctx.flag.is_set() {
            return Err(RuntimeError::Terminating { name: name.to_string() });
        }
        if slots.get(&name).is_some_and(Slot::is_live) {
            return Err(RuntimeError::DuplicateWorker { name: name.to_string() });
        }

        let (tx, handle) = WorkerHandle::channel(Arc::clone(&name));
        let actor = WorkerActor::new(spec, ctx.clone(), tx);
        let token = self.root.child_token();
        let join = tokio::spawn(actor.run(token));

        slots.insert(
            name,
            Slot {
                handle: handle.clone(),
                join: Some(join),
            },
        );
        Ok(handle)
    }

    pub(crate) async fn handle(&self, name: &str) -> Option<WorkerHandle> {
        self.slots.read().await.get(name).map(|s| s.handle.clone())
    }

    pub(crate) async fn handles(&self) -> Vec<WorkerHandle> {
        self.slots.read().await.values().map(|s| s.handle.clone()).collect()
    }

    /// Returns sorted list of registered worker names.
    pub(crate) async fn list(&self) -> Vec<String> {
        let slots = self.slots.read().await;
        let mut names: Vec<String> = slots.keys().map(|k| k.to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Cancels every actor and joins them within `grace`.
    ///
    /// Actors still running at the deadline are aborted, which drops (and kills)
    /// their child and leaves their handle `Stopped`. Returns the sorted names of
    /// those actors.
    pub(crate) async fn stop_all(&self, grace: Duration) -> Vec<String> {
        let joins: Vec<(Arc<str>, JoinHandle<ActorExit>)> = {
            let mut slots = self.slots.write().await;
            self.root.cancel();
            slots
                .iter_mut()
                .filter_map(|(name, slot)| slot.join.take().map(|j| (Arc::clone(name), j)))
                .collect()
        };

        let deadline = time::Instant::now() + grace;
        let mut stuck = Vec::new();

        for (name, mut join) in joins {
            match time::timeout_at(deadline, &mut join).await {
                Ok(Ok(exit)) => tracing::debug!(worker = &*name, ?exit, "actor joined"),
                Ok(Err(e)) => tracing::error!(worker = &*name, error = %e, "actor died"),
                Err(_elapsed) => {
                    join.abort();
                    // Dropping the actor kills its child and marks the handle stopped.
                    let _ = join.await;
                    stuck.push(name.to_string());
                }
            }
        }
        stuck.sort_unstable();
        stuck
    }
}
