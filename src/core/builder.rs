//! # SupervisorBuilder: assembles a [`Supervisor`].
//!
//! ```text
//! SupervisorBuilder::new(cfg)
//!     .with_sink(sink)              // default: JSON lines on stdout
//!     .with_subscribers(subs)       // event observers (LogWriter, ...)
//!     .with_teardown(hook)          // run by the coordinator after stop_all
//!     .build()                      // → Arc<Supervisor>; needs a tokio runtime
//! ```

use std::sync::Arc;

use crate::{
    core::{SupervisorConfig, TerminatingFlag, actor::ActorContext, supervisor::Supervisor},
    events::Bus,
    sinks::{JsonLinesSink, SinkRef},
    subscribers::{Subscribe, SubscriberSet},
    workers::HookRef,
};

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    sink: Option<SinkRef>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    teardown: Vec<HookRef>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            sink: None,
            subscribers: Vec::new(),
            teardown: Vec::new(),
        }
    }

    /// Sets the output sink every worker message is delivered to.
    pub fn with_sink(mut self, sink: SinkRef) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one event subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Adds a teardown hook. Hooks run in the order they were added.
    pub fn with_teardown(mut self, hook: HookRef) -> Self {
        self.teardown.push(hook);
        self
    }

    /// Builds the supervisor and spawns its event listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(JsonLinesSink::stdout()));

        let ctx = ActorContext {
            bus,
            sink,
            cfg: Arc::new(self.cfg),
            flag: TerminatingFlag::new(),
        };
        Arc::new(Supervisor::new_internal(ctx, subs, self.teardown))
    }
}
