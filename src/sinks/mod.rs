//! # Output sinks for worker messages.
//!
//! Every JSON value a worker prints becomes a [`Message`] and is handed to the
//! supervisor's [`Sink`]. Delivery is sequential per worker, so a sink observes each
//! worker's messages in the order the worker printed them; messages of different
//! workers interleave freely.
//!
//! ```text
//! worker stdout ─► JsonStreamCodec ─► Message ─► Sink::deliver ─┬─► JsonLinesSink (stdout)
//!                                                              ├─► ChannelSink (in-process)
//!                                                              ├─► LogSink (tracing)
//!                                                              └─► DedupSink<S> ─► S
//! ```

mod channel;
mod dedup;
mod json_lines;
mod log;
mod sink;

pub use channel::ChannelSink;
pub use dedup::DedupSink;
pub use json_lines::JsonLinesSink;
pub use log::LogSink;
pub use sink::{Message, MessageKind, Sink, SinkRef};
