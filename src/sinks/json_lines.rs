//! # JSON lines sink.
//!
//! Writes each message as one line `{"<worker>": <payload>}` to an async writer,
//! stdout by default. This is the freestanding mode: the rig is run under another
//! process that reads the supervisor's stdout.
//!
//! Lines from concurrent workers never interleave mid-line: the writer is behind a
//! mutex and each line is written and flushed under the lock.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

use crate::error::SinkError;

use super::{Message, Sink};

/// Sink that prints one JSON envelope per line.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    out: Mutex<W>,
}

impl JsonLinesSink<Stdout> {
    /// Sink writing to the process stdout.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Sink writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W> Sink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn deliver(&self, msg: &Message) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&msg.envelope())?;
        line.push(b'\n');

        let mut out = self.out.lock().await;
        out.write_all(&line).await?;
        out.flush().await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json-lines"
    }
}
