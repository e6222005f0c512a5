//! # JSON stream decoder for worker stdout.
//!
//! Rig workers print one JSON document per reading. Some terminate each document
//! with a newline, others write documents back to back in whatever chunks the pipe
//! delivers. [`JsonStreamCodec`] handles both: it decodes one complete JSON value at
//! a time from the front of the buffer and leaves partial values for the next read.
//!
//! ## Rules
//! - Whitespace (including newlines) between values is skipped.
//! - A top-level number that ends exactly at the buffer end is held back until a
//!   delimiter or EOF arrives (`12` may be the prefix of `123`).
//! - Malformed input yields [`Frame::Malformed`] and the rest of the offending line
//!   is discarded; decoding resumes on the next line. Errors never terminate the
//!   stream.
//! - A value larger than `max_frame_len` bytes is rejected the same way.

use std::io;

use bytes::{Buf, BytesMut};
use serde_json::Value;
use tokio_util::codec::Decoder;

/// One decoded unit of worker output.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// A complete JSON value.
    Value(Value),
    /// Undecodable input, with the parser's explanation.
    Malformed(String),
}

/// Incremental decoder of concatenated or newline-delimited JSON values.
#[derive(Clone, Debug)]
pub struct JsonStreamCodec {
    max_frame_len: usize,
    discarding: bool,
}

impl JsonStreamCodec {
    /// Creates a decoder that rejects values larger than `max_frame_len` bytes.
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            max_frame_len: max_frame_len.max(1),
            discarding: false,
        }
    }

    /// Drops input up to and including the next newline.
    ///
    /// Without a newline the whole buffer is dropped and the decoder keeps
    /// discarding until one arrives.
    fn skip_line(&mut self, src: &mut BytesMut) {
        match src.iter().position(|b| *b == b'\n') {
            Some(i) => {
                src.advance(i + 1);
                self.discarding = false;
            }
            None => {
                src.clear();
                self.discarding = true;
            }
        }
    }
}

impl Default for JsonStreamCodec {
    fn default() -> Self {
        Self::new(1 << 20)
    }
}

fn skip_whitespace(src: &mut BytesMut) {
    let n = src.iter().take_while(|b| b.is_ascii_whitespace()).count();
    src.advance(n);
}

impl Decoder for JsonStreamCodec {
    type Item = Frame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Frame>> {
        if self.discarding {
            self.skip_line(src);
            if self.discarding {
                return Ok(None);
            }
        }

        skip_whitespace(src);
        if src.is_empty() {
            return Ok(None);
        }

        let parsed = {
            let mut stream = serde_json::Deserializer::from_slice(&src[..]).into_iter::<Value>();
            stream
                .next()
                .map(|res| res.map(|value| (value, stream.byte_offset())))
        };

        match parsed {
            Some(Ok((value, used))) => {
                if value.is_number() && used == src.len() {
                    return Ok(None);
                }
                src.advance(used);
                if used > self.max_frame_len {
                    return Ok(Some(Frame::Malformed(format!(
                        "message exceeds {} bytes",
                        self.max_frame_len
                    ))));
                }
                Ok(Some(Frame::Value(value)))
            }
            Some(Err(e)) if e.is_eof() => {
                if src.len() > self.max_frame_len {
                    let reason = format!("message exceeds {} bytes", self.max_frame_len);
                    self.skip_line(src);
                    return Ok(Some(Frame::Malformed(reason)));
                }
                Ok(None)
            }
            Some(Err(e)) => {
                self.skip_line(src);
                Ok(Some(Frame::Malformed(e.to_string())))
            }
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> io::Result<Option<Frame>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if self.discarding {
            src.clear();
            self.discarding = false;
            return Ok(None);
        }

        skip_whitespace(src);
        if src.is_empty() {
            return Ok(None);
        }

        let frame = match serde_json::from_slice::<Value>(&src[..]) {
            Ok(value) => Frame::Value(value),
            Err(e) => Frame::Malformed(e.to_string()),
        };
        src.clear();
        Ok(Some(frame))
    }
}
