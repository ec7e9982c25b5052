//! Streaming response handling and SSE line framing.

use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

use super::TransportError;
use crate::types::chat::ChatChunk;

/// Boxed body stream produced by a transport.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Prefix of a data line.
const DATA_PREFIX: &str = "data: ";

/// End-of-stream sentinel payload.
const DONE_SENTINEL: &str = "[DONE]";

/// Streaming HTTP response.
pub struct StreamingResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Byte stream.
    pub stream: ByteStream,
}

impl StreamingResponse {
    /// Returns true if the status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Accumulates body bytes and hands out complete lines.
///
/// Everything up to the last `\n` is released as lines; the trailing fragment
/// is kept until the next chunk completes it. Splitting happens on raw bytes,
/// so a multi-byte UTF-8 character cut by a chunk boundary is reassembled
/// before decoding.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
}

impl LineBuffer {
    /// Creates an empty line buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);

        complete[..last_newline]
            .split(|&b| b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Returns the buffered, not yet terminated fragment.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns true if no partial line is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discards any buffered fragment.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Classification of a single stream line.
#[derive(Debug, Clone)]
pub enum SseLine {
    /// Blank line, comment, or any line without the `data: ` prefix.
    Ignored,
    /// The `[DONE]` sentinel.
    Done,
    /// A decoded chunk.
    Chunk(ChatChunk),
    /// A data line whose payload is not valid chunk JSON.
    Malformed {
        /// The payload after the prefix.
        payload: String,
        /// Parser error message.
        error: String,
    },
}

/// Classifies one line of a streamed reply.
pub fn parse_line(line: &str) -> SseLine {
    let line = line.trim();

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return SseLine::Ignored;
    };

    if payload == DONE_SENTINEL {
        return SseLine::Done;
    }

    match serde_json::from_str::<ChatChunk>(payload) {
        Ok(chunk) => SseLine::Chunk(chunk),
        Err(e) => SseLine::Malformed {
            payload: payload.to_string(),
            error: e.to_string(),
        },
    }
}
