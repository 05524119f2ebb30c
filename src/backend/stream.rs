// src/backend/stream.rs

// Both backends put one JSON object per line (NDJSON) or per `data:` event (SSE),
// so splitting on newlines recovers whole objects however the body was sliced.

use futures::StreamExt;
use serde::de::DeserializeOwned;

use super::error::BackendResult;
use super::transport::HttpResponse;
use crate::types::{OllamaChunk, OpenAIStreamResponse};

/// Marks the end of an SSE stream; never carries text.
pub const SSE_DONE: &str = "[DONE]";

/// Byte buffer that hands out complete lines and keeps the trailing partial one.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, without terminators.
    ///
    /// Lines are decoded only once complete, so a UTF-8 sequence split across
    /// two reads is reassembled before decoding.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Take whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// How JSON objects are laid out on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    /// One object per line. A stray `data: ` prefix is tolerated.
    Ndjson,
    /// `data: <json>` events closed by `data: [DONE]`. Other lines are ignored.
    Sse,
}

impl Framing {
    /// The JSON text carried by a line, or `None` if the line carries nothing.
    pub fn payload<'a>(&self, line: &'a str) -> Option<&'a str> {
        let trimmed = line.trim();
        let payload = match self {
            Self::Ndjson => trimmed.strip_prefix("data:").map(str::trim_start).unwrap_or(trimmed),
            Self::Sse => trimmed.strip_prefix("data:")?.trim_start(),
        };

        if payload.is_empty() || payload == SSE_DONE {
            return None;
        }
        Some(payload)
    }
}

/// A decoded stream object that may carry a text delta.
pub trait StreamChunk: DeserializeOwned {
    fn delta(&self) -> Option<&str>;
}

impl StreamChunk for OllamaChunk {
    fn delta(&self) -> Option<&str> {
        self.text()
    }
}

impl StreamChunk for OpenAIStreamResponse {
    fn delta(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.as_ref())
            .and_then(|d| d.content.as_deref())
    }
}

/// Rolling reducer: bytes in, deltas out, full answer accumulated.
#[derive(Debug)]
pub struct ChunkReducer<C> {
    lines: LineBuffer,
    framing: Framing,
    text: String,
    last: Option<C>,
}

/// What a finished stream left behind.
#[derive(Debug)]
pub struct Reduced<C> {
    pub text: String,
    /// Last object that decoded successfully.
    pub last: Option<C>,
}

impl<C: StreamChunk> ChunkReducer<C> {
    pub fn new(framing: Framing) -> Self {
        Self {
            lines: LineBuffer::new(),
            framing,
            text: String::new(),
            last: None,
        }
    }

    pub fn feed<F>(&mut self, chunk: &[u8], on_delta: &mut F)
    where
        F: FnMut(&str) + ?Sized,
    {
        for line in self.lines.push(chunk) {
            self.process_line(&line, on_delta);
        }
    }

    /// Flush the trailing partial line under the same rules and return the result.
    pub fn finish<F>(mut self, on_delta: &mut F) -> Reduced<C>
    where
        F: FnMut(&str) + ?Sized,
    {
        if let Some(rest) = self.lines.finish() {
            self.process_line(&rest, on_delta);
        }
        Reduced {
            text: self.text,
            last: self.last,
        }
    }

    fn process_line<F>(&mut self, line: &str, on_delta: &mut F)
    where
        F: FnMut(&str) + ?Sized,
    {
        let Some(payload) = self.framing.payload(line) else {
            return;
        };

        let chunk: C = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                log::debug!("[stream] skipping malformed chunk: {}", e);
                return;
            }
        };

        if let Some(delta) = chunk.delta().filter(|d| !d.is_empty()) {
            self.text.push_str(delta);
            on_delta(delta);
        }
        self.last = Some(chunk);
    }
}

/// Drive a response body through a reducer, forwarding each delta as it arrives.
pub async fn read_stream<C>(
    response: HttpResponse,
    framing: Framing,
    on_delta: &mut (dyn FnMut(&str) + Send),
) -> BackendResult<Reduced<C>>
where
    C: StreamChunk + Send,
{
    let mut body = response.body;
    let mut reducer = ChunkReducer::<C>::new(framing);

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        reducer.feed(&chunk, &mut *on_delta);
    }

    Ok(reducer.finish(&mut *on_delta))
}
