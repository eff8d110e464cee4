//! Incremental decoder for `text/event-stream` chat-completion bodies.
//!
//! Bytes arrive in arbitrary pieces, so partial lines (and partial UTF-8
//! sequences) are buffered until their newline shows up. Only lines of the
//! form `data: <payload>` matter: `[DONE]` ends the stream, anything else is
//! a JSON chunk whose `choices[0].delta.content` is a text fragment.
//! Malformed chunks are skipped.

use tracing::debug;

use super::types::StreamChunk;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Fragment(String),
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next piece of the body and return the events it completed.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that had no newline.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        parse_line(&String::from_utf8_lossy(&line))
    }
}

/// Interpret one line of the stream.
#[must_use]
pub fn parse_line(line: &str) -> Option<SseEvent> {
    let data = line.trim_end_matches(['\r', '\n']).strip_prefix("data: ")?.trim();
    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk.into_text().map(SseEvent::Fragment),
        Err(e) => {
            debug!(error = %e, "skipping malformed stream chunk");
            None
        }
    }
}

#[cfg(test)]
#[path = "sse_test.rs"]
mod tests;
