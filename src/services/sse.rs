//! Server-Sent Events decoder
//!
//! Reassembles `data:` payloads from a chunked byte stream. Network chunks do
//! not line up with event boundaries, so bytes are buffered until a full line
//! is available and lines are buffered until a blank line ends the event.

use crate::utils::error::{ErrorContext, ProbeResult};

/// End-of-stream marker sent by OpenAI-compatible servers
pub const DONE_MARKER: &str = "[DONE]";

/// One decoded SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Payload of the event's `data:` lines, joined with '\n'
    Data(String),
    /// The `[DONE]` marker
    Done,
}

/// Incremental SSE decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every event completed by them
    pub fn push(&mut self, chunk: &[u8]) -> ProbeResult<Vec<SseFrame>> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = std::str::from_utf8(&line[..line.len() - 1])
                .protocol_context("Invalid UTF-8 in event stream")?;
            let line = line.strip_suffix('\r').unwrap_or(line);

            if let Some(frame) = self.accept_line(line) {
                frames.push(frame);
            }
        }

        Ok(frames)
    }

    /// Flush an event left open when the body ended without a blank line
    pub fn finish(&mut self) -> ProbeResult<Option<SseFrame>> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let line = std::str::from_utf8(&rest)
                .protocol_context("Invalid UTF-8 in event stream")?
                .trim_end_matches('\r')
                .to_string();
            if let Some(frame) = self.accept_line(&line) {
                return Ok(Some(frame));
            }
        }
        Ok(self.dispatch())
    }

    fn accept_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment line (keep-alive)
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        // event:, id: and retry: do not affect chat completion chunks
        if field == "data" {
            self.data.push(value.to_string());
        }

        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if self.data.is_empty() {
            return None;
        }

        let payload = self.data.join("\n");
        self.data.clear();

        if payload.trim() == DONE_MARKER {
            Some(SseFrame::Done)
        } else {
            Some(SseFrame::Data(payload))
        }
    }
}
