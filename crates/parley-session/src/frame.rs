//! Incremental parser for the relay's event stream.
//!
//! The stream is newline-delimited text. Lines starting with `data:` carry
//! one JSON [`SseFrame`] each; blank lines separate events and every other
//! line (`event:`, `id:`, `:` comments) is ignored. Bytes are buffered
//! until a full line is available, so frames and multi-byte characters may
//! be split across reads arbitrarily.

use parley_core::wire::SseFrame;

const DATA_PREFIX: &[u8] = b"data:";

/// Longest line held back waiting for its newline. Anything longer is
/// counted as malformed and dropped through to the next newline.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
    skipped: usize,
    /// Inside an oversized line whose head was already dropped.
    discarding: bool,
}

enum Line {
    Frame(SseFrame),
    Malformed,
    Ignored,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes and return every frame completed by it,
    /// in stream order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            if self.discarding {
                self.discarding = false;
                start = end + 1;
                continue;
            }
            match parse_line(&self.buffer[start..end]) {
                Line::Frame(frame) => frames.push(frame),
                Line::Malformed => self.skipped += 1,
                Line::Ignored => {}
            }
            start = end + 1;
        }
        self.buffer.drain(..start);

        if self.buffer.len() > MAX_LINE_BYTES {
            if !self.discarding {
                tracing::debug!(len = self.buffer.len(), "dropping oversized line");
                self.skipped += 1;
                self.discarding = true;
            }
            self.buffer.clear();
        }

        frames
    }

    /// Flush a trailing line that never got its newline. Call once the
    /// transport has ended.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buffer);
        if std::mem::take(&mut self.discarding) {
            return None;
        }
        match parse_line(&rest) {
            Line::Frame(frame) => Some(frame),
            Line::Malformed => {
                self.skipped += 1;
                None
            }
            Line::Ignored => None,
        }
    }

    /// Number of data lines dropped because their payload did not parse.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Bytes held back waiting for the rest of a line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn parse_line(line: &[u8]) -> Line {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Line::Ignored;
    };

    let Ok(payload) = std::str::from_utf8(payload) else {
        tracing::debug!(len = payload.len(), "skipping non-UTF-8 data line");
        return Line::Malformed;
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Line::Ignored;
    }

    match serde_json::from_str::<SseFrame>(payload) {
        Ok(frame) => Line::Frame(frame),
        Err(e) => {
            tracing::debug!(error = %e, "skipping malformed data line");
            Line::Malformed
        }
    }
}
