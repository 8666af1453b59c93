//! Byte-level SSE decoding.
//!
//! HTTP bodies arrive in arbitrary chunks: a chunk may end in the middle of a
//! line or in the middle of a multi-byte UTF-8 sequence. [`SseDecoder`] keeps
//! the unterminated tail as raw bytes and only decodes complete lines.

use bytes::BytesMut;

use super::events::Event;
use super::parser::{parse_event, SseParseError, SseParser};

/// Longest line the decoder buffers while waiting for its terminator
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Incremental decoder from raw body bytes to typed events
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    /// Prefix of `buffer` already known to hold no terminator
    scanned: usize,
    /// The last line ended in a CR at a chunk boundary; a leading LF in the
    /// next chunk belongs to it
    skip_lf: bool,
    parser: SseParser,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one body chunk, returning every frame it completed, in order.
    ///
    /// Lines end in LF, CRLF or a bare CR. A frame whose payload fails to
    /// parse yields an `Err` in its slot; the frames after it are
    /// unaffected. If the unterminated tail grows past [`MAX_LINE_BYTES`]
    /// it is discarded and the last slot is [`SseParseError::LineTooLong`].
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<Event, SseParseError>> {
        let mut chunk = chunk;
        if self.skip_lf && !chunk.is_empty() {
            if chunk[0] == b'\n' {
                chunk = &chunk[1..];
            }
            self.skip_lf = false;
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..]
            .iter()
            .position(|b| *b == b'\n' || *b == b'\r')
        {
            let end = self.scanned + offset;
            let mut consumed = end + 1;
            if self.buffer[end] == b'\r' {
                match self.buffer.get(end + 1).copied() {
                    Some(b'\n') => consumed += 1,
                    Some(_) => {}
                    None => self.skip_lf = true,
                }
            }

            let raw = self.buffer.split_to(consumed);
            self.scanned = 0;
            let line = String::from_utf8_lossy(&raw[..end]);
            if let Some(frame) = self.parser.feed_line(&line) {
                events.push(parse_event(&frame.data));
            }
        }
        self.scanned = self.buffer.len();

        if self.buffer.len() > MAX_LINE_BYTES {
            self.buffer.clear();
            self.scanned = 0;
            self.parser.reset();
            events.push(Err(SseParseError::LineTooLong {
                limit: MAX_LINE_BYTES,
            }));
        }
        events
    }

    /// Signal end of body. A trailing line without terminator is consumed,
    /// but a frame that never saw its blank line is discarded.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            let rest = self.buffer.split();
            let line = String::from_utf8_lossy(&rest);
            let _ = self.parser.feed_line(&line);
        }
        self.scanned = 0;
        self.skip_lf = false;
        self.parser.reset();
    }

    /// Bytes held back waiting for a line terminator
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}
