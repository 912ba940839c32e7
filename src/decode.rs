//! Incremental decoding of chunked response bodies.
//!
//! Transport chunks arrive at arbitrary byte boundaries: a chunk may end in
//! the middle of a multi-byte UTF-8 sequence or in the middle of a line.
//! `Utf8Decoder` carries undecoded trailing bytes between chunks and
//! `LineBuffer` carries the trailing partial line, so that the layers above
//! only ever see complete lines regardless of how the body was split.

/// Incremental UTF-8 decoder.
///
/// Bytes that end a chunk mid-sequence are held back and prepended to the
/// next chunk. Invalid bytes decode to the replacement character; decoding
/// never fails.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let tail = incomplete_tail_len(&self.pending);
        let split = self.pending.len() - tail;
        let complete: Vec<u8> = self.pending.drain(..split).collect();

        String::from_utf8_lossy(&complete).into_owned()
    }

    /// Flush at end-of-stream. A dangling partial sequence decodes to the
    /// replacement character rather than being dropped.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&rest).into_owned()
    }
}

/// Number of trailing bytes that form the start of an unfinished UTF-8
/// sequence, 0 if the buffer ends on a character boundary.
fn incomplete_tail_len(buf: &[u8]) -> usize {
    let max_back = buf.len().min(3);
    for back in 1..=max_back {
        let b = buf[buf.len() - back];
        if b & 0b1100_0000 == 0b1000_0000 {
            // Continuation byte, keep scanning for the lead byte.
            continue;
        }
        let need = match b {
            0xF0..=0xF7 => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => return 0,
        };
        return if need > back { back } else { 0 };
    }
    0
}

/// Accumulates decoded text and yields complete newline-terminated lines.
///
/// The final segment after the last newline is retained as the remainder
/// for the next push. Lines come out exactly in arrival order.
#[derive(Debug, Default)]
pub struct LineBuffer {
    rest: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append decoded text and return every complete line now available.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.rest.push_str(text);

        let mut lines = Vec::new();
        while let Some(pos) = self.rest.find('\n') {
            let line = self.rest[..pos].to_string();
            self.rest.drain(..=pos);
            lines.push(line);
        }
        lines
    }

    /// Take the unterminated remainder at end-of-stream, if any.
    pub fn take_rest(&mut self) -> Option<String> {
        if self.rest.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.rest))
        }
    }
}
