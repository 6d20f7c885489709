//! SSE line splitting and block assembly
//!
//! [`LineDecoder`] turns arbitrary byte chunks into text lines, accepting
//! `\n`, `\r\n` and bare `\r` terminators even when a terminator straddles
//! two chunks. [`SseParser`] folds those lines into [`Event`]s.

use super::Event;
use bytes::{Buf, BytesMut};

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const BOM: &[u8] = b"\xEF\xBB\xBF";

/// A line that is not valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event stream line is not valid UTF-8: {0}")]
pub struct InvalidLine(pub String);

/// Returns `(line_end, remainder_start)` for the first terminator in
/// `bytes`, or `None` if more data is needed.
///
/// A `\r` at the very end counts as a terminator on its own; the decoder
/// then drops a `\n` that opens the next chunk.
fn find_eol(bytes: &[u8]) -> Option<(usize, usize)> {
    let pos = bytes.iter().position(|b| *b == CR || *b == LF)?;
    match bytes.get(pos + 1) {
        Some(&LF) if bytes[pos] == CR => Some((pos, pos + 2)),
        _ => Some((pos, pos + 1)),
    }
}

/// Incremental splitter from byte chunks to lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
    started: bool,
    skip_lf: bool,
}

impl LineDecoder {
    /// Empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete line, if the buffer holds one.
    pub fn next_line(&mut self) -> Option<Result<String, InvalidLine>> {
        self.strip_bom()?;
        self.skip_split_lf();
        let (line_end, rem_start) = find_eol(&self.buffer)?;
        self.skip_lf = self.buffer[line_end] == CR && rem_start == self.buffer.len();
        let line = self.buffer.split_to(line_end);
        self.buffer.advance(rem_start - line_end);
        Some(decode(&line))
    }

    /// Whatever is left once the body has ended, as a final line.
    pub fn finish(&mut self) -> Option<Result<String, InvalidLine>> {
        self.strip_bom()?;
        self.skip_split_lf();
        let rest = self.buffer.split();
        if rest.is_empty() {
            return None;
        }
        Some(decode(&rest))
    }

    /// Second half of a `\r\n` whose `\r` ended the previous chunk.
    fn skip_split_lf(&mut self) {
        if !self.skip_lf || self.buffer.is_empty() {
            return;
        }
        if self.buffer[0] == LF {
            self.buffer.advance(1);
        }
        self.skip_lf = false;
    }

    /// Drop a leading byte-order mark once. `None` while it is still
    /// impossible to tell whether the stream starts with one.
    fn strip_bom(&mut self) -> Option<()> {
        if self.started {
            return Some(());
        }
        let seen = self.buffer.len().min(BOM.len());
        if self.buffer[..seen] != BOM[..seen] {
            self.started = true;
            return Some(());
        }
        if seen < BOM.len() {
            return None;
        }
        self.buffer.advance(BOM.len());
        self.started = true;
        Some(())
    }
}

fn decode(line: &[u8]) -> Result<String, InvalidLine> {
    std::str::from_utf8(line)
        .map(str::to_owned)
        .map_err(|e| InvalidLine(e.to_string()))
}

/// Accumulates the fields of one block and emits an [`Event`] per block.
///
/// All fields are per block: an event carries only the `id`, `event` and
/// `retry` values seen since the previous blank line.
#[derive(Debug, Default)]
pub struct SseParser {
    id: Option<String>,
    event: Option<String>,
    data: Vec<String>,
    retry: Option<u64>,
}

impl SseParser {
    /// Fresh parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator).
    pub fn push_line(&mut self, line: &str) -> Option<Event> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "id" => self.id = Some(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "retry" => self.retry = value.trim().parse().ok(),
            _ => {}
        }
        None
    }

    /// Flush a block left open when the stream ended.
    pub fn finish(&mut self) -> Option<Event> {
        self.dispatch()
    }

    fn dispatch(&mut self) -> Option<Event> {
        let block = std::mem::take(self);
        if block.data.is_empty() {
            return None;
        }
        Some(Event {
            id: block.id,
            event: block.event,
            data: block.data.join("\n"),
            retry: block.retry,
        })
    }
}

/// Parse a complete in-memory SSE document.
pub fn parse_str(input: &str) -> Result<Vec<Event>, InvalidLine> {
    let mut decoder = LineDecoder::new();
    let mut parser = SseParser::new();
    let mut events = Vec::new();

    decoder.extend(input.as_bytes());
    while let Some(line) = decoder.next_line() {
        events.extend(parser.push_line(&line?));
    }
    if let Some(line) = decoder.finish() {
        events.extend(parser.push_line(&line?));
    }
    events.extend(parser.finish());
    Ok(events)
}
