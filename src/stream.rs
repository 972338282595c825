use crate::events::StreamEvent;

/// Terminator sentinel sent by the chat service at end of stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Optional event-prefix marker carried by SSE-style frames
const DATA_PREFIX: &str = "data: ";

/// Splits a streamed response body into complete lines.
///
/// A chunk boundary may fall anywhere, including inside a multi-byte
/// character, so the framer buffers raw bytes across reads and only
/// decodes once a full line is available. Feeding the same bytes in
/// one push or split arbitrarily across many pushes yields the same
/// line sequence.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly read bytes and return every complete line,
    /// decoded and trimmed, with empty lines dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&raw[..newline_pos]).trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// Drain whatever is left once the body has ended. The stream is
    /// over, so a final segment without a newline is still a line.
    pub fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&raw).trim().to_string();
        if line.is_empty() { None } else { Some(line) }
    }
}

/// A single frame extracted from the stream
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Event(StreamEvent),
    Done,
}

/// Classify one complete line.
///
/// Strips the optional `data: ` marker first; the literal `[DONE]` is
/// the terminator. Anything else is decoded as a JSON event; a line
/// that is not valid JSON maps to `Unrecognized` rather than being
/// held back, since the framer already accounts for chunk-split lines.
pub fn parse_frame(line: &str) -> Frame {
    let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line).trim();

    if payload == DONE_SENTINEL {
        return Frame::Done;
    }

    match StreamEvent::from_json(payload) {
        Some(event) => Frame::Event(event),
        None => Frame::Event(StreamEvent::Unrecognized {
            event: format!("unparseable: {payload}"),
        }),
    }
}
