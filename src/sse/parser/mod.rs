//! SSE stream parsing logic
//!
//! Line classification, frame classification and the stateful `SseDecoder`
//! that turns raw chunk text into typed events.

mod payload;

use tracing::{debug, warn};

use crate::sse::events::{EventFrame, SseLine, SseParseError, StreamEvent, DEFAULT_EVENT_TYPE};
use crate::sse::frame_buffer::FrameBuffer;

pub use payload::decode_frame;

use payload::decode_final_frame;

/// Parse a single SSE line into its component type
///
/// Unlike `event:`, a `data:` value is not trimmed: only one leading space
/// and a trailing `\r` are removed, so whitespace inside token deltas
/// survives.
pub fn parse_sse_line(line: &str) -> SseLine {
    let line = line.strip_suffix('\r').unwrap_or(line);

    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }

    if let Some(rest) = line.strip_prefix("data:") {
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        return SseLine::Data(rest.to_string());
    }

    // id:, retry: and anything else this client has no use for
    SseLine::Comment(line.to_string())
}

/// Split one frame into its event type and data lines.
///
/// The last `event:` line wins; an empty one falls back to the default
/// type.
pub fn classify_frame(frame: &str) -> EventFrame {
    let mut event_type: Option<String> = None;
    let mut data_lines = Vec::new();

    for line in frame.split('\n') {
        match parse_sse_line(line) {
            SseLine::Event(name) => {
                event_type = Some(name).filter(|n| !n.is_empty());
            }
            SseLine::Data(data) => data_lines.push(data),
            SseLine::Empty | SseLine::Comment(_) => {}
        }
    }

    EventFrame {
        event_type: event_type.unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
        data_lines,
    }
}

/// Stateful decoder: chunk text in, typed events out.
///
/// Composes the frame buffer, the classifier and the payload decoder.
/// Decode failures are returned in-line so the caller decides whether to
/// log or count them; they never poison later frames.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: FrameBuffer,
    frames_seen: u64,
}

impl SseDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the outcome of every frame it completed.
    ///
    /// Keep-alive frames (no data lines on the default type) produce no
    /// entry.
    pub fn push(&mut self, chunk: &str) -> Vec<Result<StreamEvent, SseParseError>> {
        let frames = self.buffer.push(chunk);
        frames
            .iter()
            .filter_map(|frame| self.decode(frame))
            .collect()
    }

    /// Flush an unterminated final frame at end of stream.
    ///
    /// The frame is delivered only if its payload is complete; a tail cut
    /// off mid-payload is dropped.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let raw = self.buffer.finish()?;
        self.frames_seen += 1;
        let event = decode_final_frame(&classify_frame(&raw));
        if event.is_none() {
            debug!(bytes = raw.len(), "Dropping truncated final frame");
        }
        event
    }

    /// Number of frames decoded so far, keep-alives included
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Reset the decoder state
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.frames_seen = 0;
    }

    fn decode(&mut self, raw: &str) -> Option<Result<StreamEvent, SseParseError>> {
        self.frames_seen += 1;
        let frame = classify_frame(raw);
        match decode_frame(&frame) {
            Ok(Some(event)) => {
                debug!(
                    frame = self.frames_seen,
                    event = event.event_type_name(),
                    "Decoded SSE frame"
                );
                Some(Ok(event))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(
                    frame = self.frames_seen,
                    event_type = %frame.event_type,
                    "Dropping SSE frame: {}",
                    e
                );
                Some(Err(e))
            }
        }
    }
}
