//! SSE (Server-Sent Events) stream decoding
//!
//! The chat stream is a sequence of frames separated by a blank line:
//! - `event: <type>` - optional event type line (`sources`, `title`)
//! - `data: <payload>` - one or more payload lines, joined with `\n`
//! - Lines starting with `:` - comments (ignored)
//!
//! # Module structure
//! - `frame_buffer` - Blank-line framing that survives arbitrary chunk splits
//! - `events` - Event type definitions (StreamEvent, EventFrame, SseLine, SseParseError)
//! - `parser` - Line/frame classification, payload decoding and SseDecoder

mod events;
mod frame_buffer;
mod parser;

// Re-export public types
pub use events::{
    EventFrame, SseLine, SseParseError, StreamEvent, DEFAULT_EVENT_TYPE, DONE_SENTINEL,
};
pub use frame_buffer::FrameBuffer;
pub use parser::{classify_frame, decode_frame, parse_sse_line, SseDecoder};
