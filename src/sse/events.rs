//! SSE event types and definitions
//!
//! `StreamEvent` is the closed set of things a chat stream can tell the
//! conversation. Everything upstream of it deals in strings; everything
//! downstream matches on the enum.

use crate::models::Citation;

/// Event type used when a frame carries no `event:` line.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// Payload that marks normal completion of a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Decoded events from the chat stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Text fragment to append to the open assistant reply
    Token(String),
    /// Citations for the open reply; replaces any earlier list
    SourcesAttached(Vec<Citation>),
    /// The server renamed the session; carries no payload
    TitleChanged,
    /// Stream completed successfully
    Done,
}

impl StreamEvent {
    /// Returns the event type name as a string for logging.
    pub fn event_type_name(&self) -> &'static str {
        match self {
            StreamEvent::Token(_) => "token",
            StreamEvent::SourcesAttached(_) => "sources",
            StreamEvent::TitleChanged => "title",
            StreamEvent::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }
}

/// Represents a parsed SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Event type declaration (e.g., "event: sources")
    Event(String),
    /// Data payload (e.g., "data: \"hello\"")
    Data(String),
    /// Empty line
    Empty,
    /// Comment or any field this client does not use (`id:`, `retry:`)
    Comment(String),
}

/// One frame split into its event type and data lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame {
    /// Value of the `event:` line, or [`DEFAULT_EVENT_TYPE`]
    pub event_type: String,
    /// Each `data:` line with its marker stripped, in order
    pub data_lines: Vec<String>,
}

impl EventFrame {
    /// The payload as the sender meant it: data lines joined by `\n`.
    pub fn payload(&self) -> String {
        self.data_lines.join("\n")
    }

    pub fn has_data(&self) -> bool {
        !self.data_lines.is_empty()
    }
}

/// Errors that can occur while decoding a frame
///
/// None of these end a stream; the caller logs and drops the frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SseParseError {
    /// A `sources` payload that is not a JSON list of citations
    InvalidSources { source: String },
}

impl std::fmt::Display for SseParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SseParseError::InvalidSources { source } => {
                write!(f, "Invalid citation list: {}", source)
            }
        }
    }
}

impl std::error::Error for SseParseError {}
