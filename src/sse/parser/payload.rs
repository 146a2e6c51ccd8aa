//! Payload decoding for classified frames

use crate::models::Citation;
use crate::sse::events::{EventFrame, SseParseError, StreamEvent, DONE_SENTINEL};

/// Decode a classified frame into a typed event.
///
/// Returns:
/// - `Ok(Some(event))` - the frame carried an event
/// - `Ok(None)` - a default frame with no data lines (keep-alive)
/// - `Err(error)` - a `sources` payload that is not a citation list
pub fn decode_frame(frame: &EventFrame) -> Result<Option<StreamEvent>, SseParseError> {
    match frame.event_type.as_str() {
        "sources" => decode_sources(&frame.payload()).map(Some),
        "title" => Ok(Some(StreamEvent::TitleChanged)),
        // "message", no event line, and anything we do not know
        _ => Ok(decode_token(frame)),
    }
}

fn decode_token(frame: &EventFrame) -> Option<StreamEvent> {
    if !frame.has_data() {
        return None;
    }

    let raw = frame.payload();
    if raw == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<String>(&raw) {
        Ok(text) if text == DONE_SENTINEL => Some(StreamEvent::Done),
        Ok(text) => Some(StreamEvent::Token(text)),
        // Not a JSON string: the raw text is the delta
        Err(_) => Some(StreamEvent::Token(raw)),
    }
}

/// Decode the unterminated frame left over at end of stream.
///
/// The connection may have closed mid-payload, so nothing is guessed: a
/// token must be the sentinel or a complete JSON string, and sources must
/// parse. Anything else yields `None`.
pub(super) fn decode_final_frame(frame: &EventFrame) -> Option<StreamEvent> {
    match frame.event_type.as_str() {
        "sources" => decode_sources(&frame.payload()).ok(),
        "title" => Some(StreamEvent::TitleChanged),
        _ => {
            if !frame.has_data() {
                return None;
            }
            let raw = frame.payload();
            if raw == DONE_SENTINEL {
                return Some(StreamEvent::Done);
            }
            match serde_json::from_str::<String>(&raw).ok()? {
                text if text == DONE_SENTINEL => Some(StreamEvent::Done),
                text => Some(StreamEvent::Token(text)),
            }
        }
    }
}

fn decode_sources(data: &str) -> Result<StreamEvent, SseParseError> {
    let citations: Vec<Citation> =
        serde_json::from_str(data).map_err(|e| SseParseError::InvalidSources {
            source: e.to_string(),
        })?;
    Ok(StreamEvent::SourcesAttached(citations))
}
