//! Mock implementations for test fixtures.
//!
//! Re-exports the mocks from `kbchat::adapters::mock` and adds byte-level
//! stream scripting.

pub use kbchat::adapters::mock::{MockHttpClient, MockResponse, RecordedRequest};
pub use kbchat::traits::{Headers, HttpClient, HttpError, Response};

use bytes::Bytes;

/// A stream delivering raw byte chunks, for cuts inside a UTF-8 sequence.
pub fn byte_chunks(chunks: &[&[u8]]) -> MockResponse {
    MockResponse::Stream(chunks.iter().map(|c| Bytes::copy_from_slice(c)).collect())
}

/// A stream cut into the given pieces of text.
pub fn text_chunks(chunks: &[String]) -> MockResponse {
    MockResponse::chunks(chunks.iter().cloned())
}

/// A frame carrying one JSON-encoded token delta.
pub fn token_frame(delta: &str) -> String {
    format!("data: {}\n\n", serde_json::Value::String(delta.to_string()))
}

/// A `sources` frame for `(filename, score, preview)` triples.
pub fn sources_frame(citations: &[(&str, f64, &str)]) -> String {
    let list: Vec<_> = citations
        .iter()
        .map(|(filename, score, preview)| {
            serde_json::json!({"filename": filename, "score": score, "preview": preview})
        })
        .collect();
    format!("event: sources\ndata: {}\n\n", serde_json::Value::Array(list))
}

pub const DONE_FRAME: &str = "data: [DONE]\n\n";
