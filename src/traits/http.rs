//! HTTP client trait abstraction.
//!
//! The knowledge-base API client and the stream controller only ever talk
//! to the network through [`HttpClient`], so tests can swap in the scripted
//! [`MockHttpClient`](crate::adapters::MockHttpClient).

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// A chunked response body, yielded piece by piece as the server flushes it.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// HTTP response wrapper.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: Bytes,
}

impl Response {
    /// Create a new response.
    pub fn new(status: u16, body: Bytes) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
        }
    }

    /// Create a new response with headers.
    pub fn with_headers(status: u16, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the response body as a string.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }

    /// Parse the response body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// A file part for multipart uploads.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Form field name (the API expects `file`)
    pub field: String,
    /// File name reported to the server
    pub filename: String,
    /// MIME type, if known
    pub mime: Option<String>,
    /// Raw file contents
    pub data: Bytes,
}

/// HTTP client errors.
#[derive(Debug, Clone)]
pub enum HttpError {
    /// Connection failed
    ConnectionFailed(String),
    /// Request timeout
    Timeout(String),
    /// Server returned an error status
    ServerError { status: u16, message: String },
    /// Request was cancelled
    Cancelled,
    /// IO error while reading the body
    Io(String),
    /// Invalid URL
    InvalidUrl(String),
    /// Other error
    Other(String),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "Request timeout: {}", msg),
            HttpError::ServerError { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            HttpError::Cancelled => write!(f, "Request cancelled"),
            HttpError::Io(msg) => write!(f, "IO error: {}", msg),
            HttpError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            HttpError::Other(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for HTTP client operations.
///
/// Implementations are the reqwest-based [`ReqwestHttpClient`] used in
/// production and the [`MockHttpClient`] used in tests.
///
/// All methods except [`post_stream`](HttpClient::post_stream) return the
/// response whatever its status; callers decide what a non-2xx means.
/// `post_stream` fails with [`HttpError::ServerError`] on a non-2xx status
/// because there is no body worth streaming in that case.
///
/// [`ReqwestHttpClient`]: crate::adapters::ReqwestHttpClient
/// [`MockHttpClient`]: crate::adapters::MockHttpClient
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request.
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError>;

    /// Perform a POST request with a string body.
    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError>;

    /// Perform a DELETE request.
    async fn delete(&self, url: &str, headers: &Headers) -> Result<Response, HttpError>;

    /// Perform a multipart POST carrying a single file part.
    async fn post_multipart(
        &self,
        url: &str,
        file: FilePart,
        headers: &Headers,
    ) -> Result<Response, HttpError>;

    /// Perform a POST request and return the body as a chunk stream.
    ///
    /// Used for the chat stream endpoint, where the body arrives
    /// incrementally and chunk boundaries carry no meaning.
    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError>;
}
