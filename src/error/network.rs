//! Network-related error types.
//!
//! Everything that goes wrong between this client and the knowledge-base
//! server on the plain REST endpoints lands here, classified from the
//! transport's `HttpError`.

use std::fmt;

use crate::traits::HttpError;

/// Network-specific error variants.
#[derive(Debug, Clone)]
pub enum NetworkError {
    /// Connection to the server failed.
    ConnectionFailed { url: String, message: String },

    /// Request timed out.
    Timeout { operation: String, message: String },

    /// HTTP status error (non-2xx response).
    HttpStatus { status: u16, message: String },

    /// Body could not be read or decoded.
    InvalidResponse { message: String },

    /// Request was cancelled.
    Cancelled,

    /// Generic network error.
    Other { message: String },
}

impl NetworkError {
    /// Check if this error is likely transient and can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::ConnectionFailed { .. } => true,
            NetworkError::Timeout { .. } => true,
            NetworkError::HttpStatus { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            NetworkError::InvalidResponse { .. } => false,
            NetworkError::Cancelled => false,
            NetworkError::Other { .. } => false,
        }
    }

    /// Whether the server answered with a 5xx status.
    pub fn is_server_error(&self) -> bool {
        matches!(self, NetworkError::HttpStatus { status, .. } if *status >= 500)
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            NetworkError::ConnectionFailed { url, .. } => {
                format!("Unable to reach the knowledge base at {}.", url)
            }
            NetworkError::Timeout { operation, .. } => {
                format!("The {} request timed out.", operation)
            }
            NetworkError::HttpStatus { status, message } => match *status {
                400 | 422 => format!("The server rejected the request: {}", message),
                404 => "The requested item was not found. It may have been deleted.".to_string(),
                500..=599 => {
                    "The server is experiencing issues. Please try again later.".to_string()
                }
                _ => format!("The server returned an error (HTTP {}).", status),
            },
            NetworkError::InvalidResponse { .. } => {
                "Received an invalid response from the server.".to_string()
            }
            NetworkError::Cancelled => "The request was cancelled.".to_string(),
            NetworkError::Other { message } => format!("Network error: {}", message),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed { .. } => "E_NET_CONN",
            NetworkError::Timeout { .. } => "E_NET_TIMEOUT",
            NetworkError::HttpStatus { .. } => "E_NET_HTTP",
            NetworkError::InvalidResponse { .. } => "E_NET_INVALID",
            NetworkError::Cancelled => "E_NET_CANCEL",
            NetworkError::Other { .. } => "E_NET_OTHER",
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::ConnectionFailed { url, message } => {
                write!(f, "Connection failed to '{}': {}", url, message)
            }
            NetworkError::Timeout { operation, message } => {
                write!(f, "{} timed out: {}", operation, message)
            }
            NetworkError::HttpStatus { status, message } => {
                write!(f, "HTTP {} error: {}", status, message)
            }
            NetworkError::InvalidResponse { message } => {
                write!(f, "Invalid response: {}", message)
            }
            NetworkError::Cancelled => write!(f, "Request cancelled"),
            NetworkError::Other { message } => write!(f, "Network error: {}", message),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Classify a transport error into a NetworkError.
///
/// `operation` names the request for timeout messages ("list sessions").
pub fn classify_http_error(err: HttpError, url: &str, operation: &str) -> NetworkError {
    match err {
        HttpError::ConnectionFailed(message) => NetworkError::ConnectionFailed {
            url: url.to_string(),
            message,
        },
        HttpError::Timeout(message) => NetworkError::Timeout {
            operation: operation.to_string(),
            message,
        },
        HttpError::ServerError { status, message } => NetworkError::HttpStatus { status, message },
        HttpError::Cancelled => NetworkError::Cancelled,
        HttpError::Io(message) => NetworkError::InvalidResponse { message },
        HttpError::InvalidUrl(message) => NetworkError::Other {
            message: format!("invalid URL '{}': {}", url, message),
        },
        HttpError::Other(message) => NetworkError::Other { message },
    }
}

/// Pull a readable message out of an error response body.
///
/// FastAPI-style servers answer `{"detail": "..."}`; anything else is
/// returned trimmed and truncated.
pub fn error_body_message(body: &str) -> String {
    const MAX_LEN: usize = 200;

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(detail) = json.get("detail").and_then(|d| d.as_str()) {
            return detail.to_string();
        }
    }
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_LEN) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
