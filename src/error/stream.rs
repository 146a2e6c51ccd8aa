//! Streaming-related error types.
//!
//! Errors that end a chat stream, or stop one from starting. Decode
//! failures of individual frames are not here: they are logged and the
//! frame dropped.

use std::fmt;

use crate::traits::HttpError;

/// Stream-specific error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError {
    /// The stream request failed before any body arrived.
    OpenFailed {
        status: Option<u16>,
        message: String,
    },

    /// The body failed part way through.
    ConnectionLost { message: String },

    /// Another stream is active on this conversation and the submit
    /// policy rejects concurrent sends.
    Busy,

    /// The stream was cancelled (new submission, session switch, shutdown).
    Cancelled,

    /// No session is selected to send into.
    SessionMissing,
}

impl StreamError {
    /// Classify an error from opening the stream request.
    pub fn from_open_error(err: HttpError) -> Self {
        match err {
            HttpError::Cancelled => StreamError::Cancelled,
            HttpError::ServerError { status, message } => StreamError::OpenFailed {
                status: Some(status),
                message,
            },
            other => StreamError::OpenFailed {
                status: None,
                message: other.to_string(),
            },
        }
    }

    /// Classify an error from reading the stream body.
    pub fn from_read_error(err: HttpError) -> Self {
        match err {
            HttpError::Cancelled => StreamError::Cancelled,
            other => StreamError::ConnectionLost {
                message: other.to_string(),
            },
        }
    }

    /// Check if this error is likely transient and can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::OpenFailed { status, .. } => match status {
                Some(code) => *code >= 500,
                None => true,
            },
            StreamError::ConnectionLost { .. } => true,
            StreamError::Busy => true,
            StreamError::Cancelled | StreamError::SessionMissing => false,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::OpenFailed { status: Some(status), .. } => {
                format!("The server refused the message (HTTP {}).", status)
            }
            StreamError::OpenFailed { status: None, .. } => {
                "Could not reach the server to send the message.".to_string()
            }
            StreamError::ConnectionLost { .. } => {
                "The connection dropped before the reply finished.".to_string()
            }
            StreamError::Busy => {
                "A reply is still streaming. Wait for it to finish or cancel it.".to_string()
            }
            StreamError::Cancelled => "The reply was cancelled.".to_string(),
            StreamError::SessionMissing => {
                "No conversation is selected. Create or select one first.".to_string()
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::OpenFailed { .. } => "E_STREAM_OPEN",
            StreamError::ConnectionLost { .. } => "E_STREAM_CONN",
            StreamError::Busy => "E_STREAM_BUSY",
            StreamError::Cancelled => "E_STREAM_CANCEL",
            StreamError::SessionMissing => "E_STREAM_SESSION",
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::OpenFailed { status: Some(status), message } => {
                write!(f, "Stream request failed with HTTP {}: {}", status, message)
            }
            StreamError::OpenFailed { status: None, message } => {
                write!(f, "Stream request failed: {}", message)
            }
            StreamError::ConnectionLost { message } => {
                write!(f, "Stream connection lost: {}", message)
            }
            StreamError::Busy => write!(f, "Another stream is active"),
            StreamError::Cancelled => write!(f, "Stream cancelled"),
            StreamError::SessionMissing => write!(f, "No session selected"),
        }
    }
}

impl std::error::Error for StreamError {}
