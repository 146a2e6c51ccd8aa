//! Unified error type for the knowledge-base client.

use std::fmt;

use super::category::ErrorCategory;
use super::context::ErrorContext;
use super::network::NetworkError;
use super::stream::StreamError;
use super::validation::{ConfigError, ValidationError};

/// Unified error type for the knowledge-base client.
///
/// Everything an `App` or `KnowledgeBaseClient` operation can fail with.
/// The streaming engine itself never produces one: `run` reports failures
/// in its outcome.
#[derive(Debug)]
pub enum KbError {
    /// REST request failed (connection, HTTP status, timeout).
    Network(NetworkError),

    /// Chat stream could not start or did not finish.
    Stream(StreamError),

    /// The server answered 2xx with a body we could not decode.
    Decode { what: String, message: String },

    /// Input rejected before any request.
    Validation(ValidationError),

    /// Configuration could not be loaded.
    Config(ConfigError),

    /// Local file access failed (document upload).
    Io(std::io::Error),

    /// Wrapped error with additional context.
    WithContext {
        error: Box<KbError>,
        context: ErrorContext,
    },
}

impl KbError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            KbError::Network(err) => match err {
                NetworkError::HttpStatus { status, .. } if *status >= 500 => ErrorCategory::Server,
                NetworkError::HttpStatus { .. } => ErrorCategory::Client,
                NetworkError::InvalidResponse { .. } => ErrorCategory::Server,
                _ => ErrorCategory::Network,
            },
            KbError::Stream(err) => match err {
                StreamError::OpenFailed {
                    status: Some(status),
                    ..
                } if *status < 500 => ErrorCategory::Client,
                StreamError::OpenFailed { .. } | StreamError::ConnectionLost { .. } => {
                    ErrorCategory::Network
                }
                StreamError::Busy | StreamError::Cancelled | StreamError::SessionMissing => {
                    ErrorCategory::User
                }
            },
            KbError::Decode { .. } => ErrorCategory::Client,
            KbError::Validation(_) | KbError::Io(_) => ErrorCategory::User,
            KbError::Config(_) => ErrorCategory::Configuration,
            KbError::WithContext { error, .. } => error.category(),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            KbError::Network(err) => err.is_retryable(),
            KbError::Stream(err) => err.is_retryable(),
            KbError::Decode { .. }
            | KbError::Validation(_)
            | KbError::Config(_)
            | KbError::Io(_) => {
                false
            }
            KbError::WithContext { error, .. } => error.is_retryable(),
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            KbError::Network(err) => err.user_message(),
            KbError::Stream(err) => err.user_message(),
            KbError::Decode { what, .. } => {
                format!("The server sent an unexpected {} response.", what)
            }
            KbError::Validation(err) => err.to_string(),
            KbError::Config(err) => err.to_string(),
            KbError::Io(err) => format!("File error: {}", err),
            KbError::WithContext { error, .. } => error.user_message(),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            KbError::Network(err) => err.error_code(),
            KbError::Stream(err) => err.error_code(),
            KbError::Decode { .. } => "E_DECODE",
            KbError::Validation(_) => "E_VALIDATION",
            KbError::Config(_) => "E_CONFIG",
            KbError::Io(_) => "E_IO",
            KbError::WithContext { error, .. } => error.error_code(),
        }
    }

    /// Attach context to this error.
    pub fn with_context(self, ctx: ErrorContext) -> Self {
        KbError::WithContext {
            error: Box::new(self),
            context: ctx,
        }
    }

    /// Get the context if this error has one attached.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            KbError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Get the inner error without context.
    pub fn inner(&self) -> &KbError {
        match self {
            KbError::WithContext { error, .. } => error.inner(),
            _ => self,
        }
    }

    /// Get the recovery hint for this error.
    pub fn recovery_hint(&self) -> &'static str {
        self.category().recovery_hint()
    }

    /// HTTP status of a failed request, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self.inner() {
            KbError::Network(NetworkError::HttpStatus { status, .. }) => Some(*status),
            KbError::Stream(StreamError::OpenFailed { status, .. }) => *status,
            _ => None,
        }
    }
}

impl fmt::Display for KbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KbError::Network(err) => write!(f, "{}", err),
            KbError::Stream(err) => write!(f, "{}", err),
            KbError::Decode { what, message } => {
                write!(f, "Failed to decode {} response: {}", what, message)
            }
            KbError::Validation(err) => write!(f, "{}", err),
            KbError::Config(err) => write!(f, "{}", err),
            KbError::Io(err) => write!(f, "I/O error: {}", err),
            KbError::WithContext { error, context } => {
                write!(f, "{} ({})", error, context)
            }
        }
    }
}

impl std::error::Error for KbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KbError::Network(err) => Some(err),
            KbError::Stream(err) => Some(err),
            KbError::Decode { .. } => None,
            KbError::Validation(err) => Some(err),
            KbError::Config(err) => Some(err),
            KbError::Io(err) => Some(err),
            KbError::WithContext { error, .. } => error.source(),
        }
    }
}

// ============================================================================
// From implementations for automatic error conversion
// ============================================================================

impl From<NetworkError> for KbError {
    fn from(err: NetworkError) -> Self {
        KbError::Network(err)
    }
}

impl From<StreamError> for KbError {
    fn from(err: StreamError) -> Self {
        KbError::Stream(err)
    }
}

impl From<ValidationError> for KbError {
    fn from(err: ValidationError) -> Self {
        KbError::Validation(err)
    }
}

impl From<ConfigError> for KbError {
    fn from(err: ConfigError) -> Self {
        KbError::Config(err)
    }
}

impl From<std::io::Error> for KbError {
    fn from(err: std::io::Error) -> Self {
        KbError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_category() {
        let err = KbError::Network(NetworkError::ConnectionFailed {
            url: "http://localhost:8000/api".to_string(),
            message: "refused".to_string(),
        });
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_http_status_category_split() {
        let server = KbError::from(NetworkError::HttpStatus {
            status: 500,
            message: String::new(),
        });
        assert_eq!(server.category(), ErrorCategory::Server);

        let client = KbError::from(NetworkError::HttpStatus {
            status: 404,
            message: String::new(),
        });
        assert_eq!(client.category(), ErrorCategory::Client);
        assert_eq!(client.status(), Some(404));
    }

    #[test]
    fn test_stream_error_category() {
        assert_eq!(KbError::from(StreamError::Busy).category(), ErrorCategory::User);
        assert_eq!(
            KbError::from(StreamError::ConnectionLost {
                message: "reset".into()
            })
            .category(),
            ErrorCategory::Network
        );
    }

    #[test]
    fn test_validation_error_is_user_error() {
        let err: KbError = ValidationError::Empty { field: "content" }.into();
        assert_eq!(err.category(), ErrorCategory::User);
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), "content must not be empty");
    }

    #[test]
    fn test_with_context_delegates() {
        let err = KbError::from(NetworkError::HttpStatus {
            status: 503,
            message: "down".into(),
        })
        .with_context(ErrorContext::new("list sessions"));

        assert_eq!(err.category(), ErrorCategory::Server);
        assert_eq!(err.error_code(), "E_NET_HTTP");
        assert_eq!(err.context().map(|c| c.operation.as_str()), Some("list sessions"));
        assert!(matches!(err.inner(), KbError::Network(_)));
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("[list sessions]"));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;
        let err = KbError::from(StreamError::Cancelled);
        assert!(err.source().is_some());
        let decode = KbError::Decode {
            what: "session".into(),
            message: "missing field".into(),
        };
        assert!(decode.source().is_none());
    }
}
