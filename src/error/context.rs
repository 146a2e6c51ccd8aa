//! Error context for enriched error information.

use chrono::{DateTime, Utc};

/// Where and when an error happened.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext {
    /// Human-readable description of the operation that failed.
    pub operation: String,

    /// Session the operation ran against, if any.
    pub session_id: Option<String>,

    /// Request URL, if the failure came from the API.
    pub url: Option<String>,

    /// Timestamp when the error occurred.
    pub timestamp: DateTime<Utc>,
}

impl ErrorContext {
    /// Create a new ErrorContext for an operation.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            session_id: None,
            url: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Get a formatted context string suitable for logging.
    pub fn to_log_string(&self) -> String {
        let mut parts = vec![format!("operation={}", self.operation)];

        if let Some(ref session_id) = self.session_id {
            parts.push(format!("session_id={}", session_id));
        }

        if let Some(ref url) = self.url {
            parts.push(format!("url={}", url));
        }

        parts.push(format!("timestamp={}", self.timestamp.to_rfc3339()));

        parts.join(" ")
    }
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.operation)?;

        if let Some(ref session_id) = self.session_id {
            write!(f, " session={}", session_id)?;
        }

        Ok(())
    }
}
