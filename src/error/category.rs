//! Error category classification.
//!
//! Categories decide retry policy and how an error is worded for the user.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection refused, DNS, timeout, dropped stream.
    /// Generally transient and retryable.
    Network,

    /// The knowledge-base server failed (HTTP 5xx).
    /// Retryable after a delay.
    Server,

    /// Malformed responses or a request the server rejected (HTTP 4xx).
    /// Not retryable without a code or data change.
    Client,

    /// Invalid input, or an action that conflicts with current state.
    User,

    /// Unreadable config file or invalid settings.
    Configuration,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient
    /// and the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Client => "client",
            ErrorCategory::User => "user",
            ErrorCategory::Configuration => "configuration",
        }
    }

    /// Returns suggested recovery actions for this category.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCategory::Network => {
                "Check that the knowledge-base server is running and reachable"
            }
            ErrorCategory::Server => {
                "The server may be experiencing issues. Please try again later"
            }
            ErrorCategory::Client => "This may be a bug. Please report this issue if it persists",
            ErrorCategory::User => "Please check your input and try again",
            ErrorCategory::Configuration => "Check ~/.kbchat/config.json and KBCHAT_* variables",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
