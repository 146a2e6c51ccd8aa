//! Unified error handling for the knowledge-base client.
//!
//! - **Error Categories**: High-level classification for handling decisions
//! - **Domain-specific Errors**: Network, Stream, Validation and Config errors
//! - **Unified Error Type**: `KbError` consolidates all error types
//! - **Error Context**: operation, session and URL attached to errors
//! - **Result Type Alias**: `KbResult<T>` for consistent return types
//!
//! # Example
//!
//! ```ignore
//! use kbchat::error::{ErrorContext, KbResult, ResultExt};
//!
//! async fn history(client: &KnowledgeBaseClient<C>, id: &str) -> KbResult<Vec<ConversationTurn>> {
//!     client
//!         .fetch_messages(id)
//!         .await
//!         .context(ErrorContext::new("fetch messages").with_session_id(id))
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Description | Retryable |
//! |----------|-------------|-----------|
//! | Network | Connection, timeout, dropped stream | Yes |
//! | Server | HTTP 5xx, unreadable bodies | Yes |
//! | Client | HTTP 4xx, undecodable responses | No |
//! | User | Invalid input, busy stream | No |
//! | Configuration | Config file or env issues | No |
//!
//! Per-frame decode failures inside a stream are not errors at this level;
//! see `sse::SseParseError`.

mod category;
mod context;
mod kb_error;
mod network;
mod result;
mod stream;
mod validation;

// Re-export all public types
pub use category::ErrorCategory;
pub use context::ErrorContext;
pub use kb_error::KbError;
pub use network::{classify_http_error, error_body_message, NetworkError};
pub use result::{KbResult, ResultExt};
pub use stream::StreamError;
pub use validation::{ConfigError, ValidationError};
