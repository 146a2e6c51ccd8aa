use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::deserialize_id;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A knowledge-base passage the assistant drew on for a reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    /// Source document name
    pub filename: String,
    /// Relevance in [0, 1]
    pub score: f64,
    /// Short excerpt of the matched passage
    #[serde(default)]
    pub preview: String,
}

impl Citation {
    /// Relevance as a whole percentage, clamped to 0..=100.
    pub fn relevance_percent(&self) -> u8 {
        (self.score.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// Local lifecycle of a turn.
///
/// Turns fetched from the server are always `Confirmed`. The two turns
/// inserted before a stream opens start out `Pending` (user) and
/// `Streaming` (assistant) and become `Confirmed` once the stream
/// completes. An assistant turn kept after a failed stream is
/// `Interrupted`. Never sent over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnStatus {
    #[default]
    Confirmed,
    Pending,
    Streaming,
    Interrupted,
}

/// An entry in the ordered conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    /// Assigned at creation, never reassigned
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Citations backing an assistant reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Citation>>,
    #[serde(skip)]
    pub status: TurnStatus,
}

impl ConversationTurn {
    /// Optimistic user turn, shown before the server has seen it.
    pub fn pending_user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::User,
            content: content.into(),
            created_at: Utc::now(),
            sources: None,
            status: TurnStatus::Pending,
        }
    }

    /// Empty assistant turn that streamed tokens are appended to.
    pub fn streaming_assistant() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: MessageRole::Assistant,
            content: String::new(),
            created_at: Utc::now(),
            sources: None,
            status: TurnStatus::Streaming,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.status == TurnStatus::Streaming
    }

    /// True for turns that exist only locally so far.
    pub fn is_optimistic(&self) -> bool {
        self.status != TurnStatus::Confirmed
    }
}
