use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Body of `POST /chat/stream` and `POST /chat/messages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamRequest {
    pub session_id: String,
    pub content: String,
}

impl StreamRequest {
    pub fn new(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            content: content.into(),
        }
    }
}

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateSessionRequest {
    pub title: String,
}

impl CreateSessionRequest {
    /// Title the web client gives a fresh conversation ("new conversation").
    pub const DEFAULT_TITLE: &'static str = "新对话";
}

impl Default for CreateSessionRequest {
    fn default() -> Self {
        Self {
            title: Self::DEFAULT_TITLE.to_string(),
        }
    }
}

/// Body of `POST /diaries`; saving an existing date overwrites it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaveDiaryRequest {
    pub date: NaiveDate,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
}

/// Filters for the session list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionQuery {
    /// Case-insensitive title/summary search, applied server-side
    pub keyword: Option<String>,
    pub category_id: Option<i64>,
}

impl SessionQuery {
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Encoded query string, without the leading `?`.
    ///
    /// Empty keywords and category id 0 are treated as "no filter".
    pub fn to_query_string(&self) -> String {
        let mut params = Vec::new();
        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            params.push(format!("keyword={}", urlencoding::encode(keyword)));
        }
        if let Some(id) = self.category_id.filter(|id| *id != 0) {
            params.push(format!("category_id={}", id));
        }
        params.join("&")
    }
}
