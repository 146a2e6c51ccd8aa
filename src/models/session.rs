use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_id, deserialize_nullable_string};

/// A conversation session as listed in the sidebar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string")]
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub category_id: Option<i64>,
    /// Bumped by the server on every exchange; the list is ordered by it
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// A user-defined grouping for sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Display colour, e.g. `#6366f1`
    #[serde(default)]
    pub color_code: String,
}
