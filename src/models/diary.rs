use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::deserialize_id;

/// One diary entry; the server keeps at most one per calendar date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiaryEntry {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub date: NaiveDate,
    pub content: String,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Whether the entry has been embedded into the knowledge base
    #[serde(default)]
    pub is_vectorized: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diary_entry_deserializes() {
        let json = r#"{
            "id": "d1",
            "date": "2025-02-14",
            "content": "quiet day",
            "mood": "平静",
            "tags": null,
            "is_vectorized": true,
            "created_at": "2025-02-14T20:00:00Z",
            "updated_at": "2025-02-14T21:00:00Z"
        }"#;
        let entry: DiaryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2025, 2, 14).unwrap());
        assert_eq!(entry.mood.as_deref(), Some("平静"));
        assert!(entry.tags.is_none());
        assert!(entry.is_vectorized);
    }
}
