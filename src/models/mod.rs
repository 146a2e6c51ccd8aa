//! Wire and domain models for the knowledge-base API.

mod diary;
mod document;
mod message;
mod request;
mod session;

pub use diary::DiaryEntry;
pub use document::{DocumentInfo, ACCEPTED_EXTENSIONS, MAX_UPLOAD_BYTES};
pub use message::{Citation, ConversationTurn, MessageRole, TurnStatus};
pub use request::{CreateSessionRequest, SaveDiaryRequest, SessionQuery, StreamRequest};
pub use session::{Category, Session};

use serde::Deserializer;

/// Helper to deserialize id as either string or integer.
///
/// The backend hands out UUID strings for sessions and messages, but older
/// rows were keyed by integer.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer")
        }

        fn visit_str<E>(self, value: &str) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// Helper to deserialize a nullable string as an empty string.
pub(crate) fn deserialize_nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::Deserialize;
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
