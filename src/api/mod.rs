//! Knowledge-base API client.
//!
//! Thin typed wrapper over the REST endpoints. All requests go through the
//! [`HttpClient`] trait so tests can script responses with
//! `MockHttpClient` or run against a wiremock server.

use std::sync::Arc;

use bytes::Bytes;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{
    classify_http_error, error_body_message, ErrorContext, KbError, KbResult, NetworkError,
    ValidationError,
};
use crate::models::{
    Category, ConversationTurn, CreateSessionRequest, DiaryEntry, DocumentInfo, SaveDiaryRequest,
    Session, SessionQuery, StreamRequest,
};
use crate::stream::ChunkSource;
use crate::traits::{FilePart, Headers, HttpClient, HttpError, Response};

/// Base URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Client for the knowledge-base server; cheap to clone.
pub struct KnowledgeBaseClient<C: HttpClient> {
    http: Arc<C>,
    base_url: String,
}

impl<C: HttpClient> Clone for KnowledgeBaseClient<C> {
    fn clone(&self) -> Self {
        Self {
            http: Arc::clone(&self.http),
            base_url: self.base_url.clone(),
        }
    }
}

impl<C: HttpClient> std::fmt::Debug for KnowledgeBaseClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBaseClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn json_headers() -> Headers {
    let mut headers = Headers::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("Accept".to_string(), "application/json".to_string());
    headers
}

fn stream_headers() -> Headers {
    let mut headers = json_headers();
    headers.insert("Accept".to_string(), "text/event-stream".to_string());
    headers
}

impl<C: HttpClient> KnowledgeBaseClient<C> {
    /// Create a client; a trailing `/` on `base_url` is ignored.
    pub fn new(http: Arc<C>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// `GET /sessions`, optionally filtered by keyword and category.
    pub async fn list_sessions(&self, query: &SessionQuery) -> KbResult<Vec<Session>> {
        let params = query.to_query_string();
        let path = if params.is_empty() {
            "/sessions".to_string()
        } else {
            format!("/sessions?{}", params)
        };
        self.get_json(&path, "list sessions").await
    }

    /// `POST /sessions`; `None` uses the default title.
    pub async fn create_session(&self, title: Option<&str>) -> KbResult<Session> {
        let body = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => CreateSessionRequest {
                title: title.to_string(),
            },
            None => CreateSessionRequest::default(),
        };
        self.post_json("/sessions", &body, "create session").await
    }

    /// `DELETE /sessions/{id}`
    pub async fn delete_session(&self, session_id: &str) -> KbResult<()> {
        let path = format!("/sessions/{}", urlencoding::encode(session_id));
        self.delete(&path, "delete session").await
    }

    // ------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------

    /// `GET /chat/messages?session_id=`: the authoritative history.
    pub async fn fetch_messages(&self, session_id: &str) -> KbResult<Vec<ConversationTurn>> {
        let path = format!(
            "/chat/messages?session_id={}",
            urlencoding::encode(session_id)
        );
        self.get_json(&path, "fetch messages")
            .await
            .map_err(|e| add_session(e, session_id))
    }

    /// `POST /chat/messages`: non-streaming send, returns the full reply.
    pub async fn send_message(&self, request: &StreamRequest) -> KbResult<ConversationTurn> {
        self.post_json("/chat/messages", request, "send message")
            .await
            .map_err(|e| add_session(e, &request.session_id))
    }

    /// `POST /chat/stream`: open the chat stream.
    ///
    /// Transport errors are returned raw; the stream controller owns their
    /// classification.
    pub async fn open_chat_stream(
        &self,
        request: &StreamRequest,
    ) -> Result<ChunkSource, HttpError> {
        let url = self.url("/chat/stream");
        let body = serde_json::to_string(request).map_err(|e| HttpError::Other(e.to_string()))?;
        debug!(url = %url, session_id = %request.session_id, "POST chat stream");
        let stream = self.http.post_stream(&url, &body, &stream_headers()).await?;
        Ok(ChunkSource::new(stream))
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    /// `GET /categories`
    pub async fn list_categories(&self) -> KbResult<Vec<Category>> {
        self.get_json("/categories", "list categories").await
    }

    // ------------------------------------------------------------------
    // Diary
    // ------------------------------------------------------------------

    /// `GET /diaries`
    pub async fn list_diaries(&self) -> KbResult<Vec<DiaryEntry>> {
        self.get_json("/diaries", "list diaries").await
    }

    /// `POST /diaries`: create or overwrite the entry for a date.
    pub async fn save_diary(&self, request: &SaveDiaryRequest) -> KbResult<DiaryEntry> {
        if request.content.trim().is_empty() {
            return Err(ValidationError::Empty { field: "content" }.into());
        }
        self.post_json("/diaries", request, "save diary").await
    }

    /// `DELETE /diaries/{date}`
    pub async fn delete_diary(&self, date: NaiveDate) -> KbResult<()> {
        let path = format!("/diaries/{}", date.format("%Y-%m-%d"));
        self.delete(&path, "delete diary").await
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// `GET /documents`
    pub async fn list_documents(&self) -> KbResult<Vec<DocumentInfo>> {
        self.get_json("/documents", "list documents").await
    }

    /// `POST /documents/upload` as multipart field `file`.
    ///
    /// Extension and size are checked before anything is sent.
    pub async fn upload_document(&self, filename: &str, data: Bytes) -> KbResult<()> {
        DocumentInfo::validate_upload(filename, data.len() as u64)?;

        let url = self.url("/documents/upload");
        let part = FilePart {
            field: "file".to_string(),
            filename: filename.to_string(),
            mime: DocumentInfo::mime_for(filename).map(str::to_string),
            data,
        };
        debug!(url = %url, filename, "POST multipart upload");
        let response = self
            .http
            .post_multipart(&url, part, &Headers::new())
            .await
            .map_err(|e| transport_error(e, &url, "upload document"))?;
        check_status(response, &url, "upload document")?;
        Ok(())
    }

    /// `DELETE /documents/{filename}`
    pub async fn delete_document(&self, filename: &str) -> KbResult<()> {
        let path = format!("/documents/{}", urlencoding::encode(filename));
        self.delete(&path, "delete document").await
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    async fn get_json<T: DeserializeOwned>(&self, path: &str, operation: &str) -> KbResult<T> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let response = self
            .http
            .get(&url, &json_headers())
            .await
            .map_err(|e| transport_error(e, &url, operation))?;
        let response = check_status(response, &url, operation)?;
        decode(&response, operation, &url)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        operation: &str,
    ) -> KbResult<T> {
        let url = self.url(path);
        let body = serde_json::to_string(body).map_err(|e| KbError::Decode {
            what: operation.to_string(),
            message: e.to_string(),
        })?;
        debug!(url = %url, "POST");
        let response = self
            .http
            .post(&url, &body, &json_headers())
            .await
            .map_err(|e| transport_error(e, &url, operation))?;
        let response = check_status(response, &url, operation)?;
        decode(&response, operation, &url)
    }

    async fn delete(&self, path: &str, operation: &str) -> KbResult<()> {
        let url = self.url(path);
        debug!(url = %url, "DELETE");
        let response = self
            .http
            .delete(&url, &json_headers())
            .await
            .map_err(|e| transport_error(e, &url, operation))?;
        check_status(response, &url, operation)?;
        Ok(())
    }
}

fn context(operation: &str, url: &str) -> ErrorContext {
    ErrorContext::new(operation).with_url(url)
}

fn transport_error(err: HttpError, url: &str, operation: &str) -> KbError {
    KbError::from(classify_http_error(err, url, operation)).with_context(context(operation, url))
}

fn check_status(response: Response, url: &str, operation: &str) -> KbResult<Response> {
    if response.is_success() {
        return Ok(response);
    }
    let body = String::from_utf8_lossy(&response.body);
    let err = NetworkError::HttpStatus {
        status: response.status,
        message: error_body_message(&body),
    };
    Err(KbError::from(err).with_context(context(operation, url)))
}

fn decode<T: DeserializeOwned>(response: &Response, operation: &str, url: &str) -> KbResult<T> {
    response.json().map_err(|e| {
        KbError::Decode {
            what: operation.to_string(),
            message: e.to_string(),
        }
        .with_context(context(operation, url))
    })
}

/// Record the session an error belongs to.
fn add_session(err: KbError, session_id: &str) -> KbError {
    match err {
        KbError::WithContext { error, context } => KbError::WithContext {
            error,
            context: context.with_session_id(session_id),
        },
        other => other.with_context(ErrorContext::new("session").with_session_id(session_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockHttpClient, MockResponse};
    use serde_json::json;

    const BASE: &str = "http://kb.test/api";

    fn client() -> (Arc<MockHttpClient>, KnowledgeBaseClient<MockHttpClient>) {
        let mock = Arc::new(MockHttpClient::new());
        let client = KnowledgeBaseClient::new(Arc::clone(&mock), format!("{}/", BASE));
        (mock, client)
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let (_, client) = client();
        assert_eq!(client.base_url(), BASE);
    }

    #[tokio::test]
    async fn test_list_sessions_with_filters() {
        let (mock, client) = client();
        mock.set_default_response(MockResponse::json(200, json!([])));

        let query = SessionQuery::default().with_keyword("rust").with_category(2);
        let sessions = client.list_sessions(&query).await.unwrap();
        assert!(sessions.is_empty());

        let requests = mock.get_requests();
        assert_eq!(requests[0].url, format!("{}/sessions?keyword=rust&category_id=2", BASE));
    }

    #[tokio::test]
    async fn test_create_session_defaults_title() {
        let (mock, client) = client();
        mock.set_response(
            &format!("{}/sessions", BASE),
            MockResponse::json(
                200,
                json!({
                    "id": "s1",
                    "title": "新对话",
                    "is_pinned": false,
                    "updated_at": "2025-01-01T00:00:00Z"
                }),
            ),
        );

        let session = client.create_session(Some("   ")).await.unwrap();
        assert_eq!(session.id, "s1");
        let body = mock.get_requests()[0].body.clone().unwrap();
        assert_eq!(body, r#"{"title":"新对话"}"#);
    }

    #[tokio::test]
    async fn test_http_status_maps_to_network_error() {
        let (mock, client) = client();
        mock.set_default_response(MockResponse::json(404, json!({"detail": "Session not found"})));

        let err = client.delete_session("gone").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("Session not found"));
        assert_eq!(err.context().unwrap().operation, "delete session");
    }

    #[tokio::test]
    async fn test_decode_failure() {
        let (mock, client) = client();
        mock.set_default_response(MockResponse::json(200, json!({"not": "a list"})));
        let err = client.list_categories().await.unwrap_err();
        assert!(matches!(err.inner(), KbError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_fetch_messages_records_session() {
        let (mock, client) = client();
        mock.set_default_response(MockResponse::Error(HttpError::ConnectionFailed(
            "refused".into(),
        )));
        let err = client.fetch_messages("s 1").await.unwrap_err();
        assert_eq!(err.context().unwrap().session_id.as_deref(), Some("s 1"));
        assert_eq!(
            mock.get_requests()[0].url,
            format!("{}/chat/messages?session_id=s%201", BASE)
        );
    }

    #[tokio::test]
    async fn test_upload_validated_before_request() {
        let (mock, client) = client();
        let err = client
            .upload_document("photo.png", Bytes::from_static(b"png"))
            .await
            .unwrap_err();
        assert!(matches!(err, KbError::Validation(_)));
        assert!(mock.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_save_diary_rejects_blank_content() {
        let (mock, client) = client();
        let request = SaveDiaryRequest {
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            content: "  \n".into(),
            mood: None,
        };
        assert!(client.save_diary(&request).await.is_err());
        assert!(mock.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_delete_document_encodes_filename() {
        let (mock, client) = client();
        mock.set_default_response(MockResponse::json(200, json!({"ok": true})));
        client.delete_document("my notes.md").await.unwrap();
        assert_eq!(
            mock.requests_with_method("DELETE")[0].url,
            format!("{}/documents/my%20notes.md", BASE)
        );
    }

    #[tokio::test]
    async fn test_open_chat_stream_posts_request() {
        let (mock, client) = client();
        mock.set_response(
            &format!("{}/chat/stream", BASE),
            MockResponse::chunks(["data: \"hi\"\n\n"]),
        );
        let mut source = client
            .open_chat_stream(&StreamRequest::new("s1", "hello"))
            .await
            .unwrap();
        assert_eq!(source.next_chunk().await.unwrap().as_deref(), Some("data: \"hi\"\n\n"));

        let request = &mock.get_requests()[0];
        assert_eq!(request.method, "POST");
        assert!(request
            .headers
            .iter()
            .any(|(k, v)| k == "Accept" && v == "text/event-stream"));
    }
}
