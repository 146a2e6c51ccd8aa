//! Mock HTTP client for testing.
//!
//! Responses are scripted per URL. Streaming responses are scripted as the
//! exact list of chunks to deliver, which lets tests choose chunk
//! boundaries that cut frames, delimiters and UTF-8 sequences apart.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::traits::{ByteStream, FilePart, Headers, HttpClient, HttpError, Response};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body (POST requests; the file name for multipart uploads)
    pub body: Option<String>,
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return a complete response
    Success(Response),
    /// Fail before any response is produced
    Error(HttpError),
    /// Deliver these chunks, then end the stream
    Stream(Vec<Bytes>),
    /// Deliver these chunks, then fail with the error (dropped connection)
    StreamThenError(Vec<Bytes>, HttpError),
    /// Deliver these chunks, then never produce another item
    StreamThenStall(Vec<Bytes>),
    /// Fail the stream request itself
    StreamError(HttpError),
    /// Never answer the request at all
    Stall,
}

impl MockResponse {
    /// Convenience: a JSON body with the given status.
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        MockResponse::Success(Response::new(status, Bytes::from(body.to_string())))
    }

    /// Convenience: a stream built from string chunks.
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockResponse::Stream(
            chunks
                .into_iter()
                .map(|c| Bytes::from(c.into()))
                .collect(),
        )
    }
}

/// Mock HTTP client for testing.
///
/// Lookup order for a request: a response registered for `METHOD url`,
/// then one registered for the exact url, then the longest registered
/// url prefix, then the default response.
#[derive(Debug, Clone)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    default_response: Arc<Mutex<Option<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            default_response: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set a response for a URL, regardless of method.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(url.to_string(), response);
    }

    /// Set a response for a specific method and URL.
    pub fn set_method_response(&self, method: &str, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(format!("{} {}", method, url), response);
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        let mut default = self.default_response.lock().unwrap();
        *default = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded requests with the given method.
    pub fn requests_with_method(&self, method: &str) -> Vec<RecordedRequest> {
        self.get_requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn record_request(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        let mut requests = self.requests.lock().unwrap();
        requests.push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
    }

    fn get_response(&self, method: &str, url: &str) -> Option<MockResponse> {
        let responses = self.responses.lock().unwrap();

        if let Some(response) = responses.get(&format!("{} {}", method, url)) {
            return Some(response.clone());
        }
        if let Some(response) = responses.get(url) {
            return Some(response.clone());
        }

        let prefix_match = responses
            .iter()
            .filter(|(pattern, _)| !pattern.contains(' ') && url.starts_with(pattern.as_str()))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(_, response)| response.clone());
        if prefix_match.is_some() {
            return prefix_match;
        }

        let default = self.default_response.lock().unwrap();
        default.clone()
    }

    async fn plain_response(&self, method: &str, url: &str) -> Result<Response, HttpError> {
        match self.get_response(method, url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Stall) => futures::future::pending().await,
            Some(MockResponse::Error(err)) | Some(MockResponse::StreamError(err)) => Err(err),
            Some(_) => Err(HttpError::Other(
                "Stream response on non-stream request".to_string(),
            )),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn ok_chunks(chunks: Vec<Bytes>) -> impl futures::Stream<Item = Result<Bytes, HttpError>> {
    futures::stream::iter(chunks.into_iter().map(Ok))
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("GET", url, headers, None);
        self.plain_response("GET", url).await
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("POST", url, headers, Some(body.to_string()));
        self.plain_response("POST", url).await
    }

    async fn delete(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record_request("DELETE", url, headers, None);
        self.plain_response("DELETE", url).await
    }

    async fn post_multipart(
        &self,
        url: &str,
        file: FilePart,
        headers: &Headers,
    ) -> Result<Response, HttpError> {
        self.record_request("POST", url, headers, Some(file.filename));
        self.plain_response("POST", url).await
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        self.record_request("POST", url, headers, Some(body.to_string()));

        match self.get_response("POST", url) {
            Some(MockResponse::Stream(chunks)) => Ok(Box::pin(ok_chunks(chunks))),
            Some(MockResponse::StreamThenError(chunks, err)) => {
                let tail = futures::stream::once(async move { Err(err) });
                Ok(Box::pin(ok_chunks(chunks).chain(tail)))
            }
            Some(MockResponse::StreamThenStall(chunks)) => {
                Ok(Box::pin(ok_chunks(chunks).chain(futures::stream::pending())))
            }
            Some(MockResponse::StreamError(err)) | Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Stall) => futures::future::pending().await,
            Some(MockResponse::Success(_)) => Err(HttpError::Other(
                "Non-stream response on stream request".to_string(),
            )),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}
