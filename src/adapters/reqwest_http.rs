//! Reqwest-based HTTP client adapter.
//!
//! Production implementation of [`HttpClient`]. Streaming responses are
//! handed back as the raw `bytes_stream()` of the response so the chunk
//! boundaries the server produces reach the decoder untouched.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::traits::{ByteStream, FilePart, Headers, HttpClient, HttpError, Response};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    /// Per-request ceiling for plain (non-streaming) calls
    request_timeout: Duration,
}

impl ReqwestHttpClient {
    /// Create a new ReqwestHttpClient with default settings.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Create a new ReqwestHttpClient with a custom reqwest::Client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build a client honouring the connect timeout from the config.
    ///
    /// Only the connect phase is bounded: a whole-request timeout would cut
    /// long chat streams off mid-answer. Plain requests get the request
    /// timeout applied per call instead.
    pub fn from_config(config: &ClientConfig) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(Self::convert_error)?;
        Ok(Self::with_client(client).with_request_timeout(config.request_timeout))
    }

    /// Get a reference to the underlying reqwest::Client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    /// Convert reqwest error to HttpError.
    fn convert_error(err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(err.to_string())
        } else if err.is_connect() {
            HttpError::ConnectionFailed(err.to_string())
        } else if err.is_builder() {
            HttpError::InvalidUrl(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }

    /// Convert reqwest headers to our Headers type.
    fn convert_headers(headers: &reqwest::header::HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    /// Apply headers to a request builder.
    fn apply_headers(
        builder: reqwest::RequestBuilder,
        headers: &Headers,
    ) -> reqwest::RequestBuilder {
        let mut builder = builder;
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        builder
    }

    async fn send(builder: reqwest::RequestBuilder) -> Result<Response, HttpError> {
        let response = builder.send().await.map_err(Self::convert_error)?;

        let status = response.status().as_u16();
        let response_headers = Self::convert_headers(response.headers());
        let body = response.bytes().await.map_err(Self::convert_error)?;

        Ok(Response::with_headers(status, response_headers, body))
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        let builder = self.client.get(url).timeout(self.request_timeout);
        Self::send(Self::apply_headers(builder, headers)).await
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        let builder = self
            .client
            .post(url)
            .timeout(self.request_timeout)
            .body(body.to_string());
        Self::send(Self::apply_headers(builder, headers)).await
    }

    async fn delete(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        let builder = self.client.delete(url).timeout(self.request_timeout);
        Self::send(Self::apply_headers(builder, headers)).await
    }

    async fn post_multipart(
        &self,
        url: &str,
        file: FilePart,
        headers: &Headers,
    ) -> Result<Response, HttpError> {
        let mut part = reqwest::multipart::Part::bytes(file.data.to_vec()).file_name(file.filename);
        if let Some(mime) = file.mime {
            part = part
                .mime_str(&mime)
                .map_err(|e| HttpError::Other(e.to_string()))?;
        }
        let form = reqwest::multipart::Form::new().part(file.field, part);

        // Uploads are parsed and embedded server-side; allow them longer.
        let builder = self
            .client
            .post(url)
            .timeout(self.request_timeout * 4)
            .multipart(form);
        Self::send(Self::apply_headers(builder, headers)).await
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        let builder = self.client.post(url).body(body.to_string());
        let builder = Self::apply_headers(builder, headers);

        let response = builder.send().await.map_err(Self::convert_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(HttpError::ServerError { status, message });
        }

        let stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout(e.to_string())
                } else {
                    HttpError::Io(e.to_string())
                }
            })
        });

        Ok(Box::pin(stream))
    }
}
