//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP client operations (GET, POST, DELETE, multipart, streaming)

pub mod http;

pub use http::{ByteStream, FilePart, Headers, HttpClient, HttpError, Response};
