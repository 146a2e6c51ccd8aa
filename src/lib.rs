//! kbchat - a streaming chat client for a personal knowledge base
//!
//! The core is the chat stream engine: [`stream::ChunkSource`] yields text
//! chunks, [`sse::SseDecoder`] turns them into [`sse::StreamEvent`]s, and
//! [`conversation::Conversation`] reconciles those into the ordered turn list.
//! [`session::StreamSessionController`] drives one exchange end to end
//! behind a [`session::StreamGate`].
//!
//! This library exposes modules for use in integration tests.

pub mod adapters;
pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod models;
pub mod session;
pub mod sse;
pub mod stream;
pub mod traits;
