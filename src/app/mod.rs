//! Headless application state.
//!
//! `App` holds everything a front end shows: the session list, the active
//! conversation, categories, diary entries and documents. Its methods are
//! the user-facing actions. Front ends render from the public fields and
//! from `Conversation::snapshot()`.
//!
//! The behaviour is split by concern:
//! - [`sessions`] - session list, categories, selection
//! - [`chat`] - history fetch, streaming and plain sends
//! - [`library`] - diary entries and knowledge-base documents

mod chat;
mod library;
mod sessions;

pub use library::parse_diary_date;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tokio::sync::mpsc;
use tracing::debug;

use crate::adapters::ReqwestHttpClient;
use crate::api::KnowledgeBaseClient;
use crate::config::ClientConfig;
use crate::conversation::{Conversation, SharedConversation};
use crate::error::{KbResult, NetworkError};
use crate::models::{Category, DiaryEntry, DocumentInfo, Session};
use crate::session::{FailurePolicy, SessionNotice, StreamGate};
use crate::traits::HttpClient;

/// Application state for one user of the knowledge base.
pub struct App<C: HttpClient> {
    api: KnowledgeBaseClient<C>,
    conversation: SharedConversation,
    gate: StreamGate,
    failure_policy: FailurePolicy,
    notice_tx: mpsc::UnboundedSender<SessionNotice>,
    notice_rx: mpsc::UnboundedReceiver<SessionNotice>,

    /// Sessions as last listed, most recently updated first
    pub sessions: Vec<Session>,
    pub categories: Vec<Category>,
    /// Category filter applied to the session list
    pub active_category: Option<i64>,
    /// Keyword filter applied to the session list
    pub session_keyword: Option<String>,
    pub current_session_id: Option<String>,
    pub diaries: Vec<DiaryEntry>,
    /// Date the diary view is on; defaults to today
    pub current_diary_date: NaiveDate,
    pub documents: Vec<DocumentInfo>,
}

impl App<ReqwestHttpClient> {
    /// Build an app talking to the configured server over reqwest.
    pub fn from_config(config: &ClientConfig) -> KbResult<Self> {
        let http = ReqwestHttpClient::from_config(config).map_err(|e| NetworkError::Other {
            message: e.to_string(),
        })?;
        let api = KnowledgeBaseClient::new(Arc::new(http), config.base_url.clone());
        Ok(Self::new(api, config))
    }
}

impl<C: HttpClient + 'static> App<C> {
    pub fn new(api: KnowledgeBaseClient<C>, config: &ClientConfig) -> Self {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        Self {
            api,
            conversation: Conversation::new().into_shared(),
            gate: StreamGate::new(config.submit_policy),
            failure_policy: config.failure_policy,
            notice_tx,
            notice_rx,
            sessions: Vec::new(),
            categories: Vec::new(),
            active_category: None,
            session_keyword: None,
            current_session_id: None,
            diaries: Vec::new(),
            current_diary_date: Local::now().date_naive(),
            documents: Vec::new(),
        }
    }

    pub fn api(&self) -> &KnowledgeBaseClient<C> {
        &self.api
    }

    /// The active conversation, shared with running streams.
    pub fn conversation(&self) -> &SharedConversation {
        &self.conversation
    }

    pub fn gate(&self) -> &StreamGate {
        &self.gate
    }

    pub fn current_session(&self) -> Option<&Session> {
        let id = self.current_session_id.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Wait for the next notice from a running stream.
    pub async fn next_notice(&mut self) -> Option<SessionNotice> {
        self.notice_rx.recv().await
    }

    /// Drain queued notices and act on them.
    ///
    /// A stale-metadata notice for the current session re-lists sessions
    /// once, however many arrived. Returns the drained notices.
    pub async fn process_notices(&mut self) -> KbResult<Vec<SessionNotice>> {
        let mut drained = Vec::new();
        while let Ok(notice) = self.notice_rx.try_recv() {
            drained.push(notice);
        }

        let current = self.current_session_id.as_deref();
        let refresh = drained.iter().any(|n| match n {
            SessionNotice::MetadataStale { session_id } => Some(session_id.as_str()) == current,
            SessionNotice::Phase { .. } => false,
        });
        if refresh {
            debug!("Session metadata stale, re-listing sessions");
            self.fetch_sessions().await?;
        }
        Ok(drained)
    }
}
