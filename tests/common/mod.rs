//! Common test utilities for integration tests.
//!
//! Stream tests script the chat stream body chunk by chunk through
//! `MockHttpClient`, then run a real `StreamSessionController` against it.
//!
//! # Example
//!
//! ```ignore
//! let harness = StreamHarness::new(MockResponse::chunks(["data: \"hi\"\n\n"]));
//! let outcome = harness.run().await;
//! assert_eq!(harness.assistant().content, "hi");
//! ```
#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use std::sync::Arc;

use kbchat::api::KnowledgeBaseClient;
use kbchat::conversation::{lock_conversation, Conversation, SharedConversation};
use kbchat::models::{ConversationTurn, StreamRequest};
use kbchat::session::{
    FailurePolicy, SessionNotice, StreamGate, StreamOutcome, StreamSessionController,
};
use tokio::sync::mpsc;

pub const BASE: &str = "http://kb.test/api";
pub const SESSION_ID: &str = "session-1";

pub fn stream_url() -> String {
    format!("{}/chat/stream", BASE)
}

/// One conversation wired to a scripted stream endpoint.
pub struct StreamHarness {
    pub mock: Arc<MockHttpClient>,
    pub api: KnowledgeBaseClient<MockHttpClient>,
    pub conversation: SharedConversation,
    pub gate: StreamGate,
    pub policy: FailurePolicy,
}

impl StreamHarness {
    pub fn new(response: MockResponse) -> Self {
        let mock = Arc::new(MockHttpClient::new());
        mock.set_response(&stream_url(), response);
        let api = KnowledgeBaseClient::new(Arc::clone(&mock), BASE);
        Self {
            mock,
            api,
            conversation: Conversation::new().into_shared(),
            gate: StreamGate::default(),
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_gate(mut self, gate: StreamGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn controller(&self, content: &str) -> StreamSessionController<MockHttpClient> {
        StreamSessionController::new(
            self.api.clone(),
            self.conversation.clone(),
            StreamRequest::new(SESSION_ID, content),
        )
        .with_failure_policy(self.policy)
    }

    /// Run one exchange to completion.
    pub async fn run(&self) -> StreamOutcome {
        let lease = self.gate.acquire().await.expect("gate admits");
        self.controller("question").run(lease).await
    }

    /// Run one exchange, collecting the notices it sent.
    pub async fn run_with_notices(&self) -> (StreamOutcome, Vec<SessionNotice>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let lease = self.gate.acquire().await.expect("gate admits");
        let outcome = self.controller("question").with_notices(tx).run(lease).await;
        let mut notices = Vec::new();
        while let Ok(notice) = rx.try_recv() {
            notices.push(notice);
        }
        (outcome, notices)
    }

    pub fn turns(&self) -> Vec<ConversationTurn> {
        lock_conversation(&self.conversation).snapshot()
    }

    /// The last assistant turn.
    pub fn assistant(&self) -> ConversationTurn {
        self.turns()
            .into_iter()
            .rev()
            .find(|t| t.role == kbchat::models::MessageRole::Assistant)
            .expect("an assistant turn")
    }
}

/// Every way to cut `input` into two chunks, including empty ends.
pub fn two_way_splits(input: &str) -> Vec<Vec<String>> {
    let cuts = char_boundaries(input);
    cuts.iter()
        .map(|&i| vec![input[..i].to_string(), input[i..].to_string()])
        .collect()
}

/// Every way to cut `input` into three chunks.
pub fn three_way_splits(input: &str) -> Vec<Vec<String>> {
    let cuts = char_boundaries(input);
    let mut out = Vec::new();
    for (n, &i) in cuts.iter().enumerate() {
        for &j in &cuts[n..] {
            out.push(vec![
                input[..i].to_string(),
                input[i..j].to_string(),
                input[j..].to_string(),
            ]);
        }
    }
    out
}

fn char_boundaries(input: &str) -> Vec<usize> {
    (0..=input.len())
        .filter(|&i| input.is_char_boundary(i))
        .collect()
}
