//! Conversation history and message submission.

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::App;
use crate::conversation::lock_conversation;
use crate::error::{KbError, KbResult, StreamError, ValidationError};
use crate::models::{StreamRequest, TurnStatus};
use crate::session::{StreamOutcome, StreamSessionController, SubmitPolicy};
use crate::sse::StreamEvent;
use crate::traits::HttpClient;

impl<C: HttpClient + 'static> App<C> {
    /// Replace the conversation with the server's history for the current
    /// session. Returns the number of turns loaded.
    pub async fn fetch_messages(&mut self) -> KbResult<usize> {
        let session_id = self.require_session()?;
        let turns = self.api.fetch_messages(&session_id).await?;

        // The user may have switched sessions while the fetch was in flight
        if self.current_session_id.as_deref() != Some(session_id.as_str()) {
            debug!(session_id = %session_id, "Discarding history for a session no longer current");
            return Ok(0);
        }
        let len = turns.len();
        lock_conversation(&self.conversation).replace_all(turns);
        Ok(len)
    }

    /// Submit a message over the chat stream.
    ///
    /// The exchange runs on its own task; the handle resolves to how it
    /// ended. Progress is visible through the conversation's change feed
    /// and through [`App::next_notice`].
    ///
    /// Under `SubmitPolicy::Reject` a busy gate fails here with
    /// `StreamError::Busy`. Under the other policies admission happens on
    /// the task, and a submission cancelled while queued resolves to
    /// `StreamOutcome::Cancelled`.
    pub async fn send_message_stream(
        &mut self,
        content: &str,
    ) -> KbResult<JoinHandle<StreamOutcome>> {
        let request = self.prepare_request(content)?;
        let controller = StreamSessionController::new(
            self.api.clone(),
            self.conversation.clone(),
            request,
        )
        .with_failure_policy(self.failure_policy)
        .with_notices(self.notice_tx.clone());

        if self.gate.policy() == SubmitPolicy::Reject {
            let lease = self.gate.acquire().await?;
            return Ok(tokio::spawn(controller.run(lease)));
        }

        let gate = self.gate.clone();
        Ok(tokio::spawn(async move {
            match gate.acquire().await {
                Ok(lease) => controller.run(lease).await,
                Err(e) => {
                    debug!(error = %e, "Queued submission not admitted");
                    StreamOutcome::not_admitted(e)
                }
            }
        }))
    }

    /// Submit a message without streaming and wait for the whole reply.
    ///
    /// Takes the same gate lease as a stream, so it queues behind, replaces
    /// or is refused by a running exchange according to the submit policy.
    /// The user turn is shown optimistically and removed again if the
    /// request fails or is cancelled.
    pub async fn send_message(&mut self, content: &str) -> KbResult<()> {
        let request = self.prepare_request(content)?;
        let lease = self.gate.acquire().await?;
        let (user_id, assistant_id) =
            lock_conversation(&self.conversation).begin_exchange(request.content.as_str());

        let sent = tokio::select! {
            biased;
            _ = lease.token().cancelled() => Err(KbError::from(StreamError::Cancelled)),
            result = self.api.send_message(&request) => result,
        };

        match sent {
            Ok(reply) => {
                {
                    let mut conversation = lock_conversation(&self.conversation);
                    conversation.apply(&assistant_id, StreamEvent::Token(reply.content));
                    if let Some(sources) = reply.sources {
                        conversation.apply(&assistant_id, StreamEvent::SourcesAttached(sources));
                    }
                    conversation.confirm_exchange(&user_id, &assistant_id);
                }
                drop(lease);
                info!(session_id = %request.session_id, "Message answered");
                // The reply bumps updated_at, which reorders the list
                if let Err(e) = self.fetch_sessions().await {
                    warn!(code = e.error_code(), "Session refresh after send failed: {}", e);
                }
                Ok(())
            }
            Err(e) => {
                warn!(session_id = %request.session_id, "Send failed: {}", e);
                lock_conversation(&self.conversation).rollback_exchange(&user_id, &assistant_id);
                Err(e)
            }
        }
    }

    /// Cancel the running stream, if any. Returns whether one was running.
    pub fn cancel_stream(&self) -> bool {
        self.gate.cancel_active()
    }

    /// Whether the assistant is still answering.
    pub fn is_streaming(&self) -> bool {
        lock_conversation(&self.conversation)
            .turns()
            .iter()
            .any(|t| t.status == TurnStatus::Streaming)
    }

    fn require_session(&self) -> Result<String, KbError> {
        self.current_session_id
            .clone()
            .ok_or_else(|| StreamError::SessionMissing.into())
    }

    fn prepare_request(&self, content: &str) -> KbResult<StreamRequest> {
        let session_id = self.require_session()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::Empty { field: "message" }.into());
        }
        Ok(StreamRequest::new(session_id, content))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{app, app_with, BASE};
    use crate::adapters::MockResponse;
    use crate::config::ClientConfig;
    use crate::conversation::lock_conversation;
    use crate::error::{KbError, StreamError};
    use crate::models::{MessageRole, TurnStatus};
    use crate::session::{SessionNotice, StreamPhase, SubmitPolicy};
    use crate::traits::HttpError;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_without_session() {
        let (mock, mut app) = app();
        let err = app.send_message_stream("hello").await.unwrap_err();
        assert!(matches!(err, KbError::Stream(StreamError::SessionMissing)));
        assert!(mock.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let (_, mut app) = app();
        app.current_session_id = Some("s1".into());
        assert!(matches!(
            app.send_message(" \n ").await,
            Err(KbError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_stream_completes_and_notifies() {
        let (mock, mut app) = app();
        app.current_session_id = Some("s1".into());
        mock.set_response(
            &format!("{}/chat/stream", BASE),
            MockResponse::chunks(["data: \"Hel", "lo\"\n\ndata: [DONE]\n\n"]),
        );

        let outcome = app.send_message_stream("hi").await.unwrap().await.unwrap();
        assert!(outcome.is_completed());

        let turns = lock_conversation(app.conversation()).snapshot();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, "Hello");
        assert!(turns.iter().all(|t| t.status == TurnStatus::Confirmed));
        assert!(!app.is_streaming());

        let mut phases = Vec::new();
        let mut stale = false;
        while let Ok(notice) = app.notice_rx.try_recv() {
            match notice {
                SessionNotice::Phase { phase, .. } => phases.push(phase),
                SessionNotice::MetadataStale { .. } => stale = true,
            }
        }
        assert_eq!(
            phases,
            vec![StreamPhase::Requesting, StreamPhase::Streaming, StreamPhase::Completed]
        );
        assert!(stale);
    }

    #[tokio::test]
    async fn test_reject_policy_fails_fast() {
        let config = ClientConfig::default().with_submit_policy(SubmitPolicy::Reject);
        let (mock, mut app) = app_with(&config);
        app.current_session_id = Some("s1".into());
        mock.set_response(
            &format!("{}/chat/stream", BASE),
            MockResponse::StreamThenStall(vec![]),
        );

        let first = app.send_message_stream("one").await.unwrap();
        // Wait until the first stream holds the gate and is reading
        while mock.get_requests().is_empty() {
            tokio::task::yield_now().await;
        }
        let err = app.send_message_stream("two").await.unwrap_err();
        assert!(matches!(err, KbError::Stream(StreamError::Busy)));

        assert!(app.cancel_stream());
        let outcome = first.await.unwrap();
        assert_eq!(outcome.error(), Some(StreamError::Cancelled));
        assert!(lock_conversation(app.conversation()).is_empty());
    }

    #[tokio::test]
    async fn test_plain_send_appends_reply_and_relists() {
        let (mock, mut app) = app();
        app.current_session_id = Some("s1".into());
        mock.set_method_response(
            "POST",
            &format!("{}/chat/messages", BASE),
            MockResponse::json(
                200,
                json!({
                    "id": "m9",
                    "role": "assistant",
                    "content": "See chapter 3.",
                    "sources": [{"filename": "book.epub", "score": 0.7, "preview": "ch3"}]
                }),
            ),
        );
        mock.set_response(&format!("{}/sessions", BASE), MockResponse::json(200, json!([])));

        app.send_message("where?").await.unwrap();
        let turns = lock_conversation(app.conversation()).snapshot();
        assert_eq!(turns[0].role, MessageRole::User);
        assert_eq!(turns[1].content, "See chapter 3.");
        assert_eq!(turns[1].sources.as_ref().map(Vec::len), Some(1));
        assert_eq!(mock.requests_with_method("GET").len(), 1);
    }

    #[tokio::test]
    async fn test_plain_send_refused_while_streaming() {
        let config = ClientConfig::default().with_submit_policy(SubmitPolicy::Reject);
        let (mock, mut app) = app_with(&config);
        app.current_session_id = Some("s1".into());
        mock.set_response(
            &format!("{}/chat/stream", BASE),
            MockResponse::StreamThenStall(vec![]),
        );

        let first = app.send_message_stream("one").await.unwrap();
        while mock.get_requests().is_empty() {
            tokio::task::yield_now().await;
        }

        let err = app.send_message("two").await.unwrap_err();
        assert!(matches!(err, KbError::Stream(StreamError::Busy)));
        let turns = lock_conversation(app.conversation()).snapshot();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "one");
        assert_eq!(mock.requests_with_method("POST").len(), 1);

        app.cancel_stream();
        first.await.unwrap();
    }

    #[tokio::test]
    async fn test_plain_send_cancelled_by_newer_submission() {
        let (mock, mut app) = app();
        app.current_session_id = Some("s1".into());
        mock.set_method_response(
            "POST",
            &format!("{}/chat/messages", BASE),
            MockResponse::Stall,
        );

        let gate = app.gate().clone();
        let cancel = tokio::spawn(async move {
            while !gate.is_busy() {
                tokio::task::yield_now().await;
            }
            gate.cancel_active()
        });

        let err = app.send_message("hello").await.unwrap_err();
        assert!(cancel.await.unwrap());
        assert!(matches!(err, KbError::Stream(StreamError::Cancelled)));
        assert!(lock_conversation(app.conversation()).is_empty());
        assert!(!app.gate().is_busy());
    }

    #[tokio::test]
    async fn test_plain_send_failure_rolls_back() {
        let (mock, mut app) = app();
        app.current_session_id = Some("s1".into());
        mock.set_default_response(MockResponse::Error(HttpError::ConnectionFailed(
            "refused".into(),
        )));

        assert!(app.send_message("hello").await.is_err());
        assert!(lock_conversation(app.conversation()).is_empty());
    }
}
