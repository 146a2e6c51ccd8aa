//! One request/response cycle of the chat stream.
//!
//! ```text
//! Idle -> Requesting -> Streaming -> Completed
//!              |            |
//!              +------------+-----> Failed | Cancelled
//! ```
//!
//! The controller is consumed by [`StreamSessionController::run`]. It only
//! suspends while opening the request and while waiting for the next chunk;
//! both waits race the lease's cancellation token.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::gate::StreamLease;
use super::policy::FailurePolicy;
use crate::api::KnowledgeBaseClient;
use crate::conversation::{lock_conversation, ApplyOutcome, SharedConversation, SideEffect};
use crate::error::StreamError;
use crate::models::StreamRequest;
use crate::sse::{SseDecoder, SseParseError, StreamEvent};
use crate::traits::HttpClient;

/// Lifecycle phase of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Idle,
    Requesting,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

impl StreamPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamPhase::Completed | StreamPhase::Failed | StreamPhase::Cancelled
        )
    }

    fn can_move_to(&self, next: StreamPhase) -> bool {
        use StreamPhase::*;
        matches!(
            (self, next),
            (Idle, Requesting)
                | (Requesting, Streaming)
                | (Requesting, Failed)
                | (Requesting, Cancelled)
                | (Streaming, Completed)
                | (Streaming, Failed)
                | (Streaming, Cancelled)
        )
    }
}

/// Notices a stream sends to the rest of the application.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    /// The controller moved to a new phase
    Phase {
        assistant_id: String,
        phase: StreamPhase,
    },
    /// Session title or summary may have changed; re-list sessions
    MetadataStale { session_id: String },
}

/// Counters for one stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub chunks: u64,
    pub events_applied: u64,
    pub frames_dropped: u64,
}

/// How a stream ended. `run` never fails; it reports one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// `Done` arrived, or the body ended cleanly without it
    Completed {
        user_id: String,
        assistant_id: String,
        saw_done: bool,
        stats: StreamStats,
    },
    Failed {
        error: StreamError,
        rolled_back: bool,
        stats: StreamStats,
    },
    Cancelled {
        rolled_back: bool,
        stats: StreamStats,
    },
}

impl StreamOutcome {
    /// Outcome for a submission the gate never admitted.
    ///
    /// No turns were inserted, so there is nothing to roll back.
    pub fn not_admitted(error: StreamError) -> Self {
        match error {
            StreamError::Cancelled => StreamOutcome::Cancelled {
                rolled_back: false,
                stats: StreamStats::default(),
            },
            error => StreamOutcome::Failed {
                error,
                rolled_back: false,
                stats: StreamStats::default(),
            },
        }
    }

    pub fn phase(&self) -> StreamPhase {
        match self {
            StreamOutcome::Completed { .. } => StreamPhase::Completed,
            StreamOutcome::Failed { .. } => StreamPhase::Failed,
            StreamOutcome::Cancelled { .. } => StreamPhase::Cancelled,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StreamOutcome::Completed { .. })
    }

    pub fn stats(&self) -> StreamStats {
        match self {
            StreamOutcome::Completed { stats, .. }
            | StreamOutcome::Failed { stats, .. }
            | StreamOutcome::Cancelled { stats, .. } => *stats,
        }
    }

    /// The error to surface to the user, if any
    pub fn error(&self) -> Option<StreamError> {
        match self {
            StreamOutcome::Completed { .. } => None,
            StreamOutcome::Failed { error, .. } => Some(error.clone()),
            StreamOutcome::Cancelled { .. } => Some(StreamError::Cancelled),
        }
    }
}

/// Whether to keep reading after a chunk
enum Flow {
    Continue,
    Done,
}

/// Drives one submitted message from request to terminal phase.
pub struct StreamSessionController<C: HttpClient> {
    api: KnowledgeBaseClient<C>,
    conversation: SharedConversation,
    request: StreamRequest,
    failure_policy: FailurePolicy,
    notices: Option<mpsc::UnboundedSender<SessionNotice>>,
    phase: StreamPhase,
    stats: StreamStats,
    user_id: String,
    assistant_id: String,
}

impl<C: HttpClient> StreamSessionController<C> {
    pub fn new(
        api: KnowledgeBaseClient<C>,
        conversation: SharedConversation,
        request: StreamRequest,
    ) -> Self {
        Self {
            api,
            conversation,
            request,
            failure_policy: FailurePolicy::default(),
            notices: None,
            phase: StreamPhase::Idle,
            stats: StreamStats::default(),
            user_id: String::new(),
            assistant_id: String::new(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_notices(mut self, notices: mpsc::UnboundedSender<SessionNotice>) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Run the exchange to a terminal phase.
    ///
    /// The lease is held until this returns, so the next submission on the
    /// same conversation starts only after the optimistic turns of this one
    /// are confirmed or rolled back.
    pub async fn run(mut self, lease: StreamLease) -> StreamOutcome {
        let token = lease.token().clone();

        let (user_id, assistant_id) =
            lock_conversation(&self.conversation).begin_exchange(self.request.content.as_str());
        self.user_id = user_id;
        self.assistant_id = assistant_id;
        self.transition(StreamPhase::Requesting);

        info!(
            session_id = %self.request.session_id,
            lease = lease.id(),
            "Opening chat stream"
        );

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = self.api.open_chat_stream(&self.request) => Some(result),
        };

        let mut source = match opened {
            None => return self.cancelled(),
            Some(Err(e)) => return self.failed(StreamError::from_open_error(e)),
            Some(Ok(source)) => source,
        };
        self.transition(StreamPhase::Streaming);

        let mut decoder = SseDecoder::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return self.cancelled(),
                chunk = source.next_chunk() => chunk,
            };

            match next {
                Ok(Some(text)) => {
                    self.stats.chunks += 1;
                    let results = decoder.push(&text);
                    if let Flow::Done = self.apply_all(results) {
                        return self.completed(true);
                    }
                }
                Ok(None) => {
                    if let Some(last) = decoder.finish() {
                        if let Flow::Done = self.apply_all(vec![Ok(last)]) {
                            return self.completed(true);
                        }
                    }
                    debug!(
                        bytes = source.bytes_read(),
                        "Stream ended without completion sentinel"
                    );
                    return self.completed(false);
                }
                Err(e) => return self.failed(StreamError::from_read_error(e)),
            }
        }
    }

    /// Apply decoded events in order under one lock.
    ///
    /// Stops at `Done`: the rest of the chunk is discarded.
    fn apply_all(&mut self, results: Vec<Result<StreamEvent, SseParseError>>) -> Flow {
        let mut refresh = false;
        let mut flow = Flow::Continue;
        {
            let mut conversation = lock_conversation(&self.conversation);
            for result in results {
                let event = match result {
                    Ok(event) => event,
                    Err(_) => {
                        self.stats.frames_dropped += 1;
                        continue;
                    }
                };
                // The sentinel ends the stream even if the turn is gone
                let terminal = event.is_terminal();
                let outcome = conversation.apply(&self.assistant_id, event);
                if outcome.mutated() {
                    self.stats.events_applied += 1;
                }
                match outcome {
                    ApplyOutcome::Signal(SideEffect::RefreshSessionMetadata) => refresh = true,
                    ApplyOutcome::Missing => {
                        debug!(
                            turn_id = %self.assistant_id,
                            "Stream turn no longer in conversation"
                        );
                    }
                    ApplyOutcome::Applied | ApplyOutcome::Closed | ApplyOutcome::Ignored => {}
                }
                if terminal {
                    flow = Flow::Done;
                    break;
                }
            }
        }

        if refresh {
            self.notify(SessionNotice::MetadataStale {
                session_id: self.request.session_id.clone(),
            });
        }
        flow
    }

    fn completed(mut self, saw_done: bool) -> StreamOutcome {
        lock_conversation(&self.conversation).confirm_exchange(&self.user_id, &self.assistant_id);
        self.transition(StreamPhase::Completed);
        // Title and summary are regenerated server-side after each reply
        self.notify(SessionNotice::MetadataStale {
            session_id: self.request.session_id.clone(),
        });
        info!(
            session_id = %self.request.session_id,
            saw_done,
            chunks = self.stats.chunks,
            events = self.stats.events_applied,
            "Chat stream completed"
        );
        StreamOutcome::Completed {
            user_id: self.user_id,
            assistant_id: self.assistant_id,
            saw_done,
            stats: self.stats,
        }
    }

    fn failed(mut self, error: StreamError) -> StreamOutcome {
        if error == StreamError::Cancelled {
            return self.cancelled();
        }
        let rolled_back = self.settle_failure();
        self.transition(StreamPhase::Failed);
        warn!(
            session_id = %self.request.session_id,
            code = error.error_code(),
            rolled_back,
            "Chat stream failed: {}",
            error
        );
        StreamOutcome::Failed {
            error,
            rolled_back,
            stats: self.stats,
        }
    }

    fn cancelled(mut self) -> StreamOutcome {
        let rolled_back = self.settle_failure();
        self.transition(StreamPhase::Cancelled);
        info!(session_id = %self.request.session_id, rolled_back, "Chat stream cancelled");
        StreamOutcome::Cancelled {
            rolled_back,
            stats: self.stats,
        }
    }

    /// Apply the failure policy to the optimistic turns.
    fn settle_failure(&mut self) -> bool {
        let mut conversation = lock_conversation(&self.conversation);
        match self.failure_policy {
            FailurePolicy::Rollback => {
                conversation.rollback_exchange(&self.user_id, &self.assistant_id) > 0
            }
            FailurePolicy::Retain => {
                conversation.retain_exchange(&self.assistant_id);
                false
            }
        }
    }

    fn transition(&mut self, next: StreamPhase) {
        if !self.phase.can_move_to(next) {
            warn!(from = ?self.phase, to = ?next, "Unexpected stream phase transition");
        }
        debug!(from = ?self.phase, to = ?next, "Stream phase");
        self.phase = next;
        self.notify(SessionNotice::Phase {
            assistant_id: self.assistant_id.clone(),
            phase: next,
        });
    }

    fn notify(&self, notice: SessionNotice) {
        if let Some(tx) = &self.notices {
            // Receiver gone means nobody is listening any more
            let _ = tx.send(notice);
        }
    }
}
