//! Ordered conversation state and stream event reconciliation.
//!
//! `Conversation` is the single owner of the turn list. The stream
//! controller writes to it through [`Conversation::apply`]; the rendering
//! side reads [`Conversation::snapshot`] and listens on
//! [`Conversation::subscribe`].

mod change;

pub use change::{ApplyOutcome, ConversationChange, SideEffect};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{ConversationTurn, TurnStatus};
use crate::sse::StreamEvent;

/// Buffered change notifications per subscriber
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Conversation shared between the stream task and the rest of the app.
///
/// Lock with [`lock_conversation`] and never hold the guard across an
/// `.await`.
pub type SharedConversation = Arc<Mutex<Conversation>>;

/// Lock a shared conversation.
///
/// A panic while the lock was held leaves the list in a consistent state
/// (every mutation is a single step), so a poisoned lock is recovered.
pub fn lock_conversation(shared: &SharedConversation) -> MutexGuard<'_, Conversation> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The ordered turn list of the active session.
#[derive(Debug)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
    /// Turn id -> position in `turns`
    index: HashMap<String, usize>,
    changes: broadcast::Sender<ConversationChange>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            turns: Vec::new(),
            index: HashMap::new(),
            changes,
        }
    }

    /// Wrap in the shared handle used across tasks
    pub fn into_shared(self) -> SharedConversation {
        Arc::new(Mutex::new(self))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationChange> {
        self.changes.subscribe()
    }

    /// Owned copy of the turn list in display order.
    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.clone()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn get(&self, turn_id: &str) -> Option<&ConversationTurn> {
        self.index.get(turn_id).map(|&i| &self.turns[i])
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The assistant turn currently receiving tokens, if any
    pub fn streaming_turn(&self) -> Option<&ConversationTurn> {
        self.turns.iter().rev().find(|t| t.is_streaming())
    }

    /// Whether the turn exists and no longer accepts stream events.
    ///
    /// Only a `Streaming` turn is open; `Done`, confirmation and an
    /// interrupted failure all move it out of that state.
    pub fn is_closed(&self, turn_id: &str) -> bool {
        self.get(turn_id).is_some_and(|t| !t.is_streaming())
    }

    /// Append the optimistic user turn and an empty assistant turn.
    ///
    /// Returns `(user_id, assistant_id)`.
    pub fn begin_exchange(&mut self, content: impl Into<String>) -> (String, String) {
        let user = ConversationTurn::pending_user(content);
        let assistant = ConversationTurn::streaming_assistant();
        let ids = (user.id.clone(), assistant.id.clone());
        self.push(user);
        self.push(assistant);
        ids
    }

    /// Mark both turns of a finished exchange as confirmed and close the
    /// assistant turn.
    pub fn confirm_exchange(&mut self, user_id: &str, assistant_id: &str) {
        let mut confirmed = Vec::new();
        for id in [user_id, assistant_id] {
            if let Some(&i) = self.index.get(id) {
                self.turns[i].status = TurnStatus::Confirmed;
                confirmed.push(id.to_string());
            }
        }
        if !confirmed.is_empty() {
            self.publish(ConversationChange::Confirmed { turn_ids: confirmed });
        }
    }

    /// Keep the turns of a failed exchange with whatever arrived.
    ///
    /// The assistant turn is closed and marked `Interrupted`; the user turn
    /// stays `Pending` since the server may never have stored it.
    pub fn retain_exchange(&mut self, assistant_id: &str) {
        let Some(&i) = self.index.get(assistant_id) else {
            return;
        };
        if self.turns[i].is_streaming() {
            self.turns[i].status = TurnStatus::Interrupted;
            self.publish(ConversationChange::TurnClosed {
                turn_id: assistant_id.to_string(),
            });
        }
    }

    /// Remove the optimistic turns of a failed exchange.
    ///
    /// Returns how many turns were removed; turns already gone (the list
    /// was replaced meanwhile) are skipped.
    pub fn rollback_exchange(&mut self, user_id: &str, assistant_id: &str) -> usize {
        let before = self.turns.len();
        self.turns.retain(|t| t.id != user_id && t.id != assistant_id);
        let removed = before - self.turns.len();

        if removed > 0 {
            self.rebuild_index();
            self.publish(ConversationChange::Removed {
                turn_ids: vec![user_id.to_string(), assistant_id.to_string()],
            });
        }
        removed
    }

    /// Replace the list with an authoritative fetch.
    pub fn replace_all(&mut self, turns: Vec<ConversationTurn>) {
        self.turns = turns;
        self.rebuild_index();
        self.publish(ConversationChange::Reset {
            len: self.turns.len(),
        });
    }

    pub fn clear(&mut self) {
        self.replace_all(Vec::new());
    }

    /// Apply one decoded stream event to the turn it belongs to.
    pub fn apply(&mut self, turn_id: &str, event: StreamEvent) -> ApplyOutcome {
        let position = self.index.get(turn_id).copied();
        if let Some(i) = position {
            if !self.turns[i].is_streaming() {
                debug!(turn_id, event = event.event_type_name(), "Event after close ignored");
                return ApplyOutcome::Ignored;
            }
        }

        // Title changes are about the session, not the turn
        if let StreamEvent::TitleChanged = event {
            return ApplyOutcome::Signal(SideEffect::RefreshSessionMetadata);
        }

        let Some(i) = position else {
            return ApplyOutcome::Missing;
        };
        let turn = &mut self.turns[i];

        match event {
            StreamEvent::Token(delta) => {
                turn.content.push_str(&delta);
                self.publish(ConversationChange::TokenAppended {
                    turn_id: turn_id.to_string(),
                    delta,
                });
                ApplyOutcome::Applied
            }
            StreamEvent::SourcesAttached(citations) => {
                let count = citations.len();
                turn.sources = Some(citations);
                self.publish(ConversationChange::SourcesReplaced {
                    turn_id: turn_id.to_string(),
                    count,
                });
                ApplyOutcome::Applied
            }
            StreamEvent::Done => {
                turn.status = TurnStatus::Confirmed;
                self.publish(ConversationChange::TurnClosed {
                    turn_id: turn_id.to_string(),
                });
                ApplyOutcome::Closed
            }
            StreamEvent::TitleChanged => ApplyOutcome::Signal(SideEffect::RefreshSessionMetadata),
        }
    }

    fn push(&mut self, turn: ConversationTurn) {
        let turn_id = turn.id.clone();
        self.index.insert(turn_id.clone(), self.turns.len());
        self.turns.push(turn);
        self.publish(ConversationChange::TurnAdded { turn_id });
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .turns
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
    }

    fn publish(&self, change: ConversationChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }
}
