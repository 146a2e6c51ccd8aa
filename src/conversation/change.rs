//! Change notifications and apply outcomes

/// A mutation of the conversation, published after it happened.
///
/// Subscribers that fall behind get `RecvError::Lagged` and should re-read
/// `Conversation::snapshot()`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationChange {
    /// A turn was appended at the end
    TurnAdded { turn_id: String },
    /// Text was appended to a turn
    TokenAppended { turn_id: String, delta: String },
    /// A turn's citation list was replaced
    SourcesReplaced { turn_id: String, count: usize },
    /// A turn stopped accepting stream events
    TurnClosed { turn_id: String },
    /// Optimistic turns became confirmed
    Confirmed { turn_ids: Vec<String> },
    /// Turns were removed
    Removed { turn_ids: Vec<String> },
    /// The whole list was replaced (fetch or clear)
    Reset { len: usize },
}

/// Work the reconciler cannot do itself and hands back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Session title/summary may be stale; re-fetch the session list
    RefreshSessionMetadata,
}

/// What `Conversation::apply` did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The turn was mutated
    Applied,
    /// Nothing was mutated; the caller should perform the side effect
    Signal(SideEffect),
    /// The event was `Done` and the turn is now closed
    Closed,
    /// The turn was already closed; the event was discarded
    Ignored,
    /// No turn with that id (the list was replaced mid-stream)
    Missing,
}

impl ApplyOutcome {
    /// Whether the turn's content or sources changed
    pub fn mutated(&self) -> bool {
        matches!(self, ApplyOutcome::Applied)
    }
}
