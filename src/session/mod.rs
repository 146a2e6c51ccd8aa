//! Stream sessions: one controller per submitted message, admitted through a
//! per-conversation gate.
//!
//! - [`StreamGate`] admits one stream at a time under a [`SubmitPolicy`]
//! - [`StreamSessionController`] drives a single exchange to a terminal phase
//! - [`FailurePolicy`] decides what happens to optimistic turns on failure

mod controller;
mod gate;
mod policy;

pub use controller::{
    SessionNotice, StreamOutcome, StreamPhase, StreamSessionController, StreamStats,
};
pub use gate::{StreamGate, StreamLease};
pub use policy::{FailurePolicy, SubmitPolicy};
