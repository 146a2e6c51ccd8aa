//! Policies for concurrent submissions and failed streams.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a submission does while another stream holds the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitPolicy {
    /// Wait for the active stream to finish
    #[default]
    Queue,
    /// Cancel the active stream, then start
    CancelPrevious,
    /// Fail immediately with `StreamError::Busy`
    Reject,
}

/// What happens to the optimistic turns when a stream fails or is
/// cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Remove both turns
    #[default]
    Rollback,
    /// Keep them; the assistant turn is marked interrupted
    Retain,
}

impl SubmitPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitPolicy::Queue => "queue",
            SubmitPolicy::CancelPrevious => "cancel_previous",
            SubmitPolicy::Reject => "reject",
        }
    }
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Rollback => "rollback",
            FailurePolicy::Retain => "retain",
        }
    }
}

impl fmt::Display for SubmitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "queue" => Ok(SubmitPolicy::Queue),
            "cancel_previous" | "cancel" => Ok(SubmitPolicy::CancelPrevious),
            "reject" => Ok(SubmitPolicy::Reject),
            other => Err(format!("unknown submit policy '{}'", other)),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rollback" => Ok(FailurePolicy::Rollback),
            "retain" | "keep" => Ok(FailurePolicy::Retain),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}
