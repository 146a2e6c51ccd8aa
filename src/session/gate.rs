//! Single-flight gate for chat streams.
//!
//! One gate per conversation. A controller must hold a `StreamLease` while
//! it runs; the lease carries the cancellation token the controller checks
//! at every suspension point.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::policy::SubmitPolicy;
use crate::error::StreamError;

#[derive(Debug)]
struct GateState {
    /// Parent of every lease token; replaced by `cancel_all`
    epoch: CancellationToken,
    /// Lease id and token of the stream currently running
    active: Option<(u64, CancellationToken)>,
}

#[derive(Debug)]
struct GateInner {
    permit: Arc<Semaphore>,
    state: Mutex<GateState>,
    next_lease: AtomicU64,
    policy: SubmitPolicy,
}

impl GateInner {
    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Admits one stream at a time; cheap to clone.
#[derive(Debug, Clone)]
pub struct StreamGate {
    inner: Arc<GateInner>,
}

impl Default for StreamGate {
    fn default() -> Self {
        Self::new(SubmitPolicy::default())
    }
}

impl StreamGate {
    pub fn new(policy: SubmitPolicy) -> Self {
        Self {
            inner: Arc::new(GateInner {
                permit: Arc::new(Semaphore::new(1)),
                state: Mutex::new(GateState {
                    epoch: CancellationToken::new(),
                    active: None,
                }),
                next_lease: AtomicU64::new(1),
                policy,
            }),
        }
    }

    pub fn policy(&self) -> SubmitPolicy {
        self.inner.policy
    }

    /// Whether a stream currently holds the gate
    pub fn is_busy(&self) -> bool {
        self.inner.permit.available_permits() == 0
    }

    /// Obtain the lease according to the gate's submit policy.
    ///
    /// Fails with `StreamError::Busy` under `Reject` when a stream is
    /// running, and with `StreamError::Cancelled` when `cancel_all` fires
    /// while waiting.
    pub async fn acquire(&self) -> Result<StreamLease, StreamError> {
        let epoch = self.inner.state().epoch.clone();

        let permit = match self.inner.policy {
            SubmitPolicy::Reject => self
                .inner
                .permit
                .clone()
                .try_acquire_owned()
                .map_err(|_| StreamError::Busy)?,
            SubmitPolicy::Queue | SubmitPolicy::CancelPrevious => {
                if self.inner.policy == SubmitPolicy::CancelPrevious {
                    self.cancel_active();
                }
                tokio::select! {
                    biased;
                    _ = epoch.cancelled() => return Err(StreamError::Cancelled),
                    permit = self.inner.permit.clone().acquire_owned() => {
                        permit.map_err(|_| StreamError::Cancelled)?
                    }
                }
            }
        };

        let id = self.inner.next_lease.fetch_add(1, Ordering::Relaxed);
        let token = epoch.child_token();
        self.inner.state().active = Some((id, token.clone()));
        debug!(lease = id, policy = %self.inner.policy, "Stream lease acquired");

        Ok(StreamLease {
            id,
            token,
            gate: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Cancel the running stream, if any. Queued submissions still run.
    pub fn cancel_active(&self) -> bool {
        match self.inner.state().active.as_ref() {
            Some((id, token)) => {
                debug!(lease = id, "Cancelling active stream");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel the running stream and every queued submission.
    ///
    /// Used when the conversation changes underneath (session switch).
    pub fn cancel_all(&self) {
        let mut state = self.inner.state();
        let old = std::mem::replace(&mut state.epoch, CancellationToken::new());
        old.cancel();
    }
}

/// Permission to run one stream; released on drop.
#[derive(Debug)]
pub struct StreamLease {
    id: u64,
    token: CancellationToken,
    gate: Arc<GateInner>,
    _permit: OwnedSemaphorePermit,
}

impl StreamLease {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Token the controller checks at each suspension point
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for StreamLease {
    fn drop(&mut self) {
        let mut state = self.gate.state();
        if matches!(state.active, Some((id, _)) if id == self.id) {
            state.active = None;
        }
    }
}
