//! Cancellation scope shared by the workers of one task.
//!
//! A scope is an abort token plus a deadline. The orchestrator cancels it when
//! the first worker fails; workers poll it from their curl callbacks and abort
//! the transfer when it reports a reason.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::FetchError;

/// Why a scope stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// `cancel()` was called (a sibling worker failed).
    Cancelled,
    /// The deadline passed.
    DeadlineExceeded,
}

impl From<CancelReason> for FetchError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Cancelled => FetchError::Cancelled,
            CancelReason::DeadlineExceeded => FetchError::DeadlineExceeded,
        }
    }
}

/// Cheap to clone; all clones observe the same token and deadline.
#[derive(Debug, Clone)]
pub struct CancelScope {
    aborted: Arc<AtomicBool>,
    deadline: Instant,
}

impl CancelScope {
    /// New scope that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or(now + Duration::from_secs(86_400 * 365));
        Self {
            aborted: Arc::new(AtomicBool::new(false)),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.aborted.store(true, Ordering::Relaxed);
    }

    /// `Some(reason)` once the scope is cancelled or past its deadline.
    /// An explicit cancel wins over the deadline.
    pub fn reason(&self) -> Option<CancelReason> {
        if self.aborted.load(Ordering::Relaxed) {
            Some(CancelReason::Cancelled)
        } else if Instant::now() >= self.deadline {
            Some(CancelReason::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Time left before the deadline (zero once it has passed).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}
