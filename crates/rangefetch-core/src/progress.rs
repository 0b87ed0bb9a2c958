//! Progress reporting for a running task (bytes written, rate, ETA).
//!
//! The task and its workers update a shared set of atomics; any number of
//! [`ProgressHandle`] clones read them from other threads.

use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::downloader::TaskState;

#[derive(Debug)]
struct Shared {
    written: AtomicU64,
    /// Probed content length, -1 while unknown.
    total: AtomicI64,
    state: AtomicU8,
}

/// Read side of a task's counters. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    shared: Arc<Shared>,
}

impl Default for ProgressHandle {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                written: AtomicU64::new(0),
                total: AtomicI64::new(-1),
                state: AtomicU8::new(TaskState::Configuring as u8),
            }),
        }
    }
}

impl ProgressHandle {
    /// Bytes written into segment files so far. Never decreases.
    pub fn written_bytes(&self) -> u64 {
        self.shared.written.load(Ordering::Relaxed)
    }

    /// Content length once probed.
    pub fn total_bytes(&self) -> Option<u64> {
        u64::try_from(self.shared.total.load(Ordering::Relaxed)).ok()
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.shared.state.load(Ordering::Relaxed))
    }

    /// Fraction complete in [0.0, 1.0], if the size is known.
    pub fn fraction(&self) -> Option<f64> {
        let total = self.total_bytes()?;
        if total == 0 {
            return Some(1.0);
        }
        Some((self.written_bytes() as f64 / total as f64).min(1.0))
    }

    /// Samples the counter, sleeps `elapse`, samples again; returns bytes/second.
    pub fn speed_over(&self, elapse: Duration) -> f64 {
        let before = self.written_bytes();
        thread::sleep(elapse);
        let delta = self.written_bytes().saturating_sub(before);
        if elapse.is_zero() {
            return 0.0;
        }
        delta as f64 / elapse.as_secs_f64()
    }

    pub fn snapshot(&self, started: Instant) -> ProgressStats {
        ProgressStats {
            bytes_done: self.written_bytes(),
            total_bytes: self.total_bytes(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        }
    }

    pub(crate) fn counter(&self) -> &AtomicU64 {
        &self.shared.written
    }

    pub(crate) fn reset_written(&self) {
        self.shared.written.store(0, Ordering::Relaxed);
    }

    pub(crate) fn set_total(&self, total: Option<u64>) {
        let v = total.and_then(|t| i64::try_from(t).ok()).unwrap_or(-1);
        self.shared.total.store(v, Ordering::Relaxed);
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        self.shared.state.store(state as u8, Ordering::Relaxed);
    }
}

/// Point-in-time view for display.
#[derive(Debug, Clone)]
pub struct ProgressStats {
    pub bytes_done: u64,
    pub total_bytes: Option<u64>,
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Average rate since the task started (0 if no time has elapsed).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if size unknown or rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes?.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }
}

/// Renders a rate as whole `KB/s`, switching to `MB/s` with two decimals
/// above 1024 KB/s.
pub fn format_speed(bytes_per_sec: f64) -> String {
    let kib = (bytes_per_sec / 1024.0).max(0.0) as u64;
    if kib > 1024 {
        format!("{:.2} MB/s", kib as f64 / 1024.0)
    } else {
        format!("{} KB/s", kib)
    }
}
