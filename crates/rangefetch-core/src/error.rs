//! Error types for the download engine.
//!
//! `FetchError` describes why a single HTTP exchange (probe or range GET)
//! failed; `DownloadError` is what a task reports to its caller.

use std::io;
use thiserror::Error;

/// Error from one HTTP exchange: the HEAD probe or a single range GET.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Curl reported an error (connect failure, reset, TLS, ...).
    #[error("transport: {0}")]
    Transport(#[source] curl::Error),
    /// Response status was neither 200 nor 206.
    #[error("HTTP {0}")]
    Http(u32),
    /// Writing the body into the segment sink failed.
    #[error("storage: {0}")]
    Storage(#[source] io::Error),
    /// Transfer ended but the byte count does not match the requested range.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// A sibling worker failed and the task cancelled its scope.
    #[error("cancelled")]
    Cancelled,
    /// The task deadline elapsed before the transfer finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl FetchError {
    /// True for errors caused by the task's own cancellation scope rather than the
    /// remote side.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FetchError::Cancelled | FetchError::DeadlineExceeded)
    }
}

/// Error returned by [`crate::downloader::DownloadTask::download`].
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid proxy URL {url:?}: {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid address override {0:?}")]
    InvalidAddress(String),

    #[error("worker count must be at least 1")]
    InvalidWorkers,

    /// Content length is zero or unknown, so no range can be planned.
    #[error("cannot plan ranges for content length {0}")]
    InvalidSize(i64),

    #[error("probe failed: {0}")]
    Probe(#[source] FetchError),

    #[error("probe returned HTTP {0}")]
    ProbeStatus(u32),

    #[error("failed to open segment files: {0}")]
    Storage(#[source] io::Error),

    #[error("segment {index} failed: {source}")]
    Segment {
        index: usize,
        #[source]
        source: FetchError,
    },

    #[error("merge failed: {0}")]
    Merge(#[source] io::Error),

    #[error("download worker panicked")]
    WorkerPanicked,
}

impl DownloadError {
    /// Configuration-class errors are raised before any byte is transferred.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            DownloadError::InvalidUrl { .. }
                | DownloadError::InvalidProxy { .. }
                | DownloadError::InvalidAddress(_)
                | DownloadError::InvalidWorkers
                | DownloadError::InvalidSize(_)
        )
    }
}

pub type Result<T, E = DownloadError> = std::result::Result<T, E>;
