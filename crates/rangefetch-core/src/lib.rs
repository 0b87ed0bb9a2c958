//! Concurrent range-based file fetching.
//!
//! A [`DownloadTask`] probes a URL with `HEAD`, splits the resource into one
//! byte range per worker, fetches the ranges in parallel into segment files,
//! and concatenates them into the destination.

pub mod config;
pub mod control;
pub mod downloader;
pub mod error;
pub mod fetch_head;
pub mod logging;
pub mod progress;
pub mod segmenter;
pub mod storage;
pub mod transport;
pub mod url_model;

pub use config::{FailurePolicy, FetchConfig, ProxyPolicy};
pub use downloader::{DownloadJoin, DownloadTask, Metadata, TaskOptions, TaskState};
pub use error::{DownloadError, FetchError};
pub use progress::{format_speed, ProgressHandle, ProgressStats};
pub use transport::{AddressOverride, CertificatePolicy};
