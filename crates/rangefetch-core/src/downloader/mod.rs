//! Download task orchestration.
//!
//! A [`DownloadTask`] drives one file through probe, range planning, the
//! concurrent range fetch and the final merge. Each task owns its transport,
//! its segment files and its progress counters; nothing is shared between
//! tasks.

mod run;
mod segment;
mod state;

pub use state::TaskState;

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crate::config::FetchConfig;
use crate::control::CancelScope;
use crate::error::{DownloadError, Result};
use crate::fetch_head;
use crate::progress::ProgressHandle;
use crate::segmenter::plan_ranges;
use crate::storage::SegmentStore;
use crate::transport::{AddressOverride, CertificatePolicy, Transport};
use crate::url_model::{derive_filename, Target};

/// Per-task overrides on top of the shared [`FetchConfig`].
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    /// Save under this name instead of the one derived from the response.
    pub file_name: Option<String>,
    /// Replace the URL's scheme (`http` / `https`).
    pub scheme: Option<String>,
    /// Split into ranges even when the server does not advertise `Accept-Ranges`.
    pub force_multi: bool,
    pub address: Option<AddressOverride>,
    pub certificate: CertificatePolicy,
}

/// What the probe learned about the resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub file_name: String,
    pub content_length: Option<u64>,
    /// Range requests will be used (advertised by the server or forced).
    pub resumable: bool,
}

/// One download, from URL to file on disk.
#[derive(Debug)]
pub struct DownloadTask {
    config: FetchConfig,
    target: Target,
    /// Original host, sent in `Host` when the URL was rerouted with
    /// [`AddressOverride::OnHost`].
    host_header: Option<String>,
    resolve_to: Option<IpAddr>,
    certificate: CertificatePolicy,
    force_multi: bool,
    file_name: Option<String>,
    transport: Option<Arc<Transport>>,
    metadata: Option<Metadata>,
    progress: ProgressHandle,
}

impl DownloadTask {
    /// Validates `config`, parses `url` and applies `options`. No network
    /// activity happens here.
    pub fn new(url: &str, config: FetchConfig, options: TaskOptions) -> Result<Self> {
        config.validate()?;
        let mut target = Target::parse(url)?;
        if let Some(scheme) = &options.scheme {
            target.set_scheme(scheme);
        }

        let mut host_header = None;
        let mut resolve_to = None;
        match options.address {
            Some(AddressOverride::Resolve(ip)) => resolve_to = Some(ip),
            Some(AddressOverride::OnHost(authority)) => {
                host_header = Some(target.host().to_string());
                target.set_host(&authority);
            }
            None => {}
        }

        tracing::debug!(
            url = %target.resolved_url(),
            host_header = ?host_header,
            resolve_to = ?resolve_to,
            "task configured"
        );

        Ok(Self {
            config,
            target,
            host_header,
            resolve_to,
            certificate: options.certificate,
            force_multi: options.force_multi,
            file_name: options.file_name,
            transport: None,
            metadata: None,
            progress: ProgressHandle::default(),
        })
    }

    fn set_state(&self, state: TaskState) {
        tracing::debug!(url = %self.target.resolved_url(), %state, "task state");
        self.progress.set_state(state);
    }

    fn fail(&self, e: DownloadError) -> DownloadError {
        tracing::warn!(url = %self.target.resolved_url(), "download failed: {}", e);
        self.set_state(TaskState::Failed);
        e
    }

    /// Builds the transport and probes the resource. Runs once; later calls
    /// return the cached result.
    pub fn probe(&mut self) -> Result<&Metadata> {
        let metadata = match self.metadata.take() {
            Some(m) => m,
            None => {
                self.set_state(TaskState::Probing);
                self.probe_inner().map_err(|e| self.fail(e))?
            }
        };
        Ok(self.metadata.insert(metadata))
    }

    fn build_transport(&self) -> Result<Transport> {
        Transport::build(
            &self.target,
            self.host_header.as_deref(),
            self.resolve_to,
            self.certificate,
            &self.config,
        )
    }

    fn probe_inner(&mut self) -> Result<Metadata> {
        let transport = Arc::new(self.build_transport()?);
        let head = fetch_head::probe(&transport)?;
        self.transport = Some(transport);

        let file_name = match &self.file_name {
            Some(name) => name.clone(),
            None => derive_filename(self.target.path(), head.content_disposition.as_deref()),
        };
        self.file_name = Some(file_name.clone());
        self.progress.set_total(head.content_length);

        let metadata = Metadata {
            file_name,
            content_length: head.content_length,
            resumable: self.force_multi || head.accept_ranges,
        };
        tracing::info!(
            url = %self.target.resolved_url(),
            file = %metadata.file_name,
            size = ?metadata.content_length,
            resumable = metadata.resumable,
            "probed"
        );
        Ok(metadata)
    }

    /// Runs the whole download and returns the path of the finished file.
    ///
    /// Probes first if [`probe`](Self::probe) has not been called. On failure
    /// the segment files are removed or kept according to the configured
    /// [`FailurePolicy`](crate::config::FailurePolicy).
    pub fn download(&mut self) -> Result<PathBuf> {
        let metadata = self.probe()?.clone();
        self.fetch_and_merge(&metadata).map_err(|e| self.fail(e))
    }

    fn fetch_and_merge(&self, metadata: &Metadata) -> Result<PathBuf> {
        let transport = match &self.transport {
            Some(t) => Arc::clone(t),
            None => Arc::new(self.build_transport()?),
        };

        self.set_state(TaskState::Planning);
        let split = metadata.resumable && self.config.workers > 1;
        let ranges = plan_ranges(metadata.content_length, self.config.workers, split)?;
        let store = SegmentStore::open(&self.save_path(), ranges.len(), split)
            .map_err(DownloadError::Storage)?;
        tracing::debug!(
            destination = %store.destination().display(),
            segments = store.segment_count(),
            ranged = store.is_ranged(),
            "segment store open"
        );

        self.set_state(TaskState::Fetching);
        let scope = CancelScope::with_timeout(self.config.timeout());
        self.progress.reset_written();
        if let Err(e) = run::run_workers(transport, &ranges, &store, &self.progress, &scope) {
            store.discard(self.config.failure_policy);
            return Err(e);
        }

        self.set_state(TaskState::Merging);
        let path = store.merge().map_err(DownloadError::Merge)?;

        self.set_state(TaskState::Done);
        tracing::info!(
            path = %path.display(),
            bytes = self.progress.written_bytes(),
            "download complete"
        );
        Ok(path)
    }

    /// Runs [`download`](Self::download) on a new thread.
    pub fn spawn(mut self) -> DownloadJoin {
        let progress = self.progress.clone();
        let handle = thread::spawn(move || self.download());
        DownloadJoin { handle, progress }
    }

    /// File name: the explicit one, or the probed one once known.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// `<save_dir>/<file_name>`, with the default name before probing.
    pub fn save_path(&self) -> PathBuf {
        let name = self
            .file_name
            .as_deref()
            .unwrap_or(crate::url_model::DEFAULT_FILENAME);
        self.config.save_dir.join(name)
    }

    pub fn content_length(&self) -> Option<u64> {
        self.metadata.as_ref().and_then(|m| m.content_length)
    }

    /// Content length, or -1 while unknown.
    pub fn file_size(&self) -> i64 {
        self.content_length()
            .and_then(|n| i64::try_from(n).ok())
            .unwrap_or(-1)
    }

    pub fn is_resumable(&self) -> bool {
        self.metadata.as_ref().map_or(false, |m| m.resumable)
    }

    pub fn written_bytes(&self) -> u64 {
        self.progress.written_bytes()
    }

    /// Host the server sees: the `Host` override if any, else the URL host.
    pub fn host_name(&self) -> &str {
        self.host_header.as_deref().unwrap_or(self.target.host())
    }

    pub fn resolved_url(&self) -> String {
        self.target.resolved_url()
    }

    pub fn progress(&self) -> ProgressHandle {
        self.progress.clone()
    }

    pub fn state(&self) -> TaskState {
        self.progress.state()
    }
}

/// A download running on its own thread.
#[derive(Debug)]
pub struct DownloadJoin {
    handle: thread::JoinHandle<Result<PathBuf>>,
    progress: ProgressHandle,
}

impl DownloadJoin {
    pub fn progress(&self) -> &ProgressHandle {
        &self.progress
    }

    /// Waits for the download and returns its result.
    pub fn join(self) -> Result<PathBuf> {
        self.handle
            .join()
            .unwrap_or(Err(DownloadError::WorkerPanicked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(url: &str, options: TaskOptions) -> DownloadTask {
        DownloadTask::new(url, FetchConfig::default(), options).unwrap()
    }

    #[test]
    fn new_applies_forced_scheme() {
        let t = task(
            "example.com/a.bin",
            TaskOptions {
                scheme: Some("https".to_string()),
                ..TaskOptions::default()
            },
        );
        assert_eq!(t.resolved_url(), "https://example.com/a.bin");
        assert_eq!(t.state(), TaskState::Configuring);
        assert_eq!(t.file_size(), -1);
        assert!(!t.is_resumable());
    }

    #[test]
    fn on_host_override_moves_original_host_to_header() {
        let t = task(
            "https://www.example.com/1.jpg?x=1",
            TaskOptions {
                address: Some(AddressOverride::on_host("198.51.100.4:23333").unwrap()),
                ..TaskOptions::default()
            },
        );
        assert_eq!(t.resolved_url(), "https://198.51.100.4:23333/1.jpg?x=1");
        assert_eq!(t.host_name(), "www.example.com");
    }

    #[test]
    fn resolve_override_keeps_url() {
        let t = task(
            "http://www.example.com/1.jpg",
            TaskOptions {
                address: Some(AddressOverride::resolve("127.0.0.1").unwrap()),
                ..TaskOptions::default()
            },
        );
        assert_eq!(t.resolved_url(), "http://www.example.com/1.jpg");
        assert_eq!(t.host_name(), "www.example.com");
    }

    #[test]
    fn explicit_name_sets_save_path() {
        let config = FetchConfig {
            save_dir: PathBuf::from("/srv/dl"),
            ..FetchConfig::default()
        };
        let t = DownloadTask::new(
            "http://example.com/x",
            config,
            TaskOptions {
                file_name: Some("named.bin".to_string()),
                ..TaskOptions::default()
            },
        )
        .unwrap();
        assert_eq!(t.file_name(), Some("named.bin"));
        assert_eq!(t.save_path(), PathBuf::from("/srv/dl/named.bin"));
    }

    #[test]
    fn configuration_errors_surface_from_new() {
        let zero = FetchConfig {
            workers: 0,
            ..FetchConfig::default()
        };
        let err =
            DownloadTask::new("http://example.com/", zero, TaskOptions::default()).unwrap_err();
        assert!(matches!(err, DownloadError::InvalidWorkers));

        let err = DownloadTask::new("http://", FetchConfig::default(), TaskOptions::default())
            .unwrap_err();
        assert!(err.is_config());
    }
}
