//! `rangefetch get` – download one URL, printing progress while it runs.

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Args;
use rangefetch_core::config::{FailurePolicy, FetchConfig, ProxyPolicy};
use rangefetch_core::{
    format_speed, AddressOverride, CertificatePolicy, DownloadTask, ProgressHandle, TaskOptions,
};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Request options shared by `get` and `probe`. Unset flags keep the config file values.
#[derive(Debug, Clone, Args)]
pub struct GetArgs {
    /// HTTP/HTTPS URL; `http://` is assumed when no scheme is given.
    pub url: String,

    /// Directory to save into.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of concurrent range workers.
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Deadline for the whole transfer, in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[arg(long, value_name = "UA")]
    pub user_agent: Option<String>,

    /// Send every request through this proxy.
    #[arg(long, value_name = "URL", conflicts_with = "no_proxy")]
    pub proxy: Option<String>,

    /// Ignore proxy environment variables.
    #[arg(long)]
    pub no_proxy: bool,

    /// Force the https scheme.
    #[arg(long, conflicts_with = "http")]
    pub https: bool,

    /// Force the http scheme.
    #[arg(long)]
    pub http: bool,

    /// Split into ranges even if the server does not advertise range support.
    #[arg(long)]
    pub force_multi: bool,

    /// Connect to this IP instead of resolving the host (like `curl --resolve`).
    #[arg(long, value_name = "ADDR", conflicts_with = "resolve_on_host")]
    pub resolve: Option<String>,

    /// Request this `addr[:port]` and send the URL's host in the Host header.
    #[arg(long, value_name = "ADDR")]
    pub resolve_on_host: Option<String>,

    /// Skip TLS certificate verification.
    #[arg(short = 'k', long, conflicts_with = "verify_tls")]
    pub insecure: bool,

    /// Verify certificates even when the Host header is overridden.
    #[arg(long)]
    pub verify_tls: bool,

    /// Save under this file name.
    #[arg(long, value_name = "FILE")]
    pub name: Option<String>,

    /// Leave segment files on disk when the download fails.
    #[arg(long)]
    pub keep_segments: bool,
}

impl GetArgs {
    /// Applies the flags on top of `cfg`.
    pub fn config(&self, mut cfg: FetchConfig) -> FetchConfig {
        if let Some(dir) = &self.output_dir {
            cfg.save_dir = dir.clone();
        }
        if let Some(n) = self.workers {
            cfg.workers = n;
        }
        if let Some(secs) = self.timeout {
            cfg.timeout_secs = secs;
        }
        if let Some(ua) = &self.user_agent {
            cfg.user_agent = ua.clone();
        }
        if let Some(url) = &self.proxy {
            cfg.proxy = ProxyPolicy::Url { url: url.clone() };
        } else if self.no_proxy {
            cfg.proxy = ProxyPolicy::None;
        }
        if self.keep_segments {
            cfg.failure_policy = FailurePolicy::Retain;
        }
        cfg
    }

    pub fn task_options(&self) -> Result<TaskOptions> {
        let scheme = if self.https {
            Some("https".to_string())
        } else if self.http {
            Some("http".to_string())
        } else {
            None
        };
        let address = match (&self.resolve, &self.resolve_on_host) {
            (Some(addr), _) => Some(AddressOverride::resolve(addr)?),
            (None, Some(addr)) => Some(AddressOverride::on_host(addr)?),
            (None, None) => None,
        };
        let certificate = if self.insecure {
            CertificatePolicy::Skip
        } else if self.verify_tls {
            CertificatePolicy::Verify
        } else {
            CertificatePolicy::Auto
        };
        Ok(TaskOptions {
            file_name: self.name.clone(),
            scheme,
            force_multi: self.force_multi,
            address,
            certificate,
        })
    }

    pub fn task(&self, cfg: FetchConfig) -> Result<DownloadTask> {
        let options = self.task_options()?;
        Ok(DownloadTask::new(&self.url, self.config(cfg), options)?)
    }
}

pub async fn run_get(cfg: FetchConfig, args: GetArgs) -> Result<()> {
    let mut task = args.task(cfg)?;
    let progress = task.progress();
    let started = Instant::now();

    let mut download = tokio::task::spawn_blocking(move || task.download());
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    let mut last_bytes = 0u64;
    let mut last_tick = Instant::now();

    let result = loop {
        tokio::select! {
            res = &mut download => break res?,
            _ = ticker.tick() => {
                let now = Instant::now();
                let bytes = progress.written_bytes();
                let secs = now.duration_since(last_tick).as_secs_f64();
                let rate = if secs > 0.0 {
                    bytes.saturating_sub(last_bytes) as f64 / secs
                } else {
                    0.0
                };
                print_progress(&progress, started, rate);
                last_bytes = bytes;
                last_tick = now;
            }
        }
    };
    println!();

    let path = result?;
    let stats = progress.snapshot(started);
    println!(
        "saved {} ({} bytes in {:.1}s, avg {})",
        path.display(),
        stats.bytes_done,
        stats.elapsed_secs,
        format_speed(stats.bytes_per_sec())
    );
    Ok(())
}

fn print_progress(progress: &ProgressHandle, started: Instant, rate: f64) {
    let stats = progress.snapshot(started);
    let done_mib = stats.bytes_done as f64 / 1_048_576.0;
    let line = match (stats.total_bytes, progress.fraction()) {
        (Some(total), Some(fraction)) => {
            let eta = stats
                .eta_secs()
                .map(|s| format!("{:.0}s", s))
                .unwrap_or_else(|| "?".to_string());
            format!(
                "\r  [{}] {:.1} / {:.1} MiB ({:.1}%)  {}  ETA {}  ",
                progress.state(),
                done_mib,
                total as f64 / 1_048_576.0,
                fraction * 100.0,
                format_speed(rate),
                eta
            )
        }
        _ => format!(
            "\r  [{}] {:.1} MiB  {}  ",
            progress.state(),
            done_mib,
            format_speed(rate)
        ),
    };
    print!("{}", line);
    let _ = std::io::stdout().flush();
}
