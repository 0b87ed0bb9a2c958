//! HTTP HEAD / metadata probing.
//!
//! Uses the task's curl transport to fetch response headers and read
//! `Content-Length`, `Accept-Ranges` and `Content-Disposition`.

mod parse;

pub(crate) use parse::parse_status_line;

use std::str;
use std::time::Duration;

use crate::error::{DownloadError, FetchError};
use crate::transport::Transport;

/// The probe has its own deadline, independent of the task timeout.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Headers of the final probe response that planning depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// Total size in bytes, if `Content-Length` is present and numeric.
    pub content_length: Option<u64>,
    /// True if any non-empty `Accept-Ranges` header was sent.
    pub accept_ranges: bool,
    /// Raw `Content-Disposition` value (filename hint).
    pub content_disposition: Option<String>,
}

fn transport_error(e: curl::Error) -> DownloadError {
    DownloadError::Probe(FetchError::Transport(e))
}

/// Sends a HEAD request through `transport` and returns parsed metadata.
///
/// Blocks the current thread for at most [`PROBE_TIMEOUT`]. Only 200 and 206
/// are accepted.
pub fn probe(transport: &Transport) -> Result<HeadResult, DownloadError> {
    let mut headers: Vec<String> = Vec::new();

    let mut easy = transport.easy(PROBE_TIMEOUT).map_err(transport_error)?;
    easy.nobody(true).map_err(transport_error)?;

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    headers.push(s.trim_end().to_string());
                }
                true
            })
            .map_err(transport_error)?;
        transfer.perform().map_err(|e| {
            if e.is_operation_timedout() {
                DownloadError::Probe(FetchError::DeadlineExceeded)
            } else {
                DownloadError::Probe(FetchError::Transport(e))
            }
        })?;
    }

    let code = easy.response_code().map_err(transport_error)?;
    if code != 200 && code != 206 {
        tracing::debug!(url = transport.url(), code, "probe rejected");
        return Err(DownloadError::ProbeStatus(code));
    }

    let head = parse::parse_headers(&headers);
    tracing::debug!(
        url = transport.url(),
        content_length = ?head.content_length,
        accept_ranges = head.accept_ranges,
        "probe complete"
    );
    Ok(head)
}
