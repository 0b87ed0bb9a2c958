//! Single-range HTTP GET streamed into a segment sink.

use std::cell::Cell;
use std::io;
use std::str;
use std::sync::atomic::AtomicU64;

use crate::control::{CancelReason, CancelScope};
use crate::error::FetchError;
use crate::fetch_head::parse_status_line;
use crate::segmenter::ByteRange;
use crate::storage::SegmentSink;
use crate::transport::Transport;

fn is_success(code: u32) -> bool {
    code == 200 || code == 206
}

/// Downloads `range` through `transport` into `sink`.
///
/// Every byte accepted by the sink is added to `written` as it happens. The
/// transfer aborts as soon as `scope` is cancelled or expires, when the status
/// is not 200/206, or when the body runs past the range. Returns the bytes
/// received.
pub(crate) fn fetch_range(
    transport: &Transport,
    range: &ByteRange,
    sink: &mut SegmentSink,
    written: &AtomicU64,
    scope: &CancelScope,
) -> Result<u64, FetchError> {
    if let Some(reason) = scope.reason() {
        return Err(reason.into());
    }

    let expected = range.len();
    let status: Cell<Option<u32>> = Cell::new(None);
    let received = Cell::new(0u64);
    let overrun = Cell::new(false);
    let cancelled: Cell<Option<CancelReason>> = Cell::new(None);
    let storage_error: Cell<Option<io::Error>> = Cell::new(None);

    let mut easy = transport
        .easy(scope.remaining())
        .map_err(FetchError::Transport)?;
    easy.range(&range.curl_spec()).map_err(FetchError::Transport)?;
    easy.progress(true).map_err(FetchError::Transport)?;

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Some(code) = str::from_utf8(data).ok().and_then(parse_status_line) {
                    status.set(Some(code));
                }
                true
            })
            .map_err(FetchError::Transport)?;
        transfer
            .write_function(|data| {
                if let Some(reason) = scope.reason() {
                    cancelled.set(Some(reason));
                    return Ok(0);
                }
                if !status.get().map_or(false, is_success) {
                    return Ok(0);
                }
                if received.get() + data.len() as u64 > expected {
                    overrun.set(true);
                    received.set(received.get() + data.len() as u64);
                    return Ok(0);
                }
                match sink.write_counted(data, written) {
                    Ok(()) => {
                        received.set(received.get() + data.len() as u64);
                        Ok(data.len())
                    }
                    Err(e) => {
                        storage_error.set(Some(e));
                        Ok(0)
                    }
                }
            })
            .map_err(FetchError::Transport)?;
        transfer
            .progress_function(|_, _, _, _| match scope.reason() {
                Some(reason) => {
                    cancelled.set(Some(reason));
                    false
                }
                None => true,
            })
            .map_err(FetchError::Transport)?;
        transfer.perform()
    };

    if let Err(e) = perform_result {
        if let Some(reason) = cancelled.get() {
            return Err(reason.into());
        }
        if let Some(io_err) = storage_error.take() {
            return Err(FetchError::Storage(io_err));
        }
        if overrun.get() {
            return Err(FetchError::PartialTransfer {
                expected,
                received: received.get(),
            });
        }
        if let Some(code) = status.get().filter(|c| !is_success(*c)) {
            return Err(FetchError::Http(code));
        }
        if e.is_operation_timedout() {
            return Err(FetchError::DeadlineExceeded);
        }
        return Err(FetchError::Transport(e));
    }

    let code = easy.response_code().map_err(FetchError::Transport)?;
    if !is_success(code) {
        return Err(FetchError::Http(code));
    }

    let received = received.get();
    if received != expected {
        return Err(FetchError::PartialTransfer { expected, received });
    }
    Ok(received)
}
