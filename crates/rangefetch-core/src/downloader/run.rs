//! Concurrent execution of range fetches, one worker thread per range.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use crate::control::CancelScope;
use crate::error::{DownloadError, FetchError};
use crate::progress::ProgressHandle;
use crate::segmenter::ByteRange;
use crate::storage::SegmentStore;
use crate::transport::Transport;

use super::segment;

type SegmentResult = (usize, Result<u64, FetchError>);

/// Runs every range concurrently and returns once all have succeeded or the
/// first one has failed.
///
/// On the first failure the scope is cancelled so the remaining transfers
/// abort, and no further results are read. Every worker is joined before
/// returning, which guarantees that no sink handle is still in use when the
/// caller merges or removes the files.
pub(super) fn run_workers(
    transport: Arc<Transport>,
    ranges: &[ByteRange],
    store: &SegmentStore,
    progress: &ProgressHandle,
    scope: &CancelScope,
) -> Result<(), DownloadError> {
    let count = ranges.len();
    let (tx, rx) = mpsc::sync_channel::<SegmentResult>(count);
    let mut handles = Vec::with_capacity(count);
    let mut first_error: Option<DownloadError> = None;

    for (index, range) in ranges.iter().copied().enumerate() {
        let mut sink = match store.sink(index) {
            Ok(sink) => sink,
            Err(e) => {
                first_error = Some(DownloadError::Segment {
                    index,
                    source: FetchError::Storage(e),
                });
                scope.cancel();
                break;
            }
        };
        let tx = tx.clone();
        let transport = Arc::clone(&transport);
        let progress = progress.clone();
        let scope = scope.clone();
        handles.push(thread::spawn(move || {
            let counter = progress.counter();
            let res = segment::fetch_range(&transport, &range, &mut sink, counter, &scope);
            let segment = sink.index();
            let path = sink.path().display();
            match &res {
                Ok(n) => tracing::debug!(segment, %path, bytes = n, "range complete"),
                Err(e) if e.is_cancellation() => {
                    tracing::debug!(segment, %path, "range stopped: {}", e)
                }
                Err(e) => tracing::warn!(segment, %path, "range failed: {}", e),
            }
            drop(sink);
            let _ = tx.send((index, res));
        }));
    }
    drop(tx);

    if first_error.is_none() {
        let mut to_receive = count;
        while to_receive > 0 {
            let (index, res) = match rx.recv() {
                Ok(pair) => pair,
                Err(_) => {
                    first_error = Some(DownloadError::WorkerPanicked);
                    scope.cancel();
                    break;
                }
            };
            to_receive -= 1;
            if let Err(source) = res {
                scope.cancel();
                first_error = Some(DownloadError::Segment { index, source });
                break;
            }
        }
    }

    for h in handles {
        if h.join().is_err() && first_error.is_none() {
            first_error = Some(DownloadError::WorkerPanicked);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
