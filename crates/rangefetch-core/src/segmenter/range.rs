//! Byte range type and range planning.

use crate::error::DownloadError;

/// Inclusive byte interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered (always at least 1).
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Range in the form curl's `CURLOPT_RANGE` expects (no `bytes=` prefix).
    pub(crate) fn curl_spec(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// Plans the ranges for a download of `content_length` bytes.
///
/// With `split` set and `workers > 1` the length is cut into `workers` ranges
/// of `content_length / workers` bytes, the last one absorbing the remainder.
/// Otherwise, a single range covers everything. Workers beyond one per byte
/// are dropped so that no range is empty.
///
/// Unknown or zero length is rejected: there is nothing to request a range of.
pub fn plan_ranges(
    content_length: Option<u64>,
    workers: usize,
    split: bool,
) -> Result<Vec<ByteRange>, DownloadError> {
    if workers == 0 {
        return Err(DownloadError::InvalidWorkers);
    }
    let size = match content_length {
        Some(n) if n > 0 => n,
        Some(_) => return Err(DownloadError::InvalidSize(0)),
        None => return Err(DownloadError::InvalidSize(-1)),
    };

    let count = if split && workers > 1 {
        (workers as u64).min(size)
    } else {
        1
    };
    let block = size / count;

    let ranges = (0..count)
        .map(|i| {
            let start = i * block;
            let end = if i == count - 1 {
                size - 1
            } else {
                (i + 1) * block - 1
            };
            ByteRange { start, end }
        })
        .collect();
    Ok(ranges)
}
