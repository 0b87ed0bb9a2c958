//! Writable end of one segment file.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Writes `data` to `out`, adding every byte the writer accepts to `counter`.
///
/// Counting happens per `write` call, so bytes taken by a write that is
/// followed by an error are still accounted.
pub fn write_counted<W: Write>(
    out: &mut W,
    mut data: &[u8],
    counter: &AtomicU64,
) -> io::Result<()> {
    while !data.is_empty() {
        match out.write(data) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "segment sink accepted no bytes",
                ))
            }
            Ok(n) => {
                counter.fetch_add(n as u64, Ordering::Relaxed);
                data = &data[n..];
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Handle a worker writes one range through. Dropping it closes the handle;
/// the store keeps its own handle for merge.
#[derive(Debug)]
pub struct SegmentSink {
    index: usize,
    path: PathBuf,
    file: File,
}

impl SegmentSink {
    pub(super) fn new(index: usize, path: PathBuf, file: File) -> Self {
        Self { index, path, file }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_counted(&mut self, data: &[u8], counter: &AtomicU64) -> io::Result<()> {
        write_counted(&mut self.file, data, counter)
    }
}
