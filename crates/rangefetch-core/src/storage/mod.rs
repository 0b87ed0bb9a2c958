//! Segment files and their lifecycle.
//!
//! A ranged download writes range `i` to `<destination>.<i>` and concatenates
//! the files in index order once every range is in. A single-range download
//! writes straight to the destination. On failure the files are either removed
//! or only closed, depending on [`FailurePolicy`].

mod sink;

pub use sink::{write_counted, SegmentSink};

use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::FailurePolicy;

/// Path of segment `index`: appends `.<index>` to the destination
/// (`a.bin` → `a.bin.0`).
pub fn segment_path(destination: &Path, index: usize) -> PathBuf {
    let mut o = destination.as_os_str().to_owned();
    o.push(format!(".{}", index));
    PathBuf::from(o)
}

/// Open segment files of one task. Owned by the task until merge or cleanup.
#[derive(Debug)]
pub struct SegmentStore {
    destination: PathBuf,
    ranged: bool,
    /// `(path, handle)` in range order.
    segments: Vec<(PathBuf, File)>,
}

fn open_rw(path: &Path) -> io::Result<File> {
    File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

impl SegmentStore {
    /// Creates `count` segment files next to `destination` when `ranged`, or
    /// one file at `destination` otherwise. Existing files are truncated.
    /// If any file fails to open, the ones already created are removed.
    pub fn open(destination: &Path, count: usize, ranged: bool) -> io::Result<Self> {
        let paths: Vec<PathBuf> = if ranged {
            (0..count).map(|i| segment_path(destination, i)).collect()
        } else {
            vec![destination.to_path_buf()]
        };

        let mut segments = Vec::with_capacity(paths.len());
        for path in paths {
            match open_rw(&path) {
                Ok(file) => segments.push((path, file)),
                Err(e) => {
                    tracing::debug!(path = %path.display(), "segment open failed: {}", e);
                    let partial = SegmentStore {
                        destination: destination.to_path_buf(),
                        ranged,
                        segments,
                    };
                    partial.cleanup();
                    return Err(e);
                }
            }
        }

        Ok(Self {
            destination: destination.to_path_buf(),
            ranged,
            segments,
        })
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn is_ranged(&self) -> bool {
        self.ranged
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.segments.iter().map(|(p, _)| p.as_path())
    }

    /// A separate write handle for segment `index`, for the worker that owns the range.
    pub fn sink(&self, index: usize) -> io::Result<SegmentSink> {
        let (path, file) = self.segments.get(index).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no segment {} (store has {})", index, self.segments.len()),
            )
        })?;
        Ok(SegmentSink::new(index, path.clone(), file.try_clone()?))
    }

    /// Concatenates the segments into the destination in index order, then
    /// removes the segment files. A single-file store is already the
    /// destination, so this only closes it.
    pub fn merge(self) -> io::Result<PathBuf> {
        if !self.ranged {
            return Ok(self.destination);
        }

        let mut out = File::create(&self.destination)?;
        let mut copied = 0u64;
        for (path, file) in &self.segments {
            let mut reader: &File = file;
            reader.seek(SeekFrom::Start(0))?;
            let n = io::copy(&mut reader, &mut out)?;
            tracing::trace!(segment = %path.display(), bytes = n, "merged segment");
            copied += n;
        }
        out.flush()?;
        tracing::debug!(
            destination = %self.destination.display(),
            bytes = copied,
            segments = self.segments.len(),
            "merge complete"
        );

        let SegmentStore {
            destination,
            segments,
            ..
        } = self;
        remove_all(segments);
        Ok(destination)
    }

    /// Closes every handle and removes every segment file. In single-file
    /// mode that file is the incomplete destination, so it goes too.
    pub fn cleanup(self) {
        remove_all(self.segments);
    }

    /// Closes every handle and leaves the files on disk.
    pub fn close(self) {
        tracing::debug!(
            destination = %self.destination.display(),
            segments = self.segments.len(),
            "segment files retained"
        );
        drop(self.segments);
    }

    /// `cleanup` or `close`, as the policy says.
    pub fn discard(self, policy: FailurePolicy) {
        match policy {
            FailurePolicy::Delete => self.cleanup(),
            FailurePolicy::Retain => self.close(),
        }
    }
}

fn remove_all(segments: Vec<(PathBuf, File)>) {
    for (path, file) in segments {
        drop(file);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), "could not remove segment file: {}", e)
            }
        }
    }
}
