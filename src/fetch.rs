//! Partitioned parallel fetch.
//!
//! [`fetch_all`] probes the size of a [`RangeSource`], splits it into byte ranges, and has
//! one [`fetch_range`] worker per range stream its bytes into a dedicated segment file.
//! Once every worker has joined, the segments are concatenated **in plan order** into the
//! destination and deleted one by one.
//!
//! Each worker also counts the `\n` bytes it streamed. Their sum is the number of line
//! separators in the covered span, which is only an approximation of the number of data
//! records: it includes the header line, misses a final line without a trailing `\n`, and
//! says nothing about quoted fields spanning lines.

use crate::config::FetchConfig;
use crate::error::{Error, IoContext, Result};
use crate::partition::{ByteRange, byte_plan, covered};
use crate::pool::run_ordered;
use crate::source::RangeSource;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What one range worker wrote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentReport {
    /// Position of the range in the plan.
    pub index: usize,
    pub range: ByteRange,
    /// Bytes received; smaller than `range.len()` if the source ended early.
    pub bytes_written: u64,
    /// `\n` bytes seen in the segment.
    pub record_separators: u64,
}

/// Outcome of [`fetch_all`].
#[derive(Clone, Debug)]
pub struct FetchReport {
    /// The reassembled local file.
    pub path: PathBuf,
    /// Size announced by the source.
    pub total_size: u64,
    /// Bytes in the reassembled file.
    pub bytes_written: u64,
    /// Sum of per-segment `\n` counts.
    pub record_count: u64,
    /// Per-range results, in plan order.
    pub segments: Vec<SegmentReport>,
    pub elapsed: Duration,
}

/// File that is deleted on drop unless persisted.
///
/// Segment files and the partially written destination are held in these so that a
/// failing worker leaves nothing behind.
#[derive(Debug)]
pub(crate) struct ScratchFile {
    path: PathBuf,
    armed: bool,
}

impl ScratchFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file and hand back its path.
    pub(crate) fn persist(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    /// Delete the file now, reporting failure.
    pub(crate) fn remove(mut self) -> Result<()> {
        self.armed = false;
        fs::remove_file(&self.path).at(&self.path)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed scratch file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not remove scratch file");
            }
        }
    }
}

/// Path of segment `n` (1-based) for destination `dest`: `<dest>-<n>`.
#[must_use]
pub fn segment_path(dest: &Path, n: usize) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(format!("-{n}"));
    PathBuf::from(name)
}

/// Download one byte range into `dest`, `chunk_size` bytes at a time.
///
/// The body is never buffered whole: each chunk is written as soon as it arrives and its
/// `\n` bytes are counted on the way through.
///
/// # Errors
/// Any transport or status failure from the source, or an I/O failure on `dest`.
pub fn fetch_range(
    source: &dyn RangeSource,
    index: usize,
    range: ByteRange,
    dest: &Path,
    chunk_size: usize,
) -> Result<SegmentReport> {
    debug!(index, ?range, dest = %dest.display(), "range worker started");
    let mut body = source.open_range(range)?;
    let mut out = File::create(dest).at(dest)?;
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut bytes_written = 0u64;
    let mut record_separators = 0u64;

    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::Io {
                    path: PathBuf::from(source.location()),
                    source: e,
                });
            }
        };
        let chunk = &buf[..n];
        record_separators += chunk.iter().filter(|&&b| b == b'\n').count() as u64;
        out.write_all(chunk).at(dest)?;
        bytes_written += n as u64;
    }
    out.flush().at(dest)?;

    debug!(index, bytes_written, record_separators, "range worker finished");
    Ok(SegmentReport {
        index,
        range,
        bytes_written,
        record_separators,
    })
}

/// Append `src` to `out` through a fixed-size buffer.
fn append(src: &Path, out: &mut File, dest: &Path, buf: &mut [u8]) -> Result<u64> {
    let mut input = File::open(src).at(src)?;
    let mut copied = 0u64;
    loop {
        let n = match input.read(buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::Io {
                    path: src.to_path_buf(),
                    source: e,
                });
            }
        };
        out.write_all(&buf[..n]).at(dest)?;
        copied += n as u64;
    }
    Ok(copied)
}

/// Fetch the whole of `source` into `dest` using `config.workers` parallel range requests.
///
/// Steps: probe size, plan byte ranges, download every range into `<dest>-<i>` on a pool
/// of `config.workers` threads, wait for all of them, concatenate the segments in range
/// order into `dest` (deleting each once copied), and sum the per-segment `\n` counts.
///
/// Under [`RemainderPolicy::Drop`](crate::partition::RemainderPolicy::Drop) the
/// trailing `size % workers` bytes are not fetched.
///
/// # Errors
/// [`Error::EmptyResource`] if the source is empty, [`Error::InvalidWorkerCount`] if
/// `config.workers == 0`, and any worker's failure. On error no segment file is left
/// on disk and `dest` is removed.
pub fn fetch_all(
    source: &dyn RangeSource,
    dest: &Path,
    config: &FetchConfig,
) -> Result<FetchReport> {
    let total_size = source.probe_size()?;
    fetch_sized(source, total_size, dest, config)
}

/// [`fetch_all`] for a source whose size is already known, without probing it again.
///
/// # Errors
/// Same as [`fetch_all`].
pub fn fetch_sized(
    source: &dyn RangeSource,
    total_size: u64,
    dest: &Path,
    config: &FetchConfig,
) -> Result<FetchReport> {
    let started = Instant::now();
    if total_size == 0 {
        return Err(Error::EmptyResource(source.location().to_string()));
    }

    let plan = byte_plan(total_size, config.workers, config.remainder)?;
    info!(
        url = source.location(),
        total_size,
        ranges = plan.len(),
        covered = covered(&plan),
        "fetching"
    );

    let segments: Vec<ScratchFile> = (1..=plan.len())
        .map(|n| ScratchFile::new(segment_path(dest, n)))
        .collect();
    let jobs: Vec<(ByteRange, &Path)> = plan
        .iter()
        .copied()
        .zip(segments.iter().map(ScratchFile::path))
        .collect();

    let reports = run_ordered("range-fetch", config.workers, jobs, |index, (range, path)| {
        fetch_range(source, index, range, path, config.chunk_size)
    })?;

    let target = ScratchFile::new(dest.to_path_buf());
    let mut out = File::create(target.path()).at(dest)?;
    let mut buf = vec![0u8; config.copy_buffer.max(1)];
    let mut bytes_written = 0u64;
    for segment in segments {
        bytes_written += append(segment.path(), &mut out, dest, &mut buf)?;
        segment.remove()?;
    }
    out.flush().at(dest)?;
    drop(out);
    let path = target.persist();

    let record_count: u64 = reports.iter().map(|r| r.record_separators).sum();
    let elapsed = started.elapsed();
    info!(
        path = %path.display(),
        bytes_written,
        record_count,
        elapsed_ms = elapsed.as_millis() as u64,
        "fetch complete"
    );
    Ok(FetchReport {
        path,
        total_size,
        bytes_written,
        record_count,
        segments: reports,
        elapsed,
    })
}
