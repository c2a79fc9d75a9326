//! Partition planning over byte space and row space.
//!
//! A plan splits `total` units into `workers` equal, contiguous, inclusive ranges. The
//! order of the returned ranges is load-bearing: the fetch phase concatenates segment
//! files in exactly this order.
//!
//! [`plan`] divides with truncation and leaves the remainder (`total % workers`)
//! uncovered. [`plan_with`] takes a [`RemainderPolicy`] so callers can close that gap by
//! stretching the final range to the true end of the space.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Marker for ranges over the bytes of a remote resource (0-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Bytes;

/// Marker for ranges over the data rows of a local file (1-based, header excluded).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rows;

/// Index space a [`Range`] lives in.
pub trait Space: Copy + fmt::Debug + Send + Sync + 'static {
    /// Index of the first unit.
    const BASE: u64;
}

impl Space for Bytes {
    const BASE: u64 = 0;
}

impl Space for Rows {
    const BASE: u64 = 1;
}

/// Inclusive `[start, end]` range tagged with the space it indexes.
///
/// Byte ranges and row ranges share the representation but are distinct types, so one
/// can never be handed to a consumer of the other.
pub struct Range<S> {
    pub start: u64,
    pub end: u64,
    _space: PhantomData<S>,
}

pub type ByteRange = Range<Bytes>;
pub type RowRange = Range<Rows>;

impl<S> Range<S> {
    /// Build an inclusive range.
    ///
    /// # Panics
    /// If `start > end`.
    #[must_use]
    pub fn new(start: u64, end: u64) -> Self {
        assert!(start <= end, "range start {start} is past end {end}");
        Self {
            start,
            end,
            _space: PhantomData,
        }
    }

    /// Number of units covered (always at least 1).
    #[must_use]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

impl ByteRange {
    /// Value for an HTTP `Range` header.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl<S> Clone for Range<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Range<S> {}

impl<S> PartialEq for Range<S> {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end
    }
}

impl<S> Eq for Range<S> {}

impl<S> fmt::Debug for Range<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// What to do with the `total % workers` units a truncating split leaves over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Leave the remainder uncovered; downstream consumers never see it.
    Drop,
    /// Stretch the last range to the end of the space so the plan covers `total` exactly.
    #[default]
    ExtendLast,
}

/// Split `total` units into `workers` ranges, dropping the remainder.
///
/// Equivalent to [`plan_with`] under [`RemainderPolicy::Drop`].
///
/// # Errors
/// [`Error::InvalidWorkerCount`] when `workers == 0`.
pub fn plan<S: Space>(total: u64, workers: usize) -> Result<Vec<Range<S>>> {
    plan_with(total, workers, RemainderPolicy::Drop)
}

/// Split `total` units into `workers` contiguous ranges starting at `S::BASE`.
///
/// `chunk = total / workers`; range `i` is `[BASE + i*chunk, BASE + (i+1)*chunk - 1]`.
/// If `total < workers` the worker count is clamped to `total` so no range is empty;
/// `total == 0` yields an empty plan.
///
/// # Errors
/// [`Error::InvalidWorkerCount`] when `workers == 0`.
pub fn plan_with<S: Space>(
    total: u64,
    workers: usize,
    remainder: RemainderPolicy,
) -> Result<Vec<Range<S>>> {
    if workers == 0 {
        return Err(Error::InvalidWorkerCount);
    }
    let parts = (workers as u64).min(total);
    if parts == 0 {
        return Ok(Vec::new());
    }
    let chunk = total / parts;

    let mut out: Vec<Range<S>> = (0..parts)
        .map(|i| {
            let start = S::BASE + i * chunk;
            Range::new(start, start + chunk - 1)
        })
        .collect();

    if remainder == RemainderPolicy::ExtendLast
        && let Some(last) = out.last_mut()
    {
        last.end = S::BASE + total - 1;
    }
    Ok(out)
}

/// Plan over the bytes `[0, total)` of a resource.
///
/// # Errors
/// See [`plan_with`].
pub fn byte_plan(total: u64, workers: usize, remainder: RemainderPolicy) -> Result<Vec<ByteRange>> {
    plan_with(total, workers, remainder)
}

/// Plan over the data rows `[1, total]` of a file.
///
/// # Errors
/// See [`plan_with`].
pub fn row_plan(total: u64, workers: usize, remainder: RemainderPolicy) -> Result<Vec<RowRange>> {
    plan_with(total, workers, remainder)
}

/// Total units covered by a plan.
#[must_use]
pub fn covered<S>(plan: &[Range<S>]) -> u64 {
    plan.iter().map(Range::len).sum()
}
