//! In-memory range source.

use crate::error::{Error, Result};
use crate::partition::ByteRange;
use crate::source::{RangeBody, RangeSource};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Byte buffer served with HTTP range semantics.
///
/// Clones share the buffer and the request counters, so a test can hand one clone to a
/// session and inspect the other afterwards.
///
/// # Example
///
/// ```
/// use rangefold::source::{MemorySource, RangeSource};
/// use rangefold::partition::ByteRange;
/// use std::io::Read;
///
/// let src = MemorySource::new("mem://greeting", b"hello world".to_vec());
/// assert_eq!(src.probe_size().unwrap(), 11);
///
/// let mut body = String::new();
/// src.open_range(ByteRange::new(6, 10)).unwrap().read_to_string(&mut body).unwrap();
/// assert_eq!(body, "world");
/// ```
#[derive(Clone, Debug)]
pub struct MemorySource {
    location: String,
    data: Arc<[u8]>,
    honor_ranges: bool,
    fail_at: Option<u64>,
    probes: Arc<AtomicUsize>,
    range_requests: Arc<AtomicUsize>,
}

impl MemorySource {
    pub fn new(location: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let data: Vec<u8> = data.into();
        Self {
            location: location.into(),
            data: Arc::from(data),
            honor_ranges: true,
            fail_at: None,
            probes: Arc::new(AtomicUsize::new(0)),
            range_requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer every range request with the whole buffer, like a server without range support.
    #[must_use]
    pub fn ignoring_ranges(mut self) -> Self {
        self.honor_ranges = false;
        self
    }

    /// Fail any range request that starts at byte `start` with a `503` status.
    #[must_use]
    pub fn failing_at(mut self, start: u64) -> Self {
        self.fail_at = Some(start);
        self
    }

    /// Size probes served so far.
    #[must_use]
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Range requests served so far (including failed ones).
    #[must_use]
    pub fn range_requests(&self) -> usize {
        self.range_requests.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Shared-buffer slice that can be moved into a `'static` reader.
struct SharedSlice {
    data: Arc<[u8]>,
    start: usize,
    end: usize,
}

impl AsRef<[u8]> for SharedSlice {
    fn as_ref(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }
}

impl RangeSource for MemorySource {
    fn location(&self) -> &str {
        &self.location
    }

    fn probe_size(&self) -> Result<u64> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.len() as u64)
    }

    fn open_range(&self, range: ByteRange) -> Result<RangeBody> {
        self.range_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(range.start) {
            return Err(Error::Status {
                url: self.location.clone(),
                status: 503,
            });
        }
        let len = self.data.len() as u64;
        if !self.honor_ranges {
            if range.start == 0 && range.len() == len {
                return Ok(Box::new(Cursor::new(SharedSlice {
                    data: Arc::clone(&self.data),
                    start: 0,
                    end: self.data.len(),
                })));
            }
            return Err(Error::RangeNotHonored {
                url: self.location.clone(),
                start: range.start,
                end: range.end,
            });
        }
        if range.start >= len {
            // 416 Range Not Satisfiable
            return Err(Error::Status {
                url: self.location.clone(),
                status: 416,
            });
        }
        // Servers clamp an end past the last byte.
        let end = range.end.min(len - 1);
        Ok(Box::new(Cursor::new(SharedSlice {
            data: Arc::clone(&self.data),
            start: range.start as usize,
            end: end as usize + 1,
        })))
    }
}
