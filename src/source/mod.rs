//! Remote resources that can be read by byte range.
//!
//! [`RangeSource`] is the seam between the fetch phase and the network. It is synchronous:
//! range workers run on plain pool threads and block on their reads.
//!
//! - [`HttpSource`] speaks HTTP: a `HEAD` probe for `Content-Length` and `GET` requests
//!   carrying a `Range: bytes=start-end` header (feature `http`).
//! - [`MemorySource`] serves an in-memory buffer with the same semantics, for tests and
//!   for local data.

#[cfg(feature = "http")]
pub mod http;
pub mod memory;

#[cfg(feature = "http")]
pub use http::HttpSource;
pub use memory::MemorySource;

use crate::error::Result;
use crate::partition::ByteRange;
use std::io::Read;

/// Body of a range response, consumed incrementally.
pub type RangeBody = Box<dyn Read + Send>;

/// A resource with a known size whose bytes can be requested by inclusive range.
pub trait RangeSource: Send + Sync {
    /// Human-readable location, used in logs and errors.
    fn location(&self) -> &str;

    /// Total size in bytes, from a metadata probe.
    ///
    /// # Errors
    /// Transport failures, or a response without a usable content length.
    fn probe_size(&self) -> Result<u64>;

    /// Open a stream over exactly the bytes of `range`.
    ///
    /// # Errors
    /// Transport failures, unsuccessful statuses, or a source that ignores the range.
    fn open_range(&self, range: ByteRange) -> Result<RangeBody>;
}
