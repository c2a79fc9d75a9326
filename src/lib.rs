//! # rangefold
//!
//! Fetch a large CSV file over HTTP with parallel byte-range requests, then aggregate one
//! of its columns with parallel row-range scans.
//!
//! Both phases follow the same shape: **partition → fixed worker pool → ordered merge**.
//!
//! | Phase  | Partition             | Worker                   | Merge                            |
//! |--------|-----------------------|--------------------------|----------------------------------|
//! | fetch  | bytes `[0, size)`     | [`fetch::fetch_range`]   | concatenate segments in order    |
//! | reduce | data rows `[1, rows]` | [`reduce::reduce_range`] | add partial sums in range order  |
//!
//! ## Quick Start
//!
//! ```no_run
//! use rangefold::{Session, SessionConfig};
//!
//! # fn main() -> rangefold::Result<()> {
//! let mut session = Session::http("https://example.com/trips.csv", SessionConfig::default())?;
//! session.fetch(45)?;                                    // 45 parallel range requests
//! let avg = session.average_of_column("tip_amount", 16)?; // 16 parallel scans
//! println!("{} records, average tip {avg:.4}", session.state().total_record_count);
//! session.remove()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Partition plans
//! [`partition`] splits a total into `workers` equal, contiguous, inclusive ranges.
//! Byte ranges ([`ByteRange`]) and row ranges ([`RowRange`]) are distinct types. The
//! truncating split leaves `total % workers` units over; [`RemainderPolicy`] decides
//! whether they are dropped or folded into the last range.
//!
//! ### Sources
//! [`RangeSource`] abstracts "a resource with a size whose bytes can be read by range".
//! [`HttpSource`] implements it over HTTP (feature `http`), [`MemorySource`] in memory.
//!
//! ### Fetch
//! [`fetch::fetch_all`] downloads every range concurrently into its own segment file,
//! waits for all of them, and reassembles the destination in plan order
//! ([`fetch::fetch_sized`] skips the size probe when the size is already known). Workers count
//! `\n` bytes while streaming, giving a record count without a second pass.
//!
//! ### Reduce
//! [`reduce::reduce_all`] gives each worker a row range. Workers re-open the file, skip to
//! their first row, and sum the column, optionally filtered by a [`RowPredicate`].
//!
//! ### Sessions
//! [`Session`] ties both phases together: an idempotent fetch into a uniquely named temp
//! file, reductions against it, and explicit removal.
//!
//! ## Errors
//!
//! Every fallible call returns [`Result`] with the crate's [`Error`]. Nothing is retried;
//! the first failure of a phase is returned once all of its workers have finished.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (phase summaries at `info`, per-worker progress at
//! `debug`) and installs no subscriber of its own.
//!
//! ## Feature Flags
//!
//! - `http` (default) - [`HttpSource`] and [`Session::http`], backed by `reqwest`

pub mod config;
pub mod error;
pub mod fetch;
pub mod partition;
pub(crate) mod pool;
pub mod reduce;
pub mod session;
pub mod source;
pub mod testing;
pub mod timing;

// General re-exports
pub use config::{FetchConfig, RecordCount, ReduceConfig, SessionConfig};
pub use error::{Error, Result};
pub use fetch::{FetchReport, SegmentReport, fetch_all, fetch_range, fetch_sized};
pub use partition::{ByteRange, RemainderPolicy, RowRange};
pub use reduce::{PartialSum, ReduceReport, Row, RowPredicate, reduce_all, reduce_range};
pub use session::{AggregateState, Session};
pub use source::{MemorySource, RangeSource};
pub use timing::Stopwatch;

// Gated re-exports
#[cfg(feature = "http")]
pub use source::HttpSource;
