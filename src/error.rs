//! Error type shared by the fetch and reduce phases.
//!
//! Every failure is fatal for the phase that raised it: nothing here is retried or
//! recovered locally. A short read (a worker reaching end-of-file before its range ends)
//! is *not* an error and never shows up as a variant; it is reported through the smaller
//! counts carried by the worker results instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by partition planning, range fetching and row reduction.
#[derive(Error, Debug)]
pub enum Error {
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("remote resource {0} is empty")]
    EmptyResource(String),

    #[error("no local file has been fetched yet")]
    NotFetched,

    #[error("local file {0} holds no records")]
    NoRecords(PathBuf),

    #[error("could not read a content length for {0}")]
    MissingContentLength(String),

    #[error("column {column:?} not found in header of {path}")]
    UnknownColumn { column: String, path: PathBuf },

    #[cfg(feature = "http")]
    #[error("network request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("{url} ignored the range request for bytes {start}-{end}")]
    RangeNotHonored { url: String, start: u64, end: u64 },

    #[error("row {row}: cannot parse {value:?} in column {column:?} as a number")]
    ParseValue {
        row: u64,
        column: String,
        value: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attach a path to an I/O error.
pub(crate) trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
