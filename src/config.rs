//! Configuration for the fetch and reduce phases.
//!
//! Everything the orchestrators need is passed in explicitly; there is no ambient state.
//! All types deserialize with per-field defaults, so a JSON file only has to name the
//! settings it changes:
//!
//! ```
//! use rangefold::SessionConfig;
//!
//! let cfg: SessionConfig = serde_json::from_str(r#"{ "fetch": { "workers": 45 } }"#).unwrap();
//! assert_eq!(cfg.fetch.workers, 45);
//! assert_eq!(cfg.fetch.chunk_size, 16 * 1024);
//! ```

use crate::error::{Error, IoContext, Result};
use crate::partition::RemainderPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Bytes read from the network per chunk by each range worker.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Buffer used when concatenating segment files into the final file.
pub const DEFAULT_COPY_BUFFER: usize = 10 * 1024 * 1024;

fn default_fetch_workers() -> usize {
    2 * num_cpus::get().max(2)
}

fn default_reduce_workers() -> usize {
    num_cpus::get().max(1)
}

/// Settings for [`fetch_all`](crate::fetch::fetch_all).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Number of byte ranges, and of pool threads downloading them.
    pub workers: usize,
    /// Network read size per chunk.
    pub chunk_size: usize,
    /// Copy buffer used during reassembly.
    pub copy_buffer: usize,
    pub remainder: RemainderPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: default_fetch_workers(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            copy_buffer: DEFAULT_COPY_BUFFER,
            remainder: RemainderPolicy::default(),
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_copy_buffer(mut self, copy_buffer: usize) -> Self {
        self.copy_buffer = copy_buffer;
        self
    }

    #[must_use]
    pub fn with_remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }
}

/// Settings for [`reduce_all`](crate::reduce::reduce_all).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceConfig {
    /// Number of row ranges, and of pool threads scanning them.
    pub workers: usize,
    pub remainder: RemainderPolicy,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            workers: default_reduce_workers(),
            remainder: RemainderPolicy::default(),
        }
    }
}

impl ReduceConfig {
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_remainder(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }
}

/// Where a session takes the record count used as the average's denominator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCount {
    /// Count data rows of the reassembled file after the fetch (header excluded).
    #[default]
    Exact,
    /// Use the `\n` bytes counted while streaming the ranges. Includes the header line
    /// and is only approximate when records are split across ranges.
    Separators,
}

/// Settings for a [`Session`](crate::session::Session).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub fetch: FetchConfig,
    pub reduce: ReduceConfig,
    /// Directory for the local file; the platform temp dir when unset.
    pub temp_dir: Option<PathBuf>,
    pub record_count: RecordCount,
}

impl SessionConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    ///
    /// # Errors
    /// [`Error::Io`] if the file cannot be read, [`Error::Config`] if it is not valid JSON
    /// for this type.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).at(path)?;
        serde_json::from_str(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_record_count(mut self, record_count: RecordCount) -> Self {
        self.record_count = record_count;
        self
    }

    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    #[must_use]
    pub fn with_reduce(mut self, reduce: ReduceConfig) -> Self {
        self.reduce = reduce;
        self
    }

    /// Directory new local files are created in.
    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

