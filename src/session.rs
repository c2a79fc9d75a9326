//! A fetch-then-reduce session over one remote CSV file.
//!
//! [`Session`] owns the local copy of the resource and the [`AggregateState`] both phases
//! feed. The fetch runs at most once per session; reductions can run any number of times
//! against the local file until [`Session::remove`] deletes it.
//!
//! ```no_run
//! use rangefold::{Session, SessionConfig};
//!
//! # fn main() -> rangefold::Result<()> {
//! let mut session = Session::http(
//!     "https://example.com/data/yellow_tripdata_2016-01.csv",
//!     SessionConfig::default(),
//! )?;
//! session.fetch(45)?;
//! let avg = session.average_of_column("tip_amount", 16)?;
//! println!("average tip: {avg}");
//! session.remove()?;
//! # Ok(())
//! # }
//! ```

use crate::config::{RecordCount, SessionConfig};
use crate::error::{Error, IoContext, Result};
use crate::fetch::{FetchReport, fetch_sized};
use crate::reduce::{ReduceReport, RowPredicate, count_rows, reduce_all};
use crate::source::RangeSource;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// State accumulated across the fetch and reduce phases.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregateState {
    /// Local file, once fetched.
    pub file_name: Option<PathBuf>,
    /// Record count used as the average's denominator.
    pub total_record_count: u64,
    /// Sum from the most recent reduction.
    pub sum: f64,
}

/// One remote resource, its local copy, and the aggregates computed over it.
#[derive(Debug)]
pub struct Session<S> {
    source: S,
    config: SessionConfig,
    size: Option<u64>,
    state: AggregateState,
    last_fetch: Option<FetchReport>,
}

#[cfg(feature = "http")]
impl Session<crate::source::HttpSource> {
    /// Session over an HTTP URL.
    ///
    /// # Errors
    /// If the HTTP client cannot be built.
    pub fn http(url: impl Into<String>, config: SessionConfig) -> Result<Self> {
        Ok(Self::new(crate::source::HttpSource::new(url)?, config))
    }
}

impl<S: RangeSource> Session<S> {
    pub fn new(source: S, config: SessionConfig) -> Self {
        Self {
            source,
            config,
            size: None,
            state: AggregateState::default(),
            last_fetch: None,
        }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    /// Report of the fetch that produced the current local file.
    #[must_use]
    pub fn last_fetch(&self) -> Option<&FetchReport> {
        self.last_fetch.as_ref()
    }

    /// Size of the remote resource in bytes. Probed once, then cached.
    ///
    /// # Errors
    /// Transport failures from the probe.
    pub fn probe_size(&mut self) -> Result<u64> {
        if let Some(size) = self.size {
            return Ok(size);
        }
        let size = self.source.probe_size()?;
        self.size = Some(size);
        Ok(size)
    }

    #[must_use]
    pub fn is_fetched(&self) -> bool {
        self.state.file_name.is_some()
    }

    /// Local file path, once fetched.
    #[must_use]
    pub fn local_file(&self) -> Option<&Path> {
        self.state.file_name.as_deref()
    }

    /// Download the resource with `workers` parallel range requests.
    ///
    /// Returns immediately with the existing file when the session already fetched it.
    /// The size comes from [`probe_size`](Self::probe_size), so a size probed earlier is
    /// reused rather than requested again.
    ///
    /// # Errors
    /// Any failure of [`fetch_sized`], or of the exact row count afterwards.
    pub fn fetch(&mut self, workers: usize) -> Result<&Path> {
        if self.state.file_name.is_none() {
            let dest = self
                .config
                .temp_dir()
                .join(format!("{}.csv", Uuid::new_v4()));
            info!(path = %dest.display(), "local file for download");
            let total_size = self.probe_size()?;
            let fetch_cfg = self.config.fetch.clone().with_workers(workers);
            let report = fetch_sized(&self.source, total_size, &dest, &fetch_cfg)?;

            let total_record_count = match self.config.record_count {
                RecordCount::Separators => report.record_count,
                RecordCount::Exact => match count_rows(&report.path) {
                    Ok(n) => n,
                    Err(e) => {
                        // the file is not tracked yet, so nothing else would remove it
                        if let Err(rm) = fs::remove_file(&report.path) {
                            warn!(
                                path = %report.path.display(),
                                error = %rm,
                                "could not remove local file after failed count"
                            );
                        }
                        return Err(e);
                    }
                },
            };
            info!(total_record_count, policy = ?self.config.record_count, "record count");

            self.size = Some(report.total_size);
            self.state = AggregateState {
                file_name: Some(report.path.clone()),
                total_record_count,
                sum: 0.0,
            };
            self.last_fetch = Some(report);
        }
        self.local_file().ok_or(Error::NotFetched)
    }

    /// Sum `column` over the session's records with `workers` parallel scans.
    ///
    /// # Errors
    /// [`Error::NotFetched`] before [`fetch`](Self::fetch), and any failure of [`reduce_all`].
    pub fn sum_column(
        &mut self,
        column: &str,
        workers: usize,
        predicate: Option<&dyn RowPredicate>,
    ) -> Result<ReduceReport> {
        let path = self.state.file_name.as_deref().ok_or(Error::NotFetched)?;
        let reduce_cfg = self.config.reduce.clone().with_workers(workers);
        let report = reduce_all(
            path,
            column,
            self.state.total_record_count,
            &reduce_cfg,
            predicate,
        )?;
        self.state.sum = report.sum;
        Ok(report)
    }

    /// Average of `column`: the reduced sum divided by the session record count.
    ///
    /// Empty cells count toward the denominator but add nothing to the sum.
    ///
    /// # Errors
    /// [`Error::NotFetched`] before [`fetch`](Self::fetch), [`Error::NoRecords`] when the
    /// record count is zero, and any failure of [`reduce_all`].
    pub fn average_of_column(&mut self, column: &str, workers: usize) -> Result<f64> {
        let path = self.state.file_name.clone().ok_or(Error::NotFetched)?;
        if self.state.total_record_count == 0 {
            return Err(Error::NoRecords(path));
        }
        let report = self.sum_column(column, workers, None)?;
        Ok(report.sum / self.state.total_record_count as f64)
    }

    /// Delete the local file. Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    /// If the file exists but cannot be removed.
    pub fn remove(&mut self) -> Result<bool> {
        let Some(path) = self.state.file_name.clone() else {
            return Ok(false);
        };
        fs::remove_file(&path).at(&path)?;
        info!(path = %path.display(), "removed local file");
        self.state = AggregateState::default();
        self.last_fetch = None;
        Ok(true)
    }
}
