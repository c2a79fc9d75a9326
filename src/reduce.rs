//! Partitioned parallel reduction over one CSV column.
//!
//! [`reduce_all`] splits `[1, total_rows]` into row ranges and runs one [`reduce_range`]
//! worker per range. Workers share nothing: each opens the file on its own, parses and
//! discards the rows before its range, then sums the column over its range. Partials are
//! merged by addition in plan order.
//!
//! Skipping re-parses every earlier row, so the whole phase reads
//! `O(workers * total_rows)` rows in the worst case. Seeking by byte offset would not be
//! safe anyway: a quoted field may contain line breaks.
//!
//! # Example
//!
//! ```no_run
//! use rangefold::ReduceConfig;
//! use rangefold::reduce::{reduce_all, Row, RowPredicate};
//!
//! # fn main() -> rangefold::Result<()> {
//! let cfg = ReduceConfig::default().with_workers(16);
//! let cash_only: &dyn RowPredicate = &|_: u64, row: &Row| row.get("payment_type") == Some("2");
//! let report = reduce_all("trips.csv", "tip_amount", 10_906_858, &cfg, Some(cash_only))?;
//! println!("sum = {}", report.sum);
//! # Ok(())
//! # }
//! ```

use crate::config::ReduceConfig;
use crate::error::{Error, IoContext, Result};
use crate::partition::{RowRange, covered, row_plan};
use crate::pool::run_ordered;
use csv::StringRecord;
use std::fs::File;
use std::io::BufReader;
use std::ops::AddAssign;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A data row together with the header that names its fields.
#[derive(Clone, Debug)]
pub struct Row {
    headers: Arc<StringRecord>,
    record: StringRecord,
}

impl Row {
    fn new(headers: Arc<StringRecord>) -> Self {
        Self {
            headers,
            record: StringRecord::new(),
        }
    }

    /// Cell under header `column`, if the header has it.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.record.get(idx)
    }

    /// Cell at position `idx`.
    #[must_use]
    pub fn field(&self, idx: usize) -> Option<&str> {
        self.record.get(idx)
    }

    #[must_use]
    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    #[must_use]
    pub fn record(&self) -> &StringRecord {
        &self.record
    }
}

/// Row filter applied before a cell is accumulated.
///
/// Receives the 1-based data row index and the row. Any
/// `Fn(u64, &Row) -> bool + Send + Sync` closure is a predicate.
pub trait RowPredicate: Send + Sync {
    fn accept(&self, row_index: u64, row: &Row) -> bool;
}

impl<F> RowPredicate for F
where
    F: Fn(u64, &Row) -> bool + Send + Sync,
{
    fn accept(&self, row_index: u64, row: &Row) -> bool {
        self(row_index, row)
    }
}

/// Predicate that accepts every row.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

impl RowPredicate for AcceptAll {
    fn accept(&self, _row_index: u64, _row: &Row) -> bool {
        true
    }
}

/// Partial aggregate produced by one row worker.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PartialSum {
    pub sum: f64,
    /// Rows iterated inside the range; less than the range length near end of file.
    pub rows_consumed: u64,
    /// Cells that were non-empty, accepted by the predicate, and added to `sum`.
    pub values_added: u64,
}

impl AddAssign for PartialSum {
    fn add_assign(&mut self, other: Self) {
        self.sum += other.sum;
        self.rows_consumed += other.rows_consumed;
        self.values_added += other.values_added;
    }
}

/// Outcome of [`reduce_all`].
#[derive(Clone, Debug)]
pub struct ReduceReport {
    pub sum: f64,
    pub rows_consumed: u64,
    pub values_added: u64,
    /// Per-range partials, in plan order.
    pub partials: Vec<(RowRange, PartialSum)>,
    pub elapsed: Duration,
}

impl ReduceReport {
    /// Mean over the cells that were actually added, if any were.
    #[must_use]
    pub fn mean_of_values(&self) -> Option<f64> {
        (self.values_added > 0).then(|| self.sum / self.values_added as f64)
    }
}

/// Parse a cell as `f64`, ignoring surrounding whitespace.
#[must_use]
pub fn parse_value(cell: &str) -> Option<f64> {
    cell.trim().parse().ok()
}

fn open_csv(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let f = File::open(path).at(path)?;
    // short rows read as empty trailing cells
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(f)))
}

/// Sum `column` over the data rows in `range` (1-based, inclusive).
///
/// Opens `path`, reads the header, parses and discards `range.start - 1` rows, then for
/// each row up to `range.end` adds the cell when it is non-empty and `predicate` (if
/// any) accepts the row. A row too short to reach `column` counts as an empty cell.
/// Reaching end of file early is not an error; the scan stops and `rows_consumed` tells
/// how far it got.
///
/// # Errors
/// [`Error::UnknownColumn`] if the header lacks `column`, [`Error::ParseValue`] for a
/// non-empty accepted cell that is not a number, and CSV or I/O failures.
pub fn reduce_range(
    path: impl AsRef<Path>,
    column: &str,
    range: RowRange,
    predicate: Option<&dyn RowPredicate>,
) -> Result<PartialSum> {
    let path = path.as_ref();
    let predicate = predicate.unwrap_or(&AcceptAll);
    let mut rdr = open_csv(path)?;
    let headers = Arc::new(rdr.headers()?.clone());
    let col = headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| Error::UnknownColumn {
            column: column.to_string(),
            path: path.to_path_buf(),
        })?;

    let mut row = Row::new(headers);
    for _ in 1..range.start {
        if !rdr.read_record(&mut row.record)? {
            debug!(?range, "end of file before range start");
            return Ok(PartialSum::default());
        }
    }

    let mut acc = PartialSum::default();
    let mut row_index = range.start;
    while row_index <= range.end {
        if !rdr.read_record(&mut row.record)? {
            break;
        }
        let cell = row.record.get(col).unwrap_or("");
        if !cell.is_empty() && predicate.accept(row_index, &row) {
            let value = parse_value(cell).ok_or_else(|| Error::ParseValue {
                row: row_index,
                column: column.to_string(),
                value: cell.to_string(),
            })?;
            acc.sum += value;
            acc.values_added += 1;
        }
        row_index += 1;
    }
    acc.rows_consumed = row_index - range.start;
    debug!(?range, sum = acc.sum, rows = acc.rows_consumed, "row worker finished");
    Ok(acc)
}

/// Sum `column` over rows `[1, total_rows]` of `path` with `config.workers` parallel scans.
///
/// Under [`RemainderPolicy::Drop`](crate::partition::RemainderPolicy::Drop) the trailing
/// `total_rows % workers` rows are not visited.
///
/// # Errors
/// [`Error::InvalidWorkerCount`] if `config.workers == 0`, and the first worker failure in
/// plan order.
pub fn reduce_all(
    path: impl AsRef<Path>,
    column: &str,
    total_rows: u64,
    config: &ReduceConfig,
    predicate: Option<&dyn RowPredicate>,
) -> Result<ReduceReport> {
    let started = Instant::now();
    let path = path.as_ref();
    let plan = row_plan(total_rows, config.workers, config.remainder)?;
    info!(
        path = %path.display(),
        column,
        total_rows,
        ranges = plan.len(),
        covered = covered(&plan),
        "reducing"
    );

    let partials = run_ordered("row-reduce", config.workers, plan.clone(), |_, range| {
        reduce_range(path, column, range, predicate)
    })?;

    let mut total = PartialSum::default();
    for p in &partials {
        total += *p;
    }
    let elapsed = started.elapsed();
    info!(
        sum = total.sum,
        rows_consumed = total.rows_consumed,
        elapsed_ms = elapsed.as_millis() as u64,
        "reduce complete"
    );
    Ok(ReduceReport {
        sum: total.sum,
        rows_consumed: total.rows_consumed,
        values_added: total.values_added,
        partials: plan.into_iter().zip(partials).collect(),
        elapsed,
    })
}

/// Number of data rows in a CSV file with a header.
///
/// # Errors
/// CSV or I/O failures.
pub fn count_rows(path: impl AsRef<Path>) -> Result<u64> {
    let mut rdr = open_csv(path.as_ref())?;
    let mut record = StringRecord::new();
    let mut total = 0u64;
    while rdr.read_record(&mut record)? {
        total += 1;
    }
    Ok(total)
}
