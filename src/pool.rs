//! Fixed-size worker pool with ordered merge.
//!
//! Both phases hand a plan to [`run_ordered`]: every plan entry becomes one task on a
//! dedicated rayon pool of exactly `workers` threads, the caller blocks until all tasks
//! have finished, and results come back in plan order regardless of completion order.

use crate::error::Result;
use rayon::prelude::*;

/// Run `task(index, item)` for every item on a pool of `workers` threads.
///
/// The returned vector is indexed like `items`. The first error (in plan order) is
/// returned once the pool has drained.
pub(crate) fn run_ordered<I, T, F>(
    name: &str,
    workers: usize,
    items: Vec<I>,
    task: F,
) -> Result<Vec<T>>
where
    I: Send,
    T: Send,
    F: Fn(usize, I) -> Result<T> + Send + Sync,
{
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let prefix = name.to_string();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(move |i| format!("{prefix}-{i}"))
        .build()?;

    pool.install(|| {
        items
            .into_par_iter()
            .with_max_len(1) // one plan entry per task
            .enumerate()
            .map(|(idx, item)| task(idx, item))
            .collect::<Vec<Result<T>>>()
    })
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::time::Duration;

    #[test]
    fn results_follow_input_order() {
        // later items finish first
        let out = run_ordered("t", 4, vec![40u64, 30, 20, 10], |idx, ms| {
            std::thread::sleep(Duration::from_millis(ms));
            Ok((idx, ms))
        })
        .unwrap();
        assert_eq!(out, vec![(0, 40), (1, 30), (2, 20), (3, 10)]);
    }

    #[test]
    fn every_task_runs_before_an_error_is_returned() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let ran = AtomicUsize::new(0);
        let res = run_ordered("t", 3, vec![0, 1, 2], |idx, _| {
            ran.fetch_add(1, Ordering::SeqCst);
            if idx == 0 {
                Err(Error::InvalidWorkerCount)
            } else {
                Ok(idx)
            }
        });
        assert!(matches!(res, Err(Error::InvalidWorkerCount)));
        assert_eq!(ran.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn empty_input_builds_no_pool() {
        let out: Vec<u8> = run_ordered("t", 0, Vec::<u8>::new(), |_, x| Ok(x)).unwrap();
        assert!(out.is_empty());
    }
}
