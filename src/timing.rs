//! Explicit start/stop timing.

use std::time::{Duration, Instant};

/// Wall-clock span bracketed by [`start`](Stopwatch::start) and [`stop`](Stopwatch::stop).
///
/// ```
/// use rangefold::Stopwatch;
///
/// let mut sw = Stopwatch::new();
/// sw.start();
/// sw.stop();
/// assert!(sw.elapsed() < std::time::Duration::from_secs(1));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Stopwatch {
    started: Option<Instant>,
    stopped: Option<Instant>,
}

impl Stopwatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the span.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
        self.stopped = None;
    }

    /// Close the span. No effect before `start`.
    pub fn stop(&mut self) {
        if self.started.is_some() {
            self.stopped = Some(Instant::now());
        }
    }

    /// Length of the span; measured up to now while running, zero if never started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match (self.started, self.stopped) {
            (Some(start), Some(stop)) => stop.duration_since(start),
            (Some(start), None) => start.elapsed(),
            (None, _) => Duration::ZERO,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.started.is_some() && self.stopped.is_none()
    }
}
