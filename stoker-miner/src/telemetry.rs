//! Windowed hashrate measurement from hardware results.
//!
//! Every result that clears its job's difficulty mask represents, on
//! average, `difficulty x 2^32` hashes of search effort. The estimator
//! accumulates those weights in a sliding time window and divides by the
//! span from the oldest sample to now, so the estimate is usable shortly
//! after startup and declines naturally when results stop arriving.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Window the pacing controller asks about.
const WINDOW: Duration = Duration::from_secs(600);

/// Below two samples a span is meaningless and the estimate reads zero,
/// which callers treat as "no data".
const MIN_SAMPLES: usize = 2;

/// Measured hashrate over a sliding window of accepted results.
pub struct HashrateEstimator {
    window: Duration,
    max_samples: usize,
    samples: VecDeque<(Instant, u64)>,
    total_difficulty: u64,
}

impl HashrateEstimator {
    /// Estimator over the standard 10-minute window.
    pub fn new() -> Self {
        Self::with_window(WINDOW)
    }

    /// Estimator with an explicit window.
    ///
    /// Capacity is bounded at 10 samples per window second on top of the
    /// time-based pruning.
    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            max_samples: (window.as_secs() as usize).saturating_mul(10).max(MIN_SAMPLES),
            samples: VecDeque::new(),
            total_difficulty: 0,
        }
    }

    /// Record a result of the given mask difficulty at the current time.
    pub fn record(&mut self, difficulty: u64) {
        self.record_at(Instant::now(), difficulty);
    }

    /// Record a result at the given timestamp.
    pub fn record_at(&mut self, at: Instant, difficulty: u64) {
        self.prune_before(at.checked_sub(self.window).unwrap_or(at));
        self.samples.push_back((at, difficulty));
        self.total_difficulty += difficulty;

        while self.samples.len() > self.max_samples {
            if let Some((_, old)) = self.samples.pop_front() {
                self.total_difficulty -= old;
            }
        }
    }

    /// Measured rate in GH/s over the window, zero when there is no data.
    pub fn hashrate_gh(&mut self) -> f64 {
        self.hashrate_gh_at(Instant::now())
    }

    /// Measured rate at the given timestamp.
    pub fn hashrate_gh_at(&mut self, now: Instant) -> f64 {
        self.prune_before(now.checked_sub(self.window).unwrap_or(now));

        if self.samples.len() < MIN_SAMPLES {
            return 0.0;
        }
        let span = match self.samples.front() {
            Some(&(oldest, _)) => now.duration_since(oldest).as_secs_f64(),
            None => return 0.0,
        };
        if span <= 0.0 {
            return 0.0;
        }

        self.total_difficulty as f64 * 4_294_967_296.0 / span / 1e9
    }

    /// Remove samples older than `cutoff`, subtracting their weight.
    fn prune_before(&mut self, cutoff: Instant) {
        while let Some(&(t, difficulty)) = self.samples.front() {
            if t >= cutoff {
                break;
            }
            self.total_difficulty -= difficulty;
            self.samples.pop_front();
        }
    }
}

impl Default for HashrateEstimator {
    fn default() -> Self {
        Self::new()
    }
}
