//! Sliding-window throughput estimation
//!
//! Samples are kept in a time-bounded window rather than a fixed-size ring:
//! every retained sample lies within `W` of the newest one, and the two
//! newest samples are always kept so the estimate never collapses to an
//! empty window under poll jitter.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default window duration
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(7);

/// Trimming never drops the window below this many samples
pub const MIN_RETAINED_SAMPLES: usize = 2;

/// A single observation of a node's height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    /// When the observation was taken
    pub at: Instant,
    /// Reported block height
    pub height: u64,
}

impl ProgressSample {
    pub fn new(at: Instant, height: u64) -> Self {
        Self { at, height }
    }
}

/// Rate estimator over a time-bounded window of [`ProgressSample`]s
///
/// Samples must be recorded in time order; a single waiter owns each
/// estimator.
#[derive(Debug, Clone)]
pub struct WindowedRateEstimator {
    window: Duration,
    samples: VecDeque<ProgressSample>,
}

impl Default for WindowedRateEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl WindowedRateEstimator {
    /// Create an empty estimator with window duration `window`
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            samples: VecDeque::new(),
        }
    }

    /// Window duration
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Append a sample and drop samples that fell out of the window.
    ///
    /// A front sample is dropped while it is at least `W` older than the
    /// newest sample and more than [`MIN_RETAINED_SAMPLES`] remain.
    pub fn record(&mut self, sample: ProgressSample) {
        self.samples.push_back(sample);

        while self.samples.len() > MIN_RETAINED_SAMPLES {
            let Some(front) = self.samples.front() else {
                break;
            };
            if sample.at.saturating_duration_since(front.at) < self.window {
                break;
            }
            self.samples.pop_front();
        }
    }

    /// Blocks per second between the oldest and newest retained samples.
    ///
    /// Returns `0.0` with fewer than two samples or when both ends share a
    /// timestamp.
    pub fn current_rate(&self) -> f64 {
        if self.samples.len() <= 1 {
            return 0.0;
        }
        let (Some(oldest), Some(newest)) = (self.samples.front(), self.samples.back()) else {
            return 0.0;
        };

        let elapsed = newest.at.saturating_duration_since(oldest.at).as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }

        (newest.height as f64 - oldest.height as f64) / elapsed
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether enough samples are retained for [`Self::current_rate`] to mean anything
    pub fn has_rate(&self) -> bool {
        self.samples.len() >= MIN_RETAINED_SAMPLES
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&ProgressSample> {
        self.samples.back()
    }

    /// Retained samples, oldest first
    pub fn samples(&self) -> impl Iterator<Item = &ProgressSample> {
        self.samples.iter()
    }
}
