//! Clocks and the scenario deadline
//!
//! All elapsed-time checks go through a [`ScenarioClock`] captured once at
//! scenario start. The underlying [`Clock`] is injectable so waits can be
//! driven deterministically in tests with a [`ManualClock`].

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of monotonic time and sleeping
#[async_trait]
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current monotonic instant
    fn now(&self) -> Instant;

    /// Suspend for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug)]
struct ManualState {
    now: Instant,
    sleeps: Vec<Duration>,
}

/// Clock that only moves when told to.
///
/// `sleep` returns immediately after advancing the clock by the requested
/// duration, and every sleep is recorded. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                now,
                sleeps: Vec::new(),
            })),
        }
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, by: Duration) {
        self.state.lock().now += by;
    }

    /// Durations passed to `sleep`, in call order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }

    pub fn sleep_count(&self) -> usize {
        self.state.lock().sleeps.len()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.state.lock().now
    }

    async fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.now += duration;
        state.sleeps.push(duration);
    }
}

/// Start time and deadline shared by every wait in a scenario
#[derive(Debug, Clone)]
pub struct ScenarioClock {
    clock: Arc<dyn Clock>,
    started_at: Instant,
    deadline: Duration,
}

impl ScenarioClock {
    /// Capture the start time from `clock` now
    pub fn start(clock: Arc<dyn Clock>, deadline: Duration) -> Self {
        let started_at = clock.now();
        Self {
            clock,
            started_at,
            deadline,
        }
    }

    /// Scenario clock backed by [`SystemClock`]
    pub fn system(deadline: Duration) -> Self {
        Self::start(Arc::new(SystemClock), deadline)
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.started_at)
    }

    /// Time left before the deadline, `None` once it has passed
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .checked_sub(self.elapsed())
            .filter(|left| !left.is_zero())
    }

    /// True once elapsed time reaches the deadline
    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.deadline
    }

    pub async fn sleep(&self, duration: Duration) {
        self.clock.sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_secs(2)).await;
        clock.advance(Duration::from_millis(500));

        assert_eq!(clock.now() - start, Duration::from_millis(2500));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_secs(3));
        assert_eq!(clock.now(), other.now());
    }

    #[test]
    fn test_scenario_clock_expiry() {
        let clock = ManualClock::new();
        let scenario = ScenarioClock::start(Arc::new(clock.clone()), Duration::from_secs(10));

        assert!(!scenario.is_expired());
        assert_eq!(scenario.remaining(), Some(Duration::from_secs(10)));

        clock.advance(Duration::from_secs(9));
        assert!(!scenario.is_expired());
        assert_eq!(scenario.elapsed(), Duration::from_secs(9));

        clock.advance(Duration::from_secs(1));
        assert!(scenario.is_expired());
        assert_eq!(scenario.remaining(), None);
    }

    #[test]
    fn test_zero_deadline_is_expired_immediately() {
        let scenario = ScenarioClock::start(Arc::new(ManualClock::new()), Duration::ZERO);
        assert!(scenario.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_system_clock_sleep_moves_time() {
        let clock = SystemClock;
        let before = clock.now();
        clock.sleep(Duration::from_secs(5)).await;
        assert!(clock.now() - before >= Duration::from_secs(5));
    }
}
