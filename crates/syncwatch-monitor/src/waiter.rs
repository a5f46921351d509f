//! Waiting for a node to reach a height
//!
//! [`ProgressWaiter`] polls a node on a fixed interval, feeds successful
//! polls into its own [`WindowedRateEstimator`] and stops on the first of:
//! target reached, scenario deadline passed, or (when a floor is set) the
//! windowed rate dropping below the floor.

use std::time::Duration;
use tracing::{debug, info, warn};

use syncwatch_core::window::DEFAULT_WINDOW;
use syncwatch_core::{
    NodeHandle, ProgressSample, ScenarioClock, WaitError, WindowedRateEstimator,
};

use crate::poller::StatusPoller;

/// Default pause between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// What to wait for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitTarget {
    /// Height that ends the wait
    pub height: u64,
    /// Pause between polls
    pub poll_interval: Duration,
    /// Minimum blocks/s; `None` disables the check
    pub rate_floor: Option<f64>,
}

impl WaitTarget {
    /// Wait for `height` with the default interval and no rate floor
    pub fn height(height: u64) -> Self {
        Self {
            height,
            poll_interval: DEFAULT_POLL_INTERVAL,
            rate_floor: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_rate_floor(mut self, floor: f64) -> Self {
        self.rate_floor = Some(floor);
        self
    }
}

/// Summary of a successful wait
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOutcome {
    pub node: String,
    /// Last known height (at least the target)
    pub height: u64,
    /// Status requests issued
    pub polls: u32,
    /// Status requests that failed or timed out
    pub failed_polls: u32,
    /// Windowed rate at the final tick
    pub rate: f64,
    pub elapsed: Duration,
}

/// Drives a [`StatusPoller`] until a node reaches a height
pub struct ProgressWaiter<'a, P: ?Sized> {
    poller: &'a P,
    clock: &'a ScenarioClock,
    window: Duration,
}

impl<'a, P> ProgressWaiter<'a, P>
where
    P: StatusPoller + ?Sized,
{
    pub fn new(poller: &'a P, clock: &'a ScenarioClock) -> Self {
        Self {
            poller,
            clock,
            window: DEFAULT_WINDOW,
        }
    }

    /// Use a different sliding window duration
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Poll `node` until it reports `target.height`.
    ///
    /// Each call owns a fresh window. Failed polls add no sample. A reported
    /// height below the last known one is logged and the last known height
    /// is recorded instead.
    pub async fn wait_for_height(
        &self,
        node: &NodeHandle,
        target: &WaitTarget,
    ) -> Result<WaitOutcome, WaitError> {
        let name = node.name();
        let started = self.clock.now();
        let mut estimator = WindowedRateEstimator::new(self.window);
        let mut latest = 0u64;
        let mut polls = 0u32;
        let mut failed_polls = 0u32;

        info!(
            node = %name,
            target = target.height,
            rate_floor = ?target.rate_floor,
            "Waiting for height"
        );

        loop {
            if self.clock.is_expired() {
                return Err(WaitError::DeadlineExceeded {
                    node: name,
                    target: target.height,
                    latest,
                    elapsed: self.clock.elapsed(),
                    deadline: self.clock.deadline(),
                });
            }

            polls += 1;
            match self.poller.poll(node).await {
                Ok(reported) => {
                    if reported < latest {
                        warn!(
                            node = %name,
                            reported,
                            latest,
                            "Reported height went backwards, keeping last known height"
                        );
                    } else {
                        debug!(node = %name, "Height: {} => {}", latest, reported);
                        latest = reported;
                    }
                    estimator.record(ProgressSample::new(self.clock.now(), latest));
                }
                Err(e) if e.is_timeout() => {
                    failed_polls += 1;
                    warn!(node = %name, "Timeout polling status: {}", e);
                }
                Err(e) => {
                    failed_polls += 1;
                    warn!(node = %name, "Status poll failed: {}", e);
                }
            }

            let rate = estimator.current_rate();
            debug!(
                node = %name,
                bps = rate,
                window_len = estimator.len(),
                "Block rate"
            );

            if let Some(floor) = target.rate_floor {
                if estimator.has_rate() && rate < floor {
                    return Err(WaitError::ThroughputBelowFloor {
                        node: name,
                        target: target.height,
                        latest,
                        rate,
                        floor,
                    });
                }
            }

            if latest >= target.height {
                let elapsed = self.clock.now().saturating_duration_since(started);
                info!(
                    node = %name,
                    height = latest,
                    polls,
                    failed_polls,
                    ?elapsed,
                    "Reached target height"
                );
                return Ok(WaitOutcome {
                    node: name,
                    height: latest,
                    polls,
                    failed_polls,
                    rate,
                    elapsed,
                });
            }

            self.clock.sleep(target.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_node, ScriptedPoller};
    use std::sync::Arc;
    use syncwatch_core::{ManualClock, NodeRole, PollError};

    const INTERVAL: Duration = Duration::from_secs(2);

    fn scenario_clock(deadline: Duration) -> (ManualClock, ScenarioClock) {
        let clock = ManualClock::new();
        let scenario = ScenarioClock::start(Arc::new(clock.clone()), deadline);
        (clock, scenario)
    }

    fn timeout(node: &NodeHandle) -> PollError {
        PollError::Timeout {
            node: node.name(),
            timeout_ms: 2000,
        }
    }

    #[tokio::test]
    async fn test_target_met_on_first_poll_does_not_sleep() {
        let node = test_node(0, NodeRole::Validator);
        let poller = ScriptedPoller::new().with_heights(0, [45]);
        let (clock, scenario) = scenario_clock(Duration::from_secs(60));

        let outcome = ProgressWaiter::new(&poller, &scenario)
            .wait_for_height(&node, &WaitTarget::height(40))
            .await
            .unwrap();

        assert_eq!(outcome.height, 45);
        assert_eq!(outcome.polls, 1);
        assert_eq!(clock.sleep_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_deadline_fails_without_polling() {
        let node = test_node(0, NodeRole::Validator);
        let poller = ScriptedPoller::new().with_heights(0, [100]);
        let (_clock, scenario) = scenario_clock(Duration::ZERO);

        let err = ProgressWaiter::new(&poller, &scenario)
            .wait_for_height(&node, &WaitTarget::height(40))
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::DeadlineExceeded { .. }));
        assert_eq!(poller.poll_count(0), 0);
    }

    #[tokio::test]
    async fn test_deadline_hit_while_stalled() {
        let node = test_node(0, NodeRole::Validator);
        let poller = ScriptedPoller::new().with_heights(0, [1, 2, 3]);
        let (clock, scenario) = scenario_clock(Duration::from_secs(10));

        let err = ProgressWaiter::new(&poller, &scenario)
            .wait_for_height(&node, &WaitTarget::height(40).with_poll_interval(INTERVAL))
            .await
            .unwrap_err();

        match err {
            WaitError::DeadlineExceeded { latest, target, .. } => {
                assert_eq!(latest, 3);
                assert_eq!(target, 40);
            }
            other => panic!("unexpected error: {other}"),
        }
        // Polls at t=0,2,4,6,8; deadline check at t=10 fails
        assert_eq!(poller.poll_count(0), 5);
        assert_eq!(clock.sleep_count(), 5);
    }

    #[tokio::test]
    async fn test_flat_pair_below_floor_fails() {
        let node = test_node(0, NodeRole::Validator);
        let poller = ScriptedPoller::new().with_heights(0, [5, 5]);
        let (_clock, scenario) = scenario_clock(Duration::from_secs(60));

        let err = ProgressWaiter::new(&poller, &scenario)
            .wait_for_height(
                &node,
                &WaitTarget::height(100)
                    .with_poll_interval(INTERVAL)
                    .with_rate_floor(1e-12),
            )
            .await
            .unwrap_err();

        match err {
            WaitError::ThroughputBelowFloor { rate, floor, latest, .. } => {
                assert_eq!(rate, 0.0);
                assert_eq!(floor, 1e-12);
                assert_eq!(latest, 5);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(poller.poll_count(0), 2);
    }

    #[tokio::test]
    async fn test_single_sample_skips_floor_check() {
        let node = test_node(0, NodeRole::Validator);
        let poller = ScriptedPoller::new().with_heights(0, [10, 12, 14, 16]);
        let (_clock, scenario) = scenario_clock(Duration::from_secs(60));

        let outcome = ProgressWaiter::new(&poller, &scenario)
            .wait_for_height(
                &node,
                &WaitTarget::height(16)
                    .with_poll_interval(INTERVAL)
                    .with_rate_floor(0.5),
            )
            .await
            .unwrap();

        assert_eq!(outcome.height, 16);
        assert!((outcome.rate - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_mid_run_stall_fails_despite_later_recovery() {
        let node = test_node(0, NodeRole::Validator);
        // Stalls for 8 seconds at height 20, then would recover quickly
        let poller = ScriptedPoller::new()
            .with_heights(0, [0, 10, 20, 20, 20, 20, 20, 200]);
        let (_clock, scenario) = scenario_clock(Duration::from_secs(120));

        let err = ProgressWaiter::new(&poller, &scenario)
            .wait_for_height(
                &node,
                &WaitTarget::height(100)
                    .with_poll_interval(INTERVAL)
                    .with_rate_floor(1e-12),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::ThroughputBelowFloor { .. }));
        assert!(poller.poll_count(0) < 8);
    }

    #[tokio::test]
    async fn test_timeouts_are_retried_without_samples() {
        let node = test_node(0, NodeRole::Validator);
        let poller = ScriptedPoller::new().with_script(
            0,
            vec![
                Ok(10),
                Err(timeout(&node)),
                Err(PollError::Transport {
                    node: node.name(),
                    reason: "connection refused".to_string(),
                }),
                Ok(20),
                Ok(40),
            ],
        );
        let (_clock, scenario) = scenario_clock(Duration::from_secs(60));

        let outcome = ProgressWaiter::new(&poller, &scenario)
            .wait_for_height(
                &node,
                &WaitTarget::height(40)
                    .with_poll_interval(INTERVAL)
                    .with_rate_floor(1e-12),
            )
            .await
            .unwrap();

        assert_eq!(outcome.polls, 5);
        assert_eq!(outcome.failed_polls, 2);
        assert_eq!(outcome.height, 40);
    }

    #[tokio::test]
    async fn test_regressed_height_keeps_last_known() {
        let node = test_node(0, NodeRole::Validator);
        let poller = ScriptedPoller::new().with_heights(0, [30, 12, 35, 40]);
        let (_clock, scenario) = scenario_clock(Duration::from_secs(60));

        let outcome = ProgressWaiter::new(&poller, &scenario)
            .wait_for_height(&node, &WaitTarget::height(40).with_poll_interval(INTERVAL))
            .await
            .unwrap();

        assert_eq!(outcome.height, 40);
        assert_eq!(outcome.polls, 4);
        // Window never saw a drop: 30, 30, 35, 40 over 6 seconds
        assert!(outcome.rate > 0.0);
    }

    #[tokio::test]
    async fn test_unchanged_height_without_floor_keeps_waiting() {
        let node = test_node(0, NodeRole::Validator);
        let poller = ScriptedPoller::new().with_heights(0, [7, 7, 7, 7, 7, 7, 7, 8]);
        let (_clock, scenario) = scenario_clock(Duration::from_secs(60));

        let outcome = ProgressWaiter::new(&poller, &scenario)
            .wait_for_height(&node, &WaitTarget::height(8).with_poll_interval(INTERVAL))
            .await
            .unwrap();

        assert_eq!(outcome.polls, 8);
    }

    #[tokio::test]
    async fn test_custom_window() {
        let node = test_node(0, NodeRole::Validator);
        let poller = ScriptedPoller::new().with_heights(0, [0, 2, 4, 6, 8, 40]);
        let (_clock, scenario) = scenario_clock(Duration::from_secs(60));

        let outcome = ProgressWaiter::new(&poller, &scenario)
            .with_window(Duration::from_secs(3))
            .wait_for_height(&node, &WaitTarget::height(40).with_poll_interval(INTERVAL))
            .await
            .unwrap();

        // Only the last two samples (t=8, t=10) survive a 3s window
        assert!((outcome.rate - 16.0).abs() < 1e-9);
    }
}
