//! Syncwatch Core - Shared types for the cluster progress harness
//!
//! This crate holds everything the monitoring side of the harness agrees on:
//! node identities, progress samples and the sliding-window rate estimator,
//! the scenario clock, the error taxonomy and configuration.
//!
//! # Modules
//!
//! - [`node`] - Node roles and the read-only [`NodeHandle`]
//! - [`window`] - Time-bounded sliding window and rate estimation
//! - [`clock`] - Injectable clocks and the scenario deadline
//! - [`config`] - Scenario constants and harness locations
//! - [`error`] - Poll, wait and configuration errors
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use syncwatch_core::window::{ProgressSample, WindowedRateEstimator};
//!
//! let start = Instant::now();
//! let mut estimator = WindowedRateEstimator::new(Duration::from_secs(7));
//! estimator.record(ProgressSample::new(start, 0));
//! estimator.record(ProgressSample::new(start + Duration::from_secs(2), 10));
//! assert_eq!(estimator.current_rate(), 5.0);
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod node;
pub mod window;

pub use clock::{Clock, ManualClock, ScenarioClock, SystemClock};
pub use config::{HarnessConfig, ScenarioConfig, TopologyConfig};
pub use error::{ConfigError, PollError, WaitError};
pub use node::{NodeHandle, NodeRole};
pub use window::{ProgressSample, WindowedRateEstimator};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
