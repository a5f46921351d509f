//! Syncwatch Monitor - Status polling and progress waiting
//!
//! - [`poller`] - [`StatusPoller`] trait and the HTTP implementation
//! - [`waiter`] - [`ProgressWaiter`], the poll/estimate/assert loop
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use syncwatch_core::{NodeHandle, ScenarioClock};
//! use syncwatch_monitor::{HttpStatusPoller, ProgressWaiter, WaitTarget};
//!
//! # async fn run(leader: NodeHandle) -> Result<(), Box<dyn std::error::Error>> {
//! let clock = ScenarioClock::system(Duration::from_secs(600));
//! let poller = HttpStatusPoller::new(Duration::from_secs(2));
//!
//! let outcome = ProgressWaiter::new(&poller, &clock)
//!     .wait_for_height(&leader, &WaitTarget::height(100).with_rate_floor(0.5))
//!     .await?;
//! println!("{} reached {}", outcome.node, outcome.height);
//! # Ok(())
//! # }
//! ```

pub mod poller;
pub mod waiter;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use poller::{HttpStatusPoller, StatusPoller, StatusResponse, SyncInfo};
pub use waiter::{ProgressWaiter, WaitOutcome, WaitTarget};
