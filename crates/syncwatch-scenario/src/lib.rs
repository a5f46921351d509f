//! Syncwatch Scenario - state sync survival run
//!
//! [`ScenarioDriver`] walks a cluster through
//! `Provisioning -> BaselineWait -> JoinLateNode -> DegradationWatch ->
//! LateNodeCatchup -> Done`. Any bringup or wait failure moves it to
//! `Aborted` and is returned as a [`ScenarioError`] naming the phase.

pub mod driver;
pub mod error;
pub mod phase;

pub use driver::{cluster_layout, ScenarioDriver, ScenarioReport};
pub use error::{AbortReason, ScenarioError};
pub use phase::{Phase, PhaseRecord, PhaseTracker};

/// Set to any value to log at debug level when `RUST_LOG` is unset
pub const VERBOSE_ENV_VAR: &str = "SYNCWATCH_VERBOSE";
