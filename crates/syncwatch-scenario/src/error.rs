//! Scenario abort errors

use thiserror::Error;

use syncwatch_cluster::BringupError;
use syncwatch_core::{ConfigError, WaitError};

use crate::phase::Phase;

/// A scenario run stopped before reaching [`Phase::Done`]
#[derive(Error, Debug)]
#[error("Scenario aborted during {phase}: {reason}")]
pub struct ScenarioError {
    pub phase: Phase,
    pub reason: AbortReason,
}

/// What made the scenario stop
#[derive(Error, Debug)]
pub enum AbortReason {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bringup(#[from] BringupError),

    #[error(transparent)]
    Wait(#[from] WaitError),
}

impl ScenarioError {
    /// Error code of the underlying failure
    pub fn error_code(&self) -> &'static str {
        match &self.reason {
            AbortReason::Config(e) => e.error_code(),
            AbortReason::Bringup(e) => e.error_code(),
            AbortReason::Wait(e) => e.error_code(),
        }
    }

    /// Node involved in the failure, when a wait failed
    pub fn node(&self) -> Option<&str> {
        match &self.reason {
            AbortReason::Wait(e) => Some(e.node()),
            _ => None,
        }
    }

    /// True when block production fell below the rate floor
    pub fn is_throughput_violation(&self) -> bool {
        matches!(
            self.reason,
            AbortReason::Wait(WaitError::ThroughputBelowFloor { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_message_names_phase_and_constraint() {
        let err = ScenarioError {
            phase: Phase::LateNodeCatchup,
            reason: WaitError::DeadlineExceeded {
                node: "node2".into(),
                target: 40,
                latest: 12,
                elapsed: Duration::from_secs(3600),
                deadline: Duration::from_secs(3600),
            }
            .into(),
        };
        let message = err.to_string();
        assert!(message.starts_with("Scenario aborted during late node catchup: "));
        assert!(message.contains("node2"));
        assert_eq!(err.node(), Some("node2"));
        assert_eq!(err.error_code(), "DEADLINE_EXCEEDED");
        assert!(!err.is_throughput_violation());
    }

    #[test]
    fn test_bringup_reason() {
        let err = ScenarioError {
            phase: Phase::Provisioning,
            reason: BringupError::InvalidLayout("no validators".into()).into(),
        };
        assert_eq!(err.error_code(), "INVALID_LAYOUT");
        assert_eq!(err.node(), None);
    }
}
