//! Scenario phases

use chrono::{DateTime, Utc};
use std::fmt;
use tracing::info;

use crate::error::{AbortReason, ScenarioError};

/// Where a scenario run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Laying out homes, seeding the dataset and launching the first nodes
    Provisioning,
    /// Waiting for the leader to produce the first blocks
    BaselineWait,
    /// Starting the observer that has to state-sync
    JoinLateNode,
    /// Leader must keep producing blocks while the late node syncs
    DegradationWatch,
    /// Late node must reach the baseline height
    LateNodeCatchup,
    Done,
    Aborted,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Aborted)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Provisioning => "provisioning",
            Phase::BaselineWait => "baseline wait",
            Phase::JoinLateNode => "late node join",
            Phase::DegradationWatch => "degradation watch",
            Phase::LateNodeCatchup => "late node catchup",
            Phase::Done => "done",
            Phase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// A phase and the wall-clock time it was entered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseRecord {
    pub phase: Phase,
    pub entered_at: DateTime<Utc>,
}

/// Current phase plus every phase entered so far
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    current: Phase,
    history: Vec<PhaseRecord>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            current: Phase::Provisioning,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> Phase {
        self.current
    }

    pub fn history(&self) -> &[PhaseRecord] {
        &self.history
    }

    /// Phases in the order they were entered
    pub fn phases(&self) -> Vec<Phase> {
        self.history.iter().map(|record| record.phase).collect()
    }

    pub fn enter(&mut self, phase: Phase) {
        if let Some(previous) = self.history.last() {
            let spent = Utc::now() - previous.entered_at;
            info!(
                from = %previous.phase,
                to = %phase,
                spent_ms = spent.num_milliseconds(),
                "Phase transition"
            );
        } else {
            info!(to = %phase, "Phase transition");
        }
        self.current = phase;
        self.history.push(PhaseRecord {
            phase,
            entered_at: Utc::now(),
        });
    }

    /// Error for a failure in the current phase
    pub fn abort(&self, reason: impl Into<AbortReason>) -> ScenarioError {
        ScenarioError {
            phase: self.current,
            reason: reason.into(),
        }
    }
}
