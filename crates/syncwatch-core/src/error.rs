//! Error types for polling, waiting and configuration
//!
//! Poll errors are recoverable and retried on the next tick. Wait errors are
//! fatal and abort the scenario.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single status request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PollError {
    /// The node did not answer within the request timeout
    #[error("Status request to {node} timed out after {timeout_ms}ms")]
    Timeout { node: String, timeout_ms: u64 },

    /// Connection, HTTP or payload failure
    #[error("Status request to {node} failed: {reason}")]
    Transport { node: String, reason: String },
}

impl PollError {
    /// Check if this error is retriable
    ///
    /// Every poll failure is retried on the next tick; only the scenario
    /// deadline stops a wait.
    pub fn is_retriable(&self) -> bool {
        true
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout { .. })
    }

    /// Get an error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            PollError::Timeout { .. } => "POLL_TIMEOUT",
            PollError::Transport { .. } => "POLL_TRANSPORT",
        }
    }
}

/// Fatal outcome of waiting for a node to reach a height
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WaitError {
    /// The scenario ran out of time
    #[error(
        "Deadline of {deadline:?} exceeded after {elapsed:?} waiting for {node} to reach height {target} (latest height {latest})"
    )]
    DeadlineExceeded {
        node: String,
        target: u64,
        latest: u64,
        elapsed: Duration,
        deadline: Duration,
    },

    /// Block production slowed below the acceptable floor
    #[error(
        "Throughput of {node} fell to {rate:.6} blocks/s, below floor {floor:e} blocks/s, while waiting for height {target} (latest height {latest})"
    )]
    ThroughputBelowFloor {
        node: String,
        target: u64,
        latest: u64,
        rate: f64,
        floor: f64,
    },
}

impl WaitError {
    /// Node the failed wait was watching
    pub fn node(&self) -> &str {
        match self {
            WaitError::DeadlineExceeded { node, .. } => node,
            WaitError::ThroughputBelowFloor { node, .. } => node,
        }
    }

    /// Height the failed wait was aiming for
    pub fn target(&self) -> u64 {
        match self {
            WaitError::DeadlineExceeded { target, .. } => *target,
            WaitError::ThroughputBelowFloor { target, .. } => *target,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            WaitError::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            WaitError::ThroughputBelowFloor { .. } => "THROUGHPUT_BELOW_FLOOR",
        }
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Configuration file could not be read
    #[error("Failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON for the expected shape
    #[error("Failed to parse configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Values that cannot drive a scenario
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "CONFIG_NOT_FOUND",
            ConfigError::Read { .. } => "CONFIG_READ",
            ConfigError::Parse { .. } => "CONFIG_PARSE",
            ConfigError::Invalid(_) => "INVALID_CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = PollError::Timeout {
            node: "node0".to_string(),
            timeout_ms: 2000,
        };
        assert_eq!(err.error_code(), "POLL_TIMEOUT");
        assert!(err.is_timeout());
        assert!(err.is_retriable());

        let err = ConfigError::Invalid("bad".to_string());
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_wait_error_names_node_target_and_constraint() {
        let err = WaitError::ThroughputBelowFloor {
            node: "node0".to_string(),
            target: 100,
            latest: 57,
            rate: 0.0,
            floor: 1e-12,
        };
        let msg = err.to_string();
        assert!(msg.contains("node0"));
        assert!(msg.contains("100"));
        assert!(msg.contains("1e-12"));
        assert_eq!(err.node(), "node0");
        assert_eq!(err.target(), 100);

        let err = WaitError::DeadlineExceeded {
            node: "node2".to_string(),
            target: 40,
            latest: 3,
            elapsed: Duration::from_secs(61),
            deadline: Duration::from_secs(60),
        };
        assert!(err.to_string().contains("Deadline"));
        assert_eq!(err.error_code(), "DEADLINE_EXCEEDED");
    }
}
