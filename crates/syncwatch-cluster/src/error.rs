//! Bringup error types

use std::path::PathBuf;
use thiserror::Error;

use syncwatch_core::NodeRole;

/// Failure while preparing, seeding or launching the cluster
#[derive(Error, Debug)]
pub enum BringupError {
    /// Filesystem operation failed
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A helper binary could not be started
    #[error("Failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A helper binary ran but reported failure
    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// A node config file is not valid JSON
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A node config file is valid JSON but not an object
    #[error("Expected a JSON object in {0}")]
    NotAnObject(PathBuf),

    /// The node key file has no public key
    #[error("No public key in {0}")]
    MissingNodeKey(PathBuf),

    /// A node process died right after launch
    #[error("Node {ordinal} exited right after launch with {status}")]
    EarlyExit { ordinal: usize, status: String },

    /// A node home was used for the wrong role
    #[error("Node {ordinal} has role {actual}, expected {expected}")]
    UnexpectedRole {
        ordinal: usize,
        expected: NodeRole,
        actual: NodeRole,
    },

    /// Snapshot directory is missing the genesis file
    #[error("Snapshot {0} has no genesis.json")]
    InvalidSnapshot(PathBuf),

    /// Cluster layout is unusable
    #[error("Invalid cluster layout: {0}")]
    InvalidLayout(String),
}

impl BringupError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BringupError::Io {
            path: path.into(),
            source,
        }
    }

    /// Get an error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            BringupError::Io { .. } => "IO_ERROR",
            BringupError::Spawn { .. } => "SPAWN_FAILED",
            BringupError::CommandFailed { .. } => "COMMAND_FAILED",
            BringupError::Json { .. } => "INVALID_JSON",
            BringupError::NotAnObject(_) => "NOT_AN_OBJECT",
            BringupError::MissingNodeKey(_) => "MISSING_NODE_KEY",
            BringupError::EarlyExit { .. } => "EARLY_EXIT",
            BringupError::UnexpectedRole { .. } => "UNEXPECTED_ROLE",
            BringupError::InvalidSnapshot(_) => "INVALID_SNAPSHOT",
            BringupError::InvalidLayout(_) => "INVALID_LAYOUT",
        }
    }
}

/// Result type for bringup operations
pub type Result<T> = std::result::Result<T, BringupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = BringupError::UnexpectedRole {
            ordinal: 0,
            expected: NodeRole::Observer,
            actual: NodeRole::Validator,
        };
        assert_eq!(err.error_code(), "UNEXPECTED_ROLE");
        assert_eq!(err.to_string(), "Node 0 has role validator, expected observer");
    }
}
