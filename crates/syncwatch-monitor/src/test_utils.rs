//! Deterministic pollers for tests
//!
//! [`ScriptedPoller`] replays a fixed sequence of poll results per node
//! ordinal. Once a script runs out the last successful height is repeated,
//! which models a node that has stopped producing blocks.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use syncwatch_core::{NodeHandle, NodeRole, PollError};

use crate::poller::StatusPoller;

#[derive(Debug, Default)]
struct Script {
    pending: VecDeque<Result<u64, PollError>>,
    last_height: Option<u64>,
    polls: usize,
}

/// Poller that answers from per-node scripts
#[derive(Debug, Default)]
pub struct ScriptedPoller {
    scripts: Mutex<HashMap<usize, Script>>,
}

impl ScriptedPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script node `ordinal` with explicit results
    pub fn with_script(self, ordinal: usize, results: Vec<Result<u64, PollError>>) -> Self {
        self.scripts.lock().insert(
            ordinal,
            Script {
                pending: results.into(),
                ..Script::default()
            },
        );
        self
    }

    /// Script node `ordinal` with successful heights
    pub fn with_heights(self, ordinal: usize, heights: impl IntoIterator<Item = u64>) -> Self {
        let results = heights.into_iter().map(Ok).collect();
        self.with_script(ordinal, results)
    }

    /// Number of polls issued against node `ordinal`
    pub fn poll_count(&self, ordinal: usize) -> usize {
        self.scripts
            .lock()
            .get(&ordinal)
            .map(|script| script.polls)
            .unwrap_or(0)
    }
}

#[async_trait]
impl StatusPoller for ScriptedPoller {
    async fn poll(&self, node: &NodeHandle) -> Result<u64, PollError> {
        let mut scripts = self.scripts.lock();
        let script = scripts.entry(node.ordinal).or_default();
        script.polls += 1;

        match script.pending.pop_front() {
            Some(Ok(height)) => {
                script.last_height = Some(height);
                Ok(height)
            }
            Some(Err(e)) => Err(e),
            None => script.last_height.ok_or_else(|| PollError::Transport {
                node: node.name(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

/// Handle for a node that is not backed by a process
pub fn test_node(ordinal: usize, role: NodeRole) -> NodeHandle {
    let host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    NodeHandle::new(
        ordinal,
        role,
        SocketAddr::new(host, 24567 + ordinal as u16),
        SocketAddr::new(host, 3030 + ordinal as u16),
        format!("ed25519:test{}", ordinal),
        format!("/tmp/syncwatch/test{}", ordinal),
    )
}
