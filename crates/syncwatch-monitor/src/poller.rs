//! Status polling
//!
//! A [`StatusPoller`] asks one node for its latest block height. Pollers are
//! stateless: the same poller can be shared across waiters watching
//! different nodes.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

use syncwatch_core::{NodeHandle, PollError};

/// Default timeout of one status request
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(2);

/// Queries a node's reported height
#[async_trait]
pub trait StatusPoller: Send + Sync {
    /// Latest block height reported by `node`
    async fn poll(&self, node: &NodeHandle) -> Result<u64, PollError>;
}

/// Payload of `GET /status`; fields the harness does not use are ignored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub sync_info: SyncInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncInfo {
    pub latest_block_height: u64,
    #[serde(default)]
    pub latest_block_hash: Option<String>,
    #[serde(default)]
    pub syncing: bool,
}

/// Polls the node's HTTP status endpoint
#[derive(Debug, Clone)]
pub struct HttpStatusPoller {
    client: Client,
    timeout: Duration,
}

impl Default for HttpStatusPoller {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_TIMEOUT)
    }
}

impl HttpStatusPoller {
    /// Create a poller whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch and decode the full status payload
    pub async fn status(&self, node: &NodeHandle) -> Result<StatusResponse, PollError> {
        let url = format!("{}/status", node.rpc_url());
        trace!(%url, "Requesting status");

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(node, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Transport {
                node: node.name(),
                reason: format!("HTTP {}", status),
            });
        }

        response
            .json::<StatusResponse>()
            .await
            .map_err(|e| self.classify(node, e))
    }

    fn classify(&self, node: &NodeHandle, err: reqwest::Error) -> PollError {
        if err.is_timeout() {
            PollError::Timeout {
                node: node.name(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            PollError::Transport {
                node: node.name(),
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl StatusPoller for HttpStatusPoller {
    async fn poll(&self, node: &NodeHandle) -> Result<u64, PollError> {
        let status = self.status(node).await?;
        Ok(status.sync_info.latest_block_height)
    }
}
