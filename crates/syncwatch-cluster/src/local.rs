//! Cluster of node processes on the local machine
//!
//! Homes are laid out by the node binary's own `testnet` command under the
//! harness work directory (`test0`, `test1`, ...). Node N listens on
//! `base_port + N` and serves RPC on `rpc_base_port + N`.

use async_trait::async_trait;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use syncwatch_core::{HarnessConfig, NodeHandle};

use crate::bringup::ClusterBringup;
use crate::error::{BringupError, Result};
use crate::overrides::{patch_json_file, read_json_object};
use crate::layout::{ClusterLayout, NodeHome};

/// Prefix of node home directory names
pub const HOME_PREFIX: &str = "test";
pub const GENESIS_FILE: &str = "genesis.json";
pub const CONFIG_FILE: &str = "config.json";
pub const NODE_KEY_FILE: &str = "node_key.json";

/// How long a freshly spawned node must survive to count as launched
const LAUNCH_GRACE: Duration = Duration::from_millis(200);

struct NodeProcess {
    ordinal: usize,
    child: Child,
}

/// [`ClusterBringup`] backed by local node processes
pub struct LocalCluster {
    config: HarnessConfig,
    processes: Vec<NodeProcess>,
}

impl LocalCluster {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            processes: Vec::new(),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Number of node processes started and not yet shut down
    pub fn running(&self) -> usize {
        self.processes.len()
    }

    /// Home directory of node `ordinal`
    pub fn home_dir(&self, ordinal: usize) -> PathBuf {
        self.config
            .work_dir
            .join(format!("{}{}", HOME_PREFIX, ordinal))
    }

    /// Network and RPC addresses of node `ordinal`
    pub fn addresses(&self, ordinal: usize) -> Result<(SocketAddr, SocketAddr)> {
        let (port, rpc_port) = self.config.ports_for(ordinal).ok_or_else(|| {
            BringupError::InvalidLayout(format!(
                "node {} has no port above base_port {} / rpc_base_port {}",
                ordinal, self.config.base_port, self.config.rpc_base_port
            ))
        })?;
        Ok((
            SocketAddr::new(self.config.host, port),
            SocketAddr::new(self.config.host, rpc_port),
        ))
    }

    async fn prepare_home(&self, layout: &ClusterLayout, ordinal: usize) -> Result<NodeHome> {
        let dir = self.home_dir(ordinal);

        let chain_changes = layout
            .chain_overrides
            .iter()
            .map(|(path, value)| (path.as_str(), value));
        patch_json_file(&dir.join(GENESIS_FILE), chain_changes).await?;

        let (addr, rpc_addr) = self.addresses(ordinal)?;
        let addr_value = Value::String(addr.to_string());
        let rpc_value = Value::String(rpc_addr.to_string());
        let mut client_changes = vec![("network.addr", &addr_value), ("rpc.addr", &rpc_value)];
        if let Some(overrides) = layout.node_overrides.get(&ordinal) {
            client_changes.extend(overrides.iter().map(|(key, value)| (key.as_str(), value)));
        }
        patch_json_file(&dir.join(CONFIG_FILE), client_changes).await?;

        let public_key = read_public_key(&dir.join(NODE_KEY_FILE)).await?;

        Ok(NodeHome {
            ordinal,
            role: layout.role_of(ordinal),
            dir,
            addr,
            rpc_addr,
            public_key,
        })
    }
}

#[async_trait]
impl ClusterBringup for LocalCluster {
    async fn init(&mut self, layout: &ClusterLayout) -> Result<Vec<NodeHome>> {
        layout.validate()?;
        if layout.node_count() > 0 {
            self.addresses(layout.node_count() - 1)?;
        }
        let work_dir = &self.config.work_dir;
        tokio::fs::create_dir_all(work_dir)
            .await
            .map_err(|e| BringupError::io(work_dir, e))?;

        // Stale homes from a previous run would make testnet refuse to start
        for ordinal in 0..layout.node_count() {
            let dir = self.home_dir(ordinal);
            if tokio::fs::try_exists(&dir).await.unwrap_or(false) {
                debug!(dir = %dir.display(), "Removing stale node home");
                tokio::fs::remove_dir_all(&dir)
                    .await
                    .map_err(|e| BringupError::io(&dir, e))?;
            }
        }

        let mut command = Command::new(self.config.node_binary_path());
        command
            .arg("--home")
            .arg(work_dir)
            .arg("testnet")
            .arg("--v")
            .arg(layout.topology.validators.to_string())
            .arg("--n")
            .arg(layout.topology.observers.to_string())
            .arg("--shards")
            .arg(layout.topology.shards.to_string())
            .arg("--prefix")
            .arg(HOME_PREFIX);
        run_to_completion(&mut command).await?;

        let mut homes = Vec::with_capacity(layout.node_count());
        for ordinal in 0..layout.node_count() {
            let home = self.prepare_home(layout, ordinal).await?;
            info!(
                ordinal,
                role = %home.role,
                dir = %home.dir.display(),
                rpc = %home.rpc_addr,
                "Prepared node home"
            );
            homes.push(home);
        }

        Ok(homes)
    }

    async fn launch(&mut self, home: &NodeHome, boot: Option<&NodeHandle>) -> Result<NodeHandle> {
        let stdout = create_log(&home.dir.join("stdout")).await?;
        let stderr = create_log(&home.dir.join("stderr")).await?;

        let mut command = Command::new(self.config.node_binary_path());
        command.arg("--home").arg(&home.dir).arg("run");
        if let Some(boot) = boot {
            command.arg("--boot-nodes").arg(boot.boot_node());
        }
        command
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| BringupError::Spawn {
            command: describe(&command),
            source,
        })?;

        tokio::time::sleep(LAUNCH_GRACE).await;
        if let Some(status) = child
            .try_wait()
            .map_err(|e| BringupError::io(&home.dir, e))?
        {
            return Err(BringupError::EarlyExit {
                ordinal: home.ordinal,
                status: status.to_string(),
            });
        }

        let handle = home.to_handle();
        info!(
            node = %handle,
            pid = ?child.id(),
            boot = ?boot.map(NodeHandle::name),
            "Launched node"
        );
        self.processes.push(NodeProcess {
            ordinal: home.ordinal,
            child,
        });
        Ok(handle)
    }

    async fn shutdown(&mut self) -> Result<()> {
        for mut process in self.processes.drain(..) {
            if let Err(e) = process.child.start_kill() {
                warn!(ordinal = process.ordinal, "Failed to signal node: {}", e);
            }
            match process.child.wait().await {
                Ok(status) => info!(ordinal = process.ordinal, %status, "Node stopped"),
                Err(e) => warn!(ordinal = process.ordinal, "Failed to reap node: {}", e),
            }
        }
        Ok(())
    }
}

async fn read_public_key(path: &Path) -> Result<String> {
    let key = read_json_object(path).await?;
    key.get("public_key")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BringupError::MissingNodeKey(path.to_path_buf()))
}

async fn create_log(path: &Path) -> Result<Stdio> {
    let file = tokio::fs::File::create(path)
        .await
        .map_err(|e| BringupError::io(path, e))?;
    Ok(Stdio::from(file.into_std().await))
}

fn describe(command: &Command) -> String {
    format!("{:?}", command.as_std())
}

/// Run a helper binary and fail with its stderr if it exits unsuccessfully
pub(crate) async fn run_to_completion(command: &mut Command) -> Result<()> {
    let label = describe(command);
    debug!(command = %label, "Running");

    let output = command
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| BringupError::Spawn {
            command: label.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(BringupError::CommandFailed {
            command: label,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
