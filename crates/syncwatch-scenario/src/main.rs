//! state-sync-massive - checks that block production survives a node
//! state-syncing a large genesis
//!
//! Brings up one validator and two observers, waits for a few blocks, starts
//! a third node that has to state-sync, and requires the validator to keep
//! producing blocks until the late node catches up.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use syncwatch_cluster::{DatasetSource, GenesisPopulate, LocalCluster};
use syncwatch_core::{HarnessConfig, ScenarioConfig};
use syncwatch_monitor::HttpStatusPoller;
use syncwatch_scenario::{ScenarioDriver, VERBOSE_ENV_VAR};

#[derive(Parser)]
#[command(name = "state-sync-massive")]
#[command(about = "Watch block production while a late node state-syncs a large genesis")]
struct Args {
    /// Prepared node home (genesis.json and data/) to copy into every node
    /// instead of generating accounts
    snapshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if std::env::var_os(VERBOSE_ENV_VAR).is_some() {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let harness = HarnessConfig::load()?;
    let config = ScenarioConfig::default();
    harness.validate(config.topology.node_count())?;
    let dataset = DatasetSource::from_snapshot_or_generate(args.snapshot, config.generated_accounts);

    info!("Starting state sync scenario");
    info!("Node binary: {}", harness.node_binary_path().display());
    info!("Work dir: {}", harness.work_dir.display());
    info!("Dataset: {}", dataset);
    info!(
        "Heights: baseline {}, degradation {}; rate floor {:e} blocks/s",
        config.small_height, config.large_height, config.rate_floor
    );

    let cluster = LocalCluster::new(harness.clone());
    let seeder = GenesisPopulate::new(harness.populate_binary_path());
    let poller = HttpStatusPoller::new(config.status_timeout);

    let mut driver = ScenarioDriver::new(config, cluster, seeder, poller, dataset);
    let report = driver.run().await?;

    info!(
        "Leader {} reached {} and late node {} reached {} in {:?}",
        report.leader.name(),
        report.degradation.height,
        report.late_node.name(),
        report.catchup.height,
        report.elapsed
    );
    Ok(())
}
