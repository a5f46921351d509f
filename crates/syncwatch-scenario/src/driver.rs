//! The state sync survival scenario
//!
//! One validator produces blocks while observers join. The last observer
//! starts only after the chain has some height, so it has to state-sync a
//! large genesis. The leader must keep producing blocks the whole time.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use syncwatch_cluster::{ClusterBringup, ClusterLayout, DatasetSeeder, DatasetSource, NodeHome};
use syncwatch_core::{Clock, NodeHandle, NodeRole, ScenarioClock, ScenarioConfig, SystemClock};
use syncwatch_monitor::{ProgressWaiter, StatusPoller, WaitOutcome, WaitTarget};

use crate::error::ScenarioError;
use crate::phase::{Phase, PhaseRecord, PhaseTracker};

/// Cluster layout the scenario runs on: zero gas price and inflation, short
/// epochs, a lenient kickout threshold, and observers tracking shard 0.
pub fn cluster_layout(config: &ScenarioConfig) -> ClusterLayout {
    let topology = config.topology.clone();
    let mut layout = ClusterLayout::new(topology.clone())
        .with_chain_override("min_gas_price", 0)
        .with_chain_override("max_inflation_rate", json!([0, 1]))
        .with_chain_override("epoch_length", 20)
        .with_chain_override("block_producer_kickout_threshold", 80);
    for ordinal in topology.validators..topology.node_count() {
        layout = layout.with_node_override(ordinal, "tracked_shards", json!([0]));
    }
    layout
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub leader: NodeHandle,
    pub late_node: NodeHandle,
    /// Leader reaching the small height
    pub baseline: WaitOutcome,
    /// Leader reaching the large height under the rate floor
    pub degradation: WaitOutcome,
    /// Late node reaching the small height
    pub catchup: WaitOutcome,
    pub phases: Vec<PhaseRecord>,
    /// Time since the first launch
    pub elapsed: Duration,
}

/// Runs the scenario against a cluster, a dataset seeder and a status poller
pub struct ScenarioDriver<C, S, P> {
    config: ScenarioConfig,
    cluster: C,
    seeder: S,
    poller: P,
    dataset: DatasetSource,
    clock: Arc<dyn Clock>,
    progress: PhaseTracker,
}

/// Homes split by the part they play
struct Cast<'a> {
    leader: &'a NodeHome,
    validators: Vec<&'a NodeHome>,
    early: Vec<&'a NodeHome>,
    late: &'a NodeHome,
}

impl<C, S, P> ScenarioDriver<C, S, P>
where
    C: ClusterBringup,
    S: DatasetSeeder,
    P: StatusPoller,
{
    pub fn new(config: ScenarioConfig, cluster: C, seeder: S, poller: P, dataset: DatasetSource) -> Self {
        Self {
            config,
            cluster,
            seeder,
            poller,
            dataset,
            clock: Arc::new(SystemClock),
            progress: PhaseTracker::new(),
        }
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn phase(&self) -> Phase {
        self.progress.current()
    }

    pub fn history(&self) -> &[PhaseRecord] {
        self.progress.history()
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    pub fn poller(&self) -> &P {
        &self.poller
    }

    /// Run every phase, then tear the cluster down whatever the outcome
    pub async fn run(&mut self) -> Result<ScenarioReport, ScenarioError> {
        let result = self.execute().await;

        if let Err(e) = self.cluster.shutdown().await {
            warn!("Cluster teardown failed: {}", e);
        }

        match result {
            Ok(mut report) => {
                self.progress.enter(Phase::Done);
                report.phases = self.progress.history().to_vec();
                info!(
                    elapsed = ?report.elapsed,
                    leader_height = report.degradation.height,
                    late_height = report.catchup.height,
                    "Scenario passed"
                );
                Ok(report)
            }
            Err(e) => {
                error!(
                    phase = %e.phase,
                    code = e.error_code(),
                    node = e.node().unwrap_or("-"),
                    "Scenario aborted: {}",
                    e.reason
                );
                self.progress.enter(Phase::Aborted);
                Err(e)
            }
        }
    }

    async fn execute(&mut self) -> Result<ScenarioReport, ScenarioError> {
        self.progress.enter(Phase::Provisioning);
        self.config.validate().map_err(|e| self.progress.abort(e))?;

        let layout = cluster_layout(&self.config);
        let homes = self
            .cluster
            .init(&layout)
            .await
            .map_err(|e| self.progress.abort(e))?;
        let cast = cast(&homes).ok_or_else(|| {
            self.progress.abort(syncwatch_cluster::BringupError::InvalidLayout(format!(
                "bringup returned {} homes without a validator and two observers",
                homes.len()
            )))
        })?;

        let dirs: Vec<_> = homes.iter().map(|home| home.dir.clone()).collect();
        self.seeder
            .seed(&self.dataset, &dirs)
            .await
            .map_err(|e| self.progress.abort(e))?;

        // The deadline covers node startup too
        let clock = ScenarioClock::start(self.clock.clone(), self.config.deadline);
        let leader = self
            .cluster
            .launch(cast.leader, None)
            .await
            .map_err(|e| self.progress.abort(e))?;
        for home in &cast.validators {
            self.cluster
                .launch(home, Some(&leader))
                .await
                .map_err(|e| self.progress.abort(e))?;
        }
        for home in &cast.early {
            self.cluster
                .add_observer(home, &leader)
                .await
                .map_err(|e| self.progress.abort(e))?;
        }

        let waiter = ProgressWaiter::new(&self.poller, &clock).with_window(self.config.window);
        let small = WaitTarget::height(self.config.small_height)
            .with_poll_interval(self.config.poll_interval);
        let large = WaitTarget::height(self.config.large_height)
            .with_poll_interval(self.config.poll_interval)
            .with_rate_floor(self.config.rate_floor);

        self.progress.enter(Phase::BaselineWait);
        let baseline = waiter
            .wait_for_height(&leader, &small)
            .await
            .map_err(|e| self.progress.abort(e))?;

        self.progress.enter(Phase::JoinLateNode);
        let late_node = self
            .cluster
            .add_observer(cast.late, &leader)
            .await
            .map_err(|e| self.progress.abort(e))?;

        self.progress.enter(Phase::DegradationWatch);
        let degradation = waiter
            .wait_for_height(&leader, &large)
            .await
            .map_err(|e| self.progress.abort(e))?;

        self.progress.enter(Phase::LateNodeCatchup);
        let catchup = waiter
            .wait_for_height(&late_node, &small)
            .await
            .map_err(|e| self.progress.abort(e))?;

        Ok(ScenarioReport {
            leader,
            late_node,
            baseline,
            degradation,
            catchup,
            phases: Vec::new(),
            elapsed: clock.elapsed(),
        })
    }
}

/// First validator leads, the last observer joins late
fn cast(homes: &[NodeHome]) -> Option<Cast<'_>> {
    let mut validators = homes.iter().filter(|home| home.role == NodeRole::Validator);
    let leader = validators.next()?;
    let mut observers: Vec<_> = homes
        .iter()
        .filter(|home| home.role == NodeRole::Observer)
        .collect();
    let late = observers.pop()?;
    if observers.is_empty() {
        return None;
    }
    Some(Cast {
        leader,
        validators: validators.collect(),
        early: observers,
        late,
    })
}
