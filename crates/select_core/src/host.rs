//! The interface between the selection engine and the simulation host.
//!
//! The host owns scenario definitions and runs replications. The engine
//! only reads snapshots, sends [`ScenarioUpdate`] messages, submits
//! [`ReplicationJob`]s and pulls [`ReplicationResult`]s back.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to a host scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScenarioId(pub usize);

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle to a host response (an output statistic of a replication).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseId(pub usize);

/// Direction in which a response improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    None,
    Maximize,
    Minimize,
}

impl Objective {
    /// True when `candidate` is strictly better than `incumbent`.
    /// Always false for [`Objective::None`].
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Objective::Maximize => candidate > incumbent,
            Objective::Minimize => candidate < incumbent,
            Objective::None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseDef {
    pub id: ResponseId,
    pub name: String,
    pub objective: Objective,
    pub primary: bool,
}

/// Point-in-time view of a host scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSnapshot {
    pub id: ScenarioId,
    pub name: String,
    pub active: bool,
    pub replications_required: usize,
    pub replications_completed: usize,
}

/// State change the engine asks the host to apply.
///
/// There is deliberately no way to re-activate a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioUpdate {
    RequireReplications { scenario: ScenarioId, total: usize },
    Deactivate { scenario: ScenarioId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplicationStatus {
    Running,
    Completed,
    Canceled,
    Failed,
    Pending,
    Idle,
}

impl ReplicationStatus {
    /// Completed, canceled and failed replications are finished for good.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReplicationStatus::Completed | ReplicationStatus::Canceled | ReplicationStatus::Failed
        )
    }
}

/// One replication the engine asks the host to run. Replication numbers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplicationJob {
    pub scenario: ScenarioId,
    pub replication: usize,
}

/// Status report for a submitted replication.
///
/// `values` is host data indexed by [`ResponseId`]; the engine never reads
/// it, it only hands the result back through [`ExperimentHost::record_result`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationResult {
    pub job: ReplicationJob,
    pub status: ReplicationStatus,
    pub values: Vec<f64>,
}

impl ReplicationResult {
    pub fn new(job: ReplicationJob, status: ReplicationStatus) -> Self {
        Self {
            job,
            status,
            values: Vec::new(),
        }
    }

    pub fn with_values(mut self, values: Vec<f64>) -> Self {
        self.values = values;
        self
    }
}

/// Host-side services consumed by the selection procedures.
pub trait ExperimentHost {
    /// All scenarios known to the host, active or not.
    fn scenarios(&self) -> Vec<ScenarioSnapshot>;

    /// All responses defined on the experiment.
    fn responses(&self) -> Vec<ResponseDef>;

    /// How many replications the host can run at once.
    fn simultaneous_replications(&self) -> usize;

    fn apply(&mut self, update: ScenarioUpdate);

    /// Fire-and-forget submission.
    fn submit_replication(&mut self, job: ReplicationJob);

    /// Block until the next result is available. `None` means the user
    /// cancelled the whole run and no further results will arrive.
    fn wait_for_result(&mut self) -> Option<ReplicationResult>;

    /// Must be called for every result received, terminal or not.
    fn record_result(&mut self, result: ReplicationResult);

    fn report_progress(&mut self, percent: u32);

    /// Aggregate value of `response` over the completed replications.
    fn response_value(&self, scenario: ScenarioId, response: ResponseId) -> Option<f64>;

    fn response_value_for_replication(
        &self,
        scenario: ScenarioId,
        response: ResponseId,
        replication: usize,
    ) -> Option<f64>;
}
