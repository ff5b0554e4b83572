//! In-process experiment host backed by response distributions.
//!
//! Submitted jobs go over a channel to a dispatcher thread, which runs each
//! replication on a rayon pool. Workers report a `Running` and then a
//! `Completed` result over a bounded channel that the engine drains. A
//! cancel closes the result channel once in-flight work has been dropped,
//! which the engine sees as a `None` from `wait_for_result`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use indicatif::ProgressBar;
use select_core::host::{
    ExperimentHost, ReplicationJob, ReplicationResult, ReplicationStatus, ResponseDef, ResponseId,
    ScenarioId, ScenarioSnapshot, ScenarioUpdate,
};
use select_core::stats::{sample_mean, sample_variance};
use tracing::{debug, warn};

use crate::config::ExperimentFile;
use crate::distribution::{replication_rng, ResponseDistribution};
use crate::error::Result;

const RESULT_BUFFER: usize = 1024;
const DISPATCH_POLL: Duration = Duration::from_millis(20);

/// Shared flag that cancels a running experiment.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct HostScenario {
    name: String,
    active: bool,
    required: usize,
    completed: usize,
    values: BTreeMap<usize, f64>,
}

/// Summary of one scenario's recorded replications.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSummary {
    pub id: ScenarioId,
    pub name: String,
    pub active: bool,
    pub replications: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

pub struct SyntheticHost {
    scenarios: Vec<HostScenario>,
    response: ResponseDef,
    capacity: usize,
    job_tx: Option<Sender<ReplicationJob>>,
    result_rx: Option<Receiver<ReplicationResult>>,
    dispatcher: Option<JoinHandle<()>>,
    cancel: CancelHandle,
    cancel_after: Option<usize>,
    finished: usize,
    progress: Option<ProgressBar>,
}

impl SyntheticHost {
    /// Start a host for every scenario in `file`.
    pub fn from_experiment(file: &ExperimentFile) -> Result<Self> {
        file.validate()?;

        let mut builder = rayon::ThreadPoolBuilder::new()
            .thread_name(|index| format!("replication-worker-{index}"));
        if let Some(threads) = file.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;

        let distributions: Arc<Vec<ResponseDistribution>> = Arc::new(
            file.scenarios
                .iter()
                .map(|scenario| scenario.distribution.clone())
                .collect(),
        );
        let (job_tx, job_rx) = mpsc::channel::<ReplicationJob>();
        let (result_tx, result_rx) = mpsc::sync_channel::<ReplicationResult>(RESULT_BUFFER);
        let cancel = CancelHandle::default();

        let dispatcher = {
            let cancel = cancel.clone();
            let seed = file.seed;
            thread::Builder::new()
                .name("replication-dispatcher".into())
                .spawn(move || dispatch(job_rx, result_tx, pool, distributions, seed, cancel))?
        };

        Ok(Self {
            scenarios: file
                .scenarios
                .iter()
                .map(|spec| HostScenario {
                    name: spec.name.clone(),
                    active: spec.active,
                    required: 0,
                    completed: 0,
                    values: BTreeMap::new(),
                })
                .collect(),
            response: file.response_def(),
            capacity: file.simultaneous_replications.max(1),
            job_tx: Some(job_tx),
            result_rx: Some(result_rx),
            dispatcher: Some(dispatcher),
            cancel,
            cancel_after: file.cancel_after,
            finished: 0,
            progress: None,
        })
    }

    /// Show wave progress on `bar` (length 100).
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Replications that reported `Completed` so far, across all scenarios.
    pub fn replications_completed(&self) -> usize {
        self.scenarios.iter().map(|scenario| scenario.completed).sum()
    }

    pub fn summaries(&self) -> Vec<ScenarioSummary> {
        self.scenarios
            .iter()
            .enumerate()
            .map(|(index, scenario)| {
                let values: Vec<f64> = scenario.values.values().copied().collect();
                let mean = (!values.is_empty()).then(|| sample_mean(&values));
                let std_dev = mean
                    .filter(|_| values.len() > 1)
                    .map(|mean| sample_variance(&values, mean).sqrt());
                ScenarioSummary {
                    id: ScenarioId(index),
                    name: scenario.name.clone(),
                    active: scenario.active,
                    replications: scenario.completed,
                    mean,
                    std_dev,
                }
            })
            .collect()
    }

    fn close(&mut self) {
        self.cancel.cancel();
        self.job_tx = None;
        self.result_rx = None;
    }
}

impl Drop for SyntheticHost {
    fn drop(&mut self) {
        self.close();
        if let Some(handle) = self.dispatcher.take() {
            if handle.join().is_err() {
                warn!("replication dispatcher panicked");
            }
        }
    }
}

fn dispatch(
    jobs: Receiver<ReplicationJob>,
    results: SyncSender<ReplicationResult>,
    pool: rayon::ThreadPool,
    distributions: Arc<Vec<ResponseDistribution>>,
    seed: u64,
    cancel: CancelHandle,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let job = match jobs.recv_timeout(DISPATCH_POLL) {
            Ok(job) => job,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let results = results.clone();
        let distributions = Arc::clone(&distributions);
        let cancel = cancel.clone();
        pool.spawn(move || {
            if cancel.is_cancelled() {
                return;
            }
            if results
                .send(ReplicationResult::new(job, ReplicationStatus::Running))
                .is_err()
            {
                return;
            }
            let Some(distribution) = distributions.get(job.scenario.0) else {
                let _ = results.send(ReplicationResult::new(job, ReplicationStatus::Failed));
                return;
            };
            let mut rng = replication_rng(seed, job.scenario.0, job.replication);
            let value = distribution.sample(&mut rng);
            if cancel.is_cancelled() {
                return;
            }
            let _ = results.send(
                ReplicationResult::new(job, ReplicationStatus::Completed).with_values(vec![value]),
            );
        });
    }
    debug!("replication dispatcher stopped");
}

impl ExperimentHost for SyntheticHost {
    fn scenarios(&self) -> Vec<ScenarioSnapshot> {
        self.scenarios
            .iter()
            .enumerate()
            .map(|(index, scenario)| ScenarioSnapshot {
                id: ScenarioId(index),
                name: scenario.name.clone(),
                active: scenario.active,
                replications_required: scenario.required,
                replications_completed: scenario.completed,
            })
            .collect()
    }

    fn responses(&self) -> Vec<ResponseDef> {
        vec![self.response.clone()]
    }

    fn simultaneous_replications(&self) -> usize {
        self.capacity
    }

    fn apply(&mut self, update: ScenarioUpdate) {
        match update {
            ScenarioUpdate::RequireReplications { scenario, total } => {
                if let Some(target) = self.scenarios.get_mut(scenario.0) {
                    target.required = total;
                }
            }
            ScenarioUpdate::Deactivate { scenario } => {
                if let Some(target) = self.scenarios.get_mut(scenario.0) {
                    target.active = false;
                }
            }
        }
    }

    fn submit_replication(&mut self, job: ReplicationJob) {
        if let Some(tx) = &self.job_tx {
            if tx.send(job).is_err() {
                warn!(scenario = %job.scenario, replication = job.replication, "dispatcher gone; job dropped");
            }
        }
    }

    fn wait_for_result(&mut self) -> Option<ReplicationResult> {
        if self.cancel.is_cancelled() {
            self.close();
            return None;
        }
        let received = self.result_rx.as_ref()?.recv().ok();
        if received.is_none() {
            self.close();
        }
        received
    }

    fn record_result(&mut self, result: ReplicationResult) {
        if result.status.is_terminal() {
            self.finished += 1;
        }
        if result.status == ReplicationStatus::Completed {
            if let Some(scenario) = self.scenarios.get_mut(result.job.scenario.0) {
                scenario.completed += 1;
                if let Some(&value) = result.values.first() {
                    scenario.values.insert(result.job.replication, value);
                }
            }
        }
        if self.cancel_after.is_some_and(|limit| self.finished >= limit) && !self.cancel.is_cancelled() {
            warn!(finished = self.finished, "cancelling experiment as configured");
            self.cancel.cancel();
        }
    }

    fn report_progress(&mut self, percent: u32) {
        if let Some(bar) = &self.progress {
            bar.set_position(u64::from(percent.min(100)));
        }
    }

    fn response_value(&self, scenario: ScenarioId, response: ResponseId) -> Option<f64> {
        if response != self.response.id {
            return None;
        }
        let values = &self.scenarios.get(scenario.0)?.values;
        if values.is_empty() {
            return None;
        }
        Some(values.values().sum::<f64>() / values.len() as f64)
    }

    fn response_value_for_replication(
        &self,
        scenario: ScenarioId,
        response: ResponseId,
        replication: usize,
    ) -> Option<f64> {
        if response != self.response.id {
            return None;
        }
        self.scenarios.get(scenario.0)?.values.get(&replication).copied()
    }
}
