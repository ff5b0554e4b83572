//! Test helpers for driving the procedures without a simulation engine.
//!
//! [`ScriptedHost`] answers every submitted replication immediately with a
//! value produced by a per-scenario generator, and records everything the
//! engine asks of it so tests can assert on the exchange.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::host::{
    ExperimentHost, Objective, ReplicationJob, ReplicationResult, ReplicationStatus, ResponseDef,
    ResponseId, ScenarioId, ScenarioSnapshot, ScenarioUpdate,
};

/// Replication number to response value.
pub type Generator = Box<dyn Fn(usize) -> f64 + Send>;

/// The single primary response used by [`ScriptedHost::new`].
pub fn primary_response(objective: Objective) -> ResponseDef {
    ResponseDef {
        id: ResponseId(0),
        name: "primary".to_string(),
        objective,
        primary: true,
    }
}

/// Always `value`.
pub fn constant(value: f64) -> impl Fn(usize) -> f64 + Send + 'static {
    move |_| value
}

/// `centre - spread` on odd replications, `centre + spread` on even ones.
pub fn alternating(centre: f64, spread: f64) -> impl Fn(usize) -> f64 + Send + 'static {
    move |replication| {
        if replication % 2 == 1 {
            centre - spread
        } else {
            centre + spread
        }
    }
}

struct ScriptedScenario {
    name: String,
    active: bool,
    required: usize,
    completed: usize,
    generator: Generator,
    values: BTreeMap<usize, f64>,
}

/// In-memory [`ExperimentHost`] with scripted replication values.
pub struct ScriptedHost {
    scenarios: Vec<ScriptedScenario>,
    responses: Vec<ResponseDef>,
    capacity: usize,
    queue: VecDeque<ReplicationResult>,
    statuses: HashMap<(usize, usize), ReplicationStatus>,
    cancel_after: Option<usize>,
    delivered: usize,
    emit_running: bool,
    withhold_values: bool,
    submitted: Vec<ReplicationJob>,
    recorded: Vec<ReplicationResult>,
    progress: Vec<u32>,
    updates: Vec<ScenarioUpdate>,
}

impl ScriptedHost {
    pub fn new(objective: Objective) -> Self {
        Self {
            scenarios: Vec::new(),
            responses: vec![primary_response(objective)],
            capacity: 1,
            queue: VecDeque::new(),
            statuses: HashMap::new(),
            cancel_after: None,
            delivered: 0,
            emit_running: false,
            withhold_values: false,
            submitted: Vec::new(),
            recorded: Vec::new(),
            progress: Vec::new(),
            updates: Vec::new(),
        }
    }

    pub fn with_scenario<F>(mut self, name: &str, generator: F) -> Self
    where
        F: Fn(usize) -> f64 + Send + 'static,
    {
        self.scenarios.push(ScriptedScenario {
            name: name.to_string(),
            active: true,
            required: 0,
            completed: 0,
            generator: Box::new(generator),
            values: BTreeMap::new(),
        });
        self
    }

    /// Add a scenario that starts out inactive.
    pub fn with_inactive_scenario(mut self, name: &str) -> Self {
        self = self.with_scenario(name, constant(0.0));
        if let Some(last) = self.scenarios.last_mut() {
            last.active = false;
        }
        self
    }

    /// Mark the most recently added scenario as having already run
    /// replications `1..=replications`.
    pub fn with_prior_replications(mut self, replications: usize) -> Self {
        if let Some(last) = self.scenarios.last_mut() {
            for replication in 1..=replications {
                let value = (last.generator)(replication);
                last.values.insert(replication, value);
            }
            last.required = replications;
            last.completed = replications;
        }
        self
    }

    pub fn with_responses(mut self, responses: Vec<ResponseDef>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Report a cancelled run once `results` results have been handed out.
    pub fn cancel_after(mut self, results: usize) -> Self {
        self.cancel_after = Some(results);
        self
    }

    /// Report `status` instead of `Completed` for one replication.
    pub fn with_status(
        mut self,
        scenario: usize,
        replication: usize,
        status: ReplicationStatus,
    ) -> Self {
        self.statuses.insert((scenario, replication), status);
        self
    }

    /// Precede every terminal result with a `Running` one.
    pub fn emit_running(mut self) -> Self {
        self.emit_running = true;
        self
    }

    /// Answer every response query with `None`.
    pub fn withhold_values(mut self) -> Self {
        self.withhold_values = true;
        self
    }

    pub fn is_active(&self, scenario: usize) -> bool {
        self.scenarios[scenario].active
    }

    pub fn required(&self, scenario: usize) -> usize {
        self.scenarios[scenario].required
    }

    pub fn completed(&self, scenario: usize) -> usize {
        self.scenarios[scenario].completed
    }

    pub fn submitted(&self) -> &[ReplicationJob] {
        &self.submitted
    }

    pub fn recorded(&self) -> &[ReplicationResult] {
        &self.recorded
    }

    pub fn progress(&self) -> &[u32] {
        &self.progress
    }

    pub fn updates(&self) -> &[ScenarioUpdate] {
        &self.updates
    }
}

impl ExperimentHost for ScriptedHost {
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
        self.responses.clone()
    }

    fn simultaneous_replications(&self) -> usize {
        self.capacity
    }

    fn apply(&mut self, update: ScenarioUpdate) {
        self.updates.push(update);
        match update {
            ScenarioUpdate::RequireReplications { scenario, total } => {
                self.scenarios[scenario.0].required = total;
            }
            ScenarioUpdate::Deactivate { scenario } => {
                self.scenarios[scenario.0].active = false;
            }
        }
    }

    fn submit_replication(&mut self, job: ReplicationJob) {
        self.submitted.push(job);
        let value = (self.scenarios[job.scenario.0].generator)(job.replication);
        let status = self
            .statuses
            .get(&(job.scenario.0, job.replication))
            .copied()
            .unwrap_or(ReplicationStatus::Completed);

        if self.emit_running {
            self.queue
                .push_back(ReplicationResult::new(job, ReplicationStatus::Running));
        }
        self.queue
            .push_back(ReplicationResult::new(job, status).with_values(vec![value]));
    }

    fn wait_for_result(&mut self) -> Option<ReplicationResult> {
        if self.cancel_after.is_some_and(|limit| self.delivered >= limit) {
            return None;
        }
        let result = self.queue.pop_front()?;
        self.delivered += 1;
        Some(result)
    }

    fn record_result(&mut self, result: ReplicationResult) {
        if result.status == ReplicationStatus::Completed {
            let scenario = &mut self.scenarios[result.job.scenario.0];
            scenario.completed += 1;
            if let Some(&value) = result.values.first() {
                scenario.values.insert(result.job.replication, value);
            }
        }
        self.recorded.push(result);
    }

    fn report_progress(&mut self, percent: u32) {
        self.progress.push(percent);
    }

    fn response_value(&self, scenario: ScenarioId, _response: ResponseId) -> Option<f64> {
        if self.withhold_values {
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
        _response: ResponseId,
        replication: usize,
    ) -> Option<f64> {
        if self.withhold_values {
            return None;
        }
        self.scenarios
            .get(scenario.0)?
            .values
            .get(&replication)
            .copied()
    }
}
