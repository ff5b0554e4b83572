//! Replication wave scheduling.
//!
//! A wave pushes every tracked scenario up to its required replication
//! count. Jobs are submitted replication-major: replication `r` of every
//! scenario goes out before replication `r + 1` of any scenario, so that a
//! parallel host does not end up running one scenario on all its workers.
//! The wave then drains results until every submitted job has reported a
//! terminal status.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::host::{
    ExperimentHost, ReplicationJob, ReplicationStatus, ScenarioId, ScenarioUpdate,
};
use crate::scenario::TrackedScenario;

/// How a wave ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveOutcome {
    Completed { submitted: usize },
    Cancelled { submitted: usize, completed: usize },
}

impl WaveOutcome {
    pub fn submitted(&self) -> usize {
        match *self {
            WaveOutcome::Completed { submitted } | WaveOutcome::Cancelled { submitted, .. } => {
                submitted
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaveOutcome::Cancelled { .. })
    }
}

/// Jobs needed to bring every scenario from its completed count up to its
/// required count, in replication-major order.
pub fn plan_wave(scenarios: &[TrackedScenario]) -> Vec<ReplicationJob> {
    let Some(lowest) = scenarios.iter().map(|s| s.completed).min() else {
        return Vec::new();
    };
    let highest = scenarios.iter().map(|s| s.required).max().unwrap_or(0);

    let mut jobs = Vec::new();
    for replication in (lowest + 1)..=highest {
        for scenario in scenarios {
            if scenario.completed < replication && replication <= scenario.required {
                jobs.push(ReplicationJob {
                    scenario: scenario.id,
                    replication,
                });
            }
        }
    }
    jobs
}

/// Apply the required counts, submit the wave and block until it drains.
///
/// Returns [`WaveOutcome::Cancelled`] as soon as the host signals a
/// cancelled run, or after draining if any replication came back
/// `Canceled`. On normal completion the completed counts of `scenarios`
/// are refreshed from the host.
pub fn run_wave<H: ExperimentHost + ?Sized>(
    host: &mut H,
    scenarios: &mut [TrackedScenario],
) -> WaveOutcome {
    for scenario in scenarios.iter() {
        host.apply(ScenarioUpdate::RequireReplications {
            scenario: scenario.id,
            total: scenario.required,
        });
    }

    let jobs = plan_wave(scenarios);
    let submitted = jobs.len();
    if submitted == 0 {
        refresh_completed(host, scenarios);
        return WaveOutcome::Completed { submitted: 0 };
    }

    info!(
        scenarios = scenarios.len(),
        replications = submitted,
        "submitting replication wave"
    );
    for job in jobs {
        host.submit_replication(job);
    }

    let mut completed = 0usize;
    let mut saw_canceled = false;
    while completed < submitted {
        let Some(result) = host.wait_for_result() else {
            warn!(completed, submitted, "run cancelled while waiting for results");
            return WaveOutcome::Cancelled {
                submitted,
                completed,
            };
        };

        if result.status.is_terminal() {
            completed += 1;
            host.report_progress(progress_percent(completed, submitted));
        }
        if result.status == ReplicationStatus::Canceled {
            saw_canceled = true;
        }
        host.record_result(result);
    }

    if saw_canceled {
        warn!(submitted, "replications were cancelled during the wave");
        return WaveOutcome::Cancelled {
            submitted,
            completed,
        };
    }

    refresh_completed(host, scenarios);
    debug!(submitted, "wave drained");
    WaveOutcome::Completed { submitted }
}

fn progress_percent(completed: usize, submitted: usize) -> u32 {
    if submitted == 0 {
        return 100;
    }
    ((completed as f64 / submitted as f64) * 100.0) as u32
}

fn refresh_completed<H: ExperimentHost + ?Sized>(host: &H, scenarios: &mut [TrackedScenario]) {
    let completed: HashMap<ScenarioId, usize> = host
        .scenarios()
        .into_iter()
        .map(|snapshot| (snapshot.id, snapshot.replications_completed))
        .collect();
    for scenario in scenarios.iter_mut() {
        if let Some(&count) = completed.get(&scenario.id) {
            scenario.completed = count;
        }
    }
}

/// Wave counters accumulated over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaveLedger {
    pub waves: usize,
    pub replications_submitted: usize,
}

impl WaveLedger {
    pub fn run<H: ExperimentHost + ?Sized>(
        &mut self,
        host: &mut H,
        scenarios: &mut [TrackedScenario],
    ) -> WaveOutcome {
        let outcome = run_wave(host, scenarios);
        self.waves += 1;
        self.replications_submitted += outcome.submitted();
        outcome
    }
}
