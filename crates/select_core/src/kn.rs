//! Kim–Nelson sequential screening.
//!
//! All scenarios are brought to a common sample size, then the procedure
//! alternates between a fully pairwise screening pass and a round of extra
//! replications for the survivors, until one scenario is left or the
//! replication limit is reached.

use tracing::info;

use crate::error::Result;
use crate::host::{ExperimentHost, Objective};
use crate::outcome::{Guarantee, ProcedureKind, SelectionOutcome, Termination};
use crate::params::{validate, ProcedureParams, ValidatedParams, KN_MIN_REPLICATIONS};
use crate::scenario::{active_scenarios, common_sample_size, eliminate, TrackedScenario};
use crate::stats::{replication_values, sample_mean};
use crate::wave::WaveLedger;

#[derive(Debug, Clone, PartialEq)]
pub struct KnProcedure {
    params: ProcedureParams,
}

impl KnProcedure {
    pub fn new(params: ProcedureParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ProcedureParams {
        &self.params
    }

    /// Run the procedure against `host`.
    ///
    /// Eliminated scenarios are deactivated on the host as they are
    /// screened out; the outcome says why the run stopped.
    pub fn run<H: ExperimentHost + ?Sized>(&self, host: &mut H) -> Result<SelectionOutcome> {
        let validated = validate(&self.params, &host.responses(), KN_MIN_REPLICATIONS)?;
        let mut survivors = active_scenarios(host);
        let mut ledger = WaveLedger::default();

        if survivors.len() <= 1 {
            let outcome = SelectionOutcome::new(
                ProcedureKind::Kn,
                Termination::NothingToSelect,
                &survivors,
                ledger,
            );
            return Ok(match survivors.first() {
                Some(only) => outcome.selecting(only.id, Guarantee::NotReached),
                None => outcome,
            });
        }

        let screen = KnScreen {
            objective: validated.objective(),
            confidence: validated.confidence(),
            delta: validated.delta,
            scenario_count: host.scenarios().len(),
        };
        info!(
            scenarios = screen.scenario_count,
            active = survivors.len(),
            confidence = screen.confidence,
            delta = screen.delta,
            "starting KN selection"
        );

        let seed = common_sample_size(&survivors, KN_MIN_REPLICATIONS);
        for scenario in survivors.iter_mut() {
            scenario.required = seed;
        }
        if ledger.run(host, &mut survivors).is_cancelled() {
            return Ok(cancelled(&survivors, ledger));
        }

        loop {
            self.screen_round(host, &validated, &screen, &mut survivors)?;

            if survivors.len() <= 1 {
                let outcome = SelectionOutcome::new(
                    ProcedureKind::Kn,
                    Termination::SingleSurvivor,
                    &survivors,
                    ledger,
                );
                return Ok(match survivors.first() {
                    Some(winner) => {
                        info!(winner = %winner.name, "KN selected a single scenario");
                        outcome.selecting(winner.id, Guarantee::Formal)
                    }
                    None => outcome,
                });
            }

            let limit = validated.replication_limit;
            if sample_size(&survivors) >= limit {
                info!(
                    remaining = survivors.len(),
                    limit, "KN reached the replication limit"
                );
                return Ok(SelectionOutcome::new(
                    ProcedureKind::Kn,
                    Termination::ReplicationLimit,
                    &survivors,
                    ledger,
                ));
            }

            let step = (host.simultaneous_replications() / survivors.len()).max(1);
            grow(&mut survivors, step, limit);
            if ledger.run(host, &mut survivors).is_cancelled() {
                return Ok(cancelled(&survivors, ledger));
            }
        }
    }

    fn screen_round<H: ExperimentHost + ?Sized>(
        &self,
        host: &mut H,
        validated: &ValidatedParams,
        screen: &KnScreen,
        survivors: &mut Vec<TrackedScenario>,
    ) -> Result<()> {
        let n = sample_size(survivors);
        let observations = survivors
            .iter()
            .map(|scenario| replication_values(host, scenario, &validated.primary, n))
            .collect::<Result<Vec<_>>>()?;

        let keep = screen.keep_mask(&observations);
        let eliminated = eliminate(host, survivors, &keep, |scenario| scenario);
        info!(
            sample_size = n,
            eliminated,
            remaining = survivors.len(),
            "KN screening pass"
        );
        Ok(())
    }
}

fn sample_size(scenarios: &[TrackedScenario]) -> usize {
    scenarios
        .iter()
        .map(|scenario| scenario.completed)
        .min()
        .unwrap_or(0)
}

/// Raise every requirement by `step`, capped at `limit` but never below
/// what the host has already completed.
fn grow(survivors: &mut [TrackedScenario], step: usize, limit: usize) {
    for scenario in survivors.iter_mut() {
        scenario.required = (scenario.required + step)
            .min(limit)
            .max(scenario.completed);
    }
}

fn cancelled(survivors: &[TrackedScenario], ledger: WaveLedger) -> SelectionOutcome {
    SelectionOutcome::new(ProcedureKind::Kn, Termination::Cancelled, survivors, ledger)
}

/// The pairwise elimination rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnScreen {
    pub objective: Objective,
    /// Probability of correct selection, `1 - alpha`.
    pub confidence: f64,
    pub delta: f64,
    /// Number of scenarios in the experiment, parked ones included.
    pub scenario_count: usize,
}

impl KnScreen {
    /// `H = 2 Q (n - 1)` with `Q = ((2 (1 - PCS) / (k - 1))^(-2 / (n - 1)) - 1) / 2`.
    pub fn critical_constant(&self, n: usize) -> f64 {
        let k = self.scenario_count.max(2) as f64;
        let dof = (n.max(2) - 1) as f64;
        let q = 0.5 * ((2.0 * (1.0 - self.confidence) / (k - 1.0)).powf(-2.0 / dof) - 1.0);
        2.0 * q * dof
    }

    /// Which rows of `observations` survive one screening pass.
    ///
    /// Every row holds the same number `n >= 2` of replication values of one
    /// scenario. Row `i` is eliminated when its mean trails some other
    /// row's mean by more than the pair's whisker.
    pub fn keep_mask(&self, observations: &[Vec<f64>]) -> Vec<bool> {
        let k = observations.len();
        let n = observations.iter().map(Vec::len).min().unwrap_or(0);
        if k < 2 || n < 2 {
            return vec![true; k];
        }

        let means: Vec<f64> = observations
            .iter()
            .map(|row| sample_mean(&row[..n]))
            .collect();
        let h = self.critical_constant(n);
        let n_f = n as f64;

        (0..k)
            .map(|i| {
                (0..k).filter(|&j| j != i).all(|j| {
                    let s2 = paired_variance(
                        &observations[i][..n],
                        &observations[j][..n],
                        means[i],
                        means[j],
                    );
                    let spread = h * s2 / (self.delta * self.delta) - n_f;
                    let whisker = (self.delta / (2.0 * n_f) * spread).max(0.0);
                    match self.objective {
                        Objective::Maximize => means[i] >= means[j] - whisker,
                        Objective::Minimize => means[i] <= means[j] + whisker,
                        Objective::None => true,
                    }
                })
            })
            .collect()
    }
}

/// Sample variance of the replication-wise differences `x_t - y_t`.
fn paired_variance(x: &[f64], y: &[f64], mean_x: f64, mean_y: f64) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let sum: f64 = x
        .iter()
        .zip(y)
        .map(|(a, b)| {
            let d = a - b - mean_x + mean_y;
            d * d
        })
        .sum();
    sum / (n - 1) as f64
}
