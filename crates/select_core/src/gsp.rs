//! Good Selection Procedure.
//!
//! Stage 0 sets run-time weights, stage 1 brings every scenario to a common
//! first-stage sample and derives variance-based batch sizes, stage 2 adds
//! batches and screens in rounds, and stage 3 tops up each survivor to its
//! Rinott sample size before picking the best mean.

pub mod batching;
pub mod screening;

use tracing::{debug, info, warn};

use crate::critical::{CriticalValues, NumericalCriticalValues};
use crate::error::Result;
use crate::host::ExperimentHost;
use crate::outcome::{Guarantee, ProcedureKind, SelectionOutcome, Termination};
use crate::params::{validate, GspSettings, ProcedureParams, ValidatedParams};
use crate::scenario::{active_scenarios, common_sample_size, eliminate, TrackedScenario};
use crate::stats::{replication_values, response_mean, ScenarioStats};
use crate::wave::WaveLedger;

pub use batching::calc_batch_sizes;
pub use screening::{Contender, ScreeningContext};

#[derive(Debug, Clone, PartialEq)]
pub struct GspProcedure<C = NumericalCriticalValues> {
    params: ProcedureParams,
    settings: GspSettings,
    critical: C,
}

impl GspProcedure {
    pub fn new(params: ProcedureParams) -> Self {
        Self {
            params,
            settings: GspSettings::default(),
            critical: NumericalCriticalValues::default(),
        }
    }
}

impl<C: CriticalValues> GspProcedure<C> {
    /// Replace the source of Rinott's `h` and `eta`.
    pub fn with_critical_values<D: CriticalValues>(self, critical: D) -> GspProcedure<D> {
        GspProcedure {
            params: self.params,
            settings: self.settings,
            critical,
        }
    }

    pub fn with_settings(mut self, settings: GspSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn params(&self) -> &ProcedureParams {
        &self.params
    }

    pub fn settings(&self) -> &GspSettings {
        &self.settings
    }

    /// Run all stages against `host`.
    pub fn run<H: ExperimentHost + ?Sized>(&self, host: &mut H) -> Result<SelectionOutcome> {
        let first_stage = self.settings.first_stage_size.max(2);
        let validated = validate(&self.params, &host.responses(), first_stage)?;
        let survivors = active_scenarios(host);

        if survivors.len() <= 1 {
            let outcome = SelectionOutcome::new(
                ProcedureKind::Gsp,
                Termination::NothingToSelect,
                &survivors,
                WaveLedger::default(),
            );
            return Ok(match survivors.first() {
                Some(only) => outcome.selecting(only.id, Guarantee::NotReached),
                None => outcome,
            });
        }

        let k = survivors.len();
        let alpha = validated.alpha;
        let eta = self.critical.eta(first_stage, alpha / 2.0, k);
        let rinott_h = self.critical.rinott(k, 1.0 - alpha / 2.0, first_stage - 1);
        let rbar = self.settings.batch_rounds(validated.replication_limit);
        info!(
            scenarios = k,
            eta,
            rinott_h,
            rbar,
            "starting GSP selection"
        );

        let mut run = GspRun {
            validated: &validated,
            settings: &self.settings,
            entries: survivors.into_iter().map(Entry::stage0).collect(),
            ledger: WaveLedger::default(),
            n1: first_stage,
            rbar,
            eta,
            rinott_h,
        };

        match run.stage1(host)? {
            Step::Continue => {}
            Step::Stop(termination) => return Ok(run.finish(termination)),
        }
        match run.stage2(host)? {
            Step::Continue => {}
            Step::Stop(termination) => return Ok(run.finish(termination)),
        }
        run.stage3(host)
    }
}

enum Step {
    Continue,
    Stop(Termination),
}

#[derive(Debug, Clone)]
struct Entry {
    scenario: TrackedScenario,
    stats: ScenarioStats,
    /// Relative run time of one replication.
    weight: f64,
}

impl Entry {
    fn stage0(scenario: TrackedScenario) -> Self {
        Self {
            scenario,
            stats: ScenarioStats {
                mean: 0.0,
                variance: 0.0,
                batch_size: 1,
                sample_count: 1,
            },
            weight: 1.0,
        }
    }

    fn contender(&self) -> Contender {
        Contender {
            id: self.scenario.id,
            mean: self.stats.mean,
            variance: self.stats.variance,
            batch_size: self.stats.batch_size,
            sample_count: self.stats.sample_count,
        }
    }
}

struct GspRun<'a> {
    validated: &'a ValidatedParams,
    settings: &'a GspSettings,
    entries: Vec<Entry>,
    ledger: WaveLedger,
    n1: usize,
    rbar: usize,
    eta: f64,
    rinott_h: f64,
}

impl GspRun<'_> {
    fn stage1<H: ExperimentHost + ?Sized>(&mut self, host: &mut H) -> Result<Step> {
        self.n1 = common_sample_size(&self.scenarios(), self.n1);
        for entry in self.entries.iter_mut() {
            entry.scenario.required = self.n1;
        }
        info!(n1 = self.n1, "GSP stage 1");
        if self.run_wave(host) {
            return Ok(Step::Stop(Termination::Cancelled));
        }

        let primary = &self.validated.primary;
        let mut first_stage = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let samples = replication_values(host, &entry.scenario, primary, self.n1)?;
            first_stage.push(ScenarioStats::from_samples(&samples));
        }
        let variances: Vec<f64> = first_stage.iter().map(|stats| stats.variance).collect();
        let weights: Vec<f64> = self.entries.iter().map(|entry| entry.weight).collect();
        let batches = calc_batch_sizes(&variances, &weights, self.settings.batch_size);

        for ((entry, stats), batch) in self.entries.iter_mut().zip(first_stage).zip(batches) {
            entry.stats = stats.with_batch_size(batch);
            debug!(
                scenario = %entry.scenario.name,
                variance = entry.stats.variance,
                batch_size = entry.stats.batch_size,
                "first-stage statistics"
            );
        }

        self.screen(host)?;
        Ok(self.after_screening())
    }

    fn stage2<H: ExperimentHost + ?Sized>(&mut self, host: &mut H) -> Result<Step> {
        let limit = self.validated.replication_limit;
        for round in 0..self.rbar {
            let mut all_pinned = true;
            for entry in self.entries.iter_mut() {
                let next = entry.scenario.required + entry.stats.batch_size;
                if next <= limit {
                    all_pinned = false;
                    entry.scenario.required = next;
                } else {
                    entry.scenario.required = limit.max(entry.scenario.completed);
                }
            }
            if all_pinned {
                debug!(round, "every survivor pinned at the replication limit");
                return Ok(Step::Continue);
            }

            info!(round, remaining = self.entries.len(), "GSP stage 2 round");
            if self.run_wave(host) {
                return Ok(Step::Stop(Termination::Cancelled));
            }
            self.screen(host)?;
            if let Step::Stop(termination) = self.after_screening() {
                return Ok(Step::Stop(termination));
            }
        }
        Ok(Step::Continue)
    }

    fn stage3<H: ExperimentHost + ?Sized>(&mut self, host: &mut H) -> Result<SelectionOutcome> {
        let limit = self.validated.replication_limit;
        let delta = self.validated.delta;
        let scale = self.rinott_h * self.rinott_h / (delta * delta);
        let mut guarantee_holds = true;

        for entry in self.entries.iter_mut() {
            let rinott_n = (scale * entry.stats.variance).ceil() as usize;
            if rinott_n > entry.scenario.completed {
                if rinott_n > limit {
                    guarantee_holds = false;
                    entry.scenario.required = limit.max(entry.scenario.completed);
                } else {
                    entry.scenario.required = rinott_n;
                }
            }
        }
        info!(remaining = self.entries.len(), guarantee_holds, "GSP stage 3");
        if self.run_wave(host) {
            return Ok(self.finish(Termination::Cancelled));
        }

        let objective = self.validated.objective();
        let mut best: Option<(usize, f64)> = None;
        for (index, entry) in self.entries.iter().enumerate() {
            let mean = response_mean(host, &entry.scenario, &self.validated.primary)?;
            best = match best {
                Some((_, incumbent)) if !objective.is_better(mean, incumbent) => best,
                _ => Some((index, mean)),
            };
        }
        let Some((best_index, best_mean)) = best else {
            return Ok(self.finish(Termination::RinottSelection));
        };
        let winner = self.entries[best_index].scenario.clone();

        let guarantee = if guarantee_holds {
            let keep: Vec<bool> = (0..self.entries.len()).map(|i| i == best_index).collect();
            eliminate(host, &mut self.entries, &keep, |entry| &entry.scenario);
            info!(winner = %winner.name, mean = best_mean, "GSP selected a scenario");
            Guarantee::Formal
        } else {
            warn!(
                winner = %winner.name,
                mean = best_mean,
                limit,
                "replication limit voided the Rinott guarantee; other scenarios left active"
            );
            Guarantee::Void
        };

        Ok(self
            .finish(Termination::RinottSelection)
            .selecting(winner.id, guarantee))
    }

    /// Refresh means from the host and drop screened-out scenarios.
    fn screen<H: ExperimentHost + ?Sized>(&mut self, host: &mut H) -> Result<()> {
        for entry in self.entries.iter_mut() {
            let mean = response_mean(host, &entry.scenario, &self.validated.primary)?;
            entry.stats.update_mean(mean, entry.scenario.completed);
        }

        let context = ScreeningContext {
            objective: self.validated.objective(),
            n1: self.n1,
            rbar: self.rbar,
            eta: self.eta,
        };
        let contenders: Vec<Contender> = self.entries.iter().map(Entry::contender).collect();
        let keep = context.keep_mask(&contenders);
        let eliminated = eliminate(host, &mut self.entries, &keep, |entry| &entry.scenario);
        info!(eliminated, remaining = self.entries.len(), "GSP screening pass");
        Ok(())
    }

    fn after_screening(&self) -> Step {
        if self.entries.len() <= 1 {
            Step::Stop(Termination::SingleSurvivor)
        } else {
            Step::Continue
        }
    }

    /// Run one wave over the current entries. Returns true when cancelled.
    fn run_wave<H: ExperimentHost + ?Sized>(&mut self, host: &mut H) -> bool {
        let mut scenarios = self.scenarios();
        let cancelled = self.ledger.run(host, &mut scenarios).is_cancelled();
        for (entry, scenario) in self.entries.iter_mut().zip(scenarios) {
            entry.scenario = scenario;
        }
        cancelled
    }

    fn scenarios(&self) -> Vec<TrackedScenario> {
        self.entries
            .iter()
            .map(|entry| entry.scenario.clone())
            .collect()
    }

    fn finish(&self, termination: Termination) -> SelectionOutcome {
        let survivors = self.scenarios();
        let outcome =
            SelectionOutcome::new(ProcedureKind::Gsp, termination, &survivors, self.ledger);
        match (termination, survivors.as_slice()) {
            (Termination::SingleSurvivor, [winner]) => {
                info!(winner = %winner.name, "GSP screened down to a single scenario");
                outcome.selecting(winner.id, Guarantee::Formal)
            }
            _ => outcome,
        }
    }
}
