//! Experiment execution.
//!
//! [`run_experiment`] drives one selection procedure against a fresh
//! [`SyntheticHost`]. [`run_repeated_experiments`] repeats an experiment
//! with different seeds in parallel to estimate how often the procedure
//! picks the truly best scenario.

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use select_core::{build_procedure, ProcedureKind, SelectionOutcome};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ExperimentFile;
use crate::error::Result;
use crate::synthetic::SyntheticHost;

/// One scenario's state at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRow {
    pub name: String,
    pub active: bool,
    pub replications: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    pub experiment_id: String,
    pub seed: u64,
    pub procedure: ProcedureKind,
    pub outcome: SelectionOutcome,
    pub selected_name: Option<String>,
    pub scenarios: Vec<ScenarioRow>,
}

impl SelectionReport {
    pub fn total_replications(&self) -> usize {
        self.scenarios.iter().map(|row| row.replications).sum()
    }
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Run the experiment described by `file` once.
///
/// Starts a [`SyntheticHost`] for the file's scenarios, drives the
/// configured procedure against it and summarises the final state of every
/// scenario.
///
/// # Arguments
///
/// * `file` - Validated experiment description
/// * `show_progress` - Whether to draw a percentage progress bar
///
/// # Errors
///
/// Returns an error if the host's thread pool cannot be built, if the
/// procedure rejects its configuration, or if the host is missing response
/// values mid-run. A cancelled run is not an error; it is reported through
/// the outcome's termination.
pub fn run_experiment(file: &ExperimentFile, show_progress: bool) -> Result<SelectionReport> {
    let bar = show_progress.then(|| {
        let bar = ProgressBar::new(100);
        bar.set_style(progress_style());
        bar.set_message(format!("{} ({})", file.experiment_id, file.procedure.as_str()));
        bar
    });
    run_with_bar(file, bar)
}

fn run_with_bar(file: &ExperimentFile, bar: Option<ProgressBar>) -> Result<SelectionReport> {
    let mut host = SyntheticHost::from_experiment(file)?;
    if let Some(bar) = &bar {
        host = host.with_progress(bar.clone());
    }

    info!(
        experiment = %file.experiment_id,
        procedure = file.procedure.as_str(),
        scenarios = file.scenarios.len(),
        seed = file.seed,
        "running selection experiment"
    );
    let procedure = build_procedure(file.procedure, file.params.clone(), file.gsp.clone());
    let outcome = procedure.run(&mut host)?;

    if let Some(bar) = &bar {
        bar.finish_with_message(format!("{:?}", outcome.termination));
    }

    let summaries = host.summaries();
    let selected_name = outcome
        .selected
        .and_then(|id| summaries.iter().find(|summary| summary.id == id))
        .map(|summary| summary.name.clone());
    info!(
        experiment = %file.experiment_id,
        termination = ?outcome.termination,
        selected = selected_name.as_deref().unwrap_or("-"),
        replications = outcome.replications_submitted,
        "selection finished"
    );

    Ok(SelectionReport {
        experiment_id: file.experiment_id.clone(),
        seed: file.seed,
        procedure: file.procedure,
        outcome,
        selected_name,
        scenarios: summaries
            .into_iter()
            .map(|summary| ScenarioRow {
                name: summary.name,
                active: summary.active,
                replications: summary.replications,
                mean: summary.mean,
                std_dev: summary.std_dev,
            })
            .collect(),
    })
}

/// Run `repetitions` independent copies of `file` in parallel.
///
/// Repetition `i` uses seed `file.seed + i`, so the set of runs is
/// reproducible. Reports come back in seed order regardless of which run
/// finishes first.
///
/// # Arguments
///
/// * `file` - Validated experiment description shared by every repetition
/// * `repetitions` - Number of independent runs
/// * `num_threads` - Optional number of threads for the outer pool (defaults to rayon's default)
/// * `show_progress` - Whether to draw a progress bar counting finished runs
///
/// # Errors
///
/// Returns an error if the outer thread pool cannot be built or if any run
/// fails. See [`run_experiment`].
pub fn run_repeated_experiments(
    file: &ExperimentFile,
    repetitions: usize,
    num_threads: Option<usize>,
    show_progress: bool,
) -> Result<Vec<SelectionReport>> {
    let pb = if show_progress && repetitions > 0 {
        let bar = ProgressBar::new(repetitions as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(bar)
    } else {
        None
    };

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = num_threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build()?;

    let pb_clone = pb.clone();
    let reports = pool.install(|| {
        (0..repetitions)
            .into_par_iter()
            .map(|repetition| {
                let mut copy = file.clone();
                copy.seed = file.seed.wrapping_add(repetition as u64);
                let report = run_with_bar(&copy, None);
                if let Some(ref progress_bar) = pb_clone {
                    progress_bar.inc(1);
                }
                report
            })
            .collect::<Result<Vec<_>>>()
    });

    if let Some(ref progress_bar) = pb {
        progress_bar.finish_with_message("Completed");
    }

    reports
}

/// Fraction of `reports` that selected the scenario with the best
/// distribution mean. `None` when there is nothing to score.
pub fn selection_accuracy(file: &ExperimentFile, reports: &[SelectionReport]) -> Option<f64> {
    let best = file.true_best()?;
    if reports.is_empty() {
        return None;
    }
    let hits = reports
        .iter()
        .filter(|report| report.outcome.selected.map(|id| id.0) == Some(best))
        .count();
    Some(hits as f64 / reports.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioSpec;
    use crate::distribution::ResponseDistribution;
    use select_core::host::Objective;
    use select_core::{Guarantee, Termination};

    fn constants(procedure: ProcedureKind) -> ExperimentFile {
        let mut file = ExperimentFile::new(
            procedure,
            Objective::Maximize,
            vec![
                ScenarioSpec::new("low", ResponseDistribution::Constant { value: 5.0 }),
                ScenarioSpec::new("high", ResponseDistribution::Constant { value: 10.0 }),
            ],
        );
        file.params.indifference_zone = Some(1.0);
        file.threads = Some(2);
        file
    }

    #[test]
    fn single_run_reports_the_winner() {
        let report = run_experiment(&constants(ProcedureKind::Kn), false).expect("run succeeds");

        assert_eq!(report.outcome.termination, Termination::SingleSurvivor);
        assert_eq!(report.selected_name.as_deref(), Some("high"));
        assert_eq!(report.outcome.guarantee, Guarantee::Formal);
        assert_eq!(report.total_replications(), 20);
        assert!(!report.scenarios[0].active);
        assert_eq!(report.scenarios[1].mean, Some(10.0));
        assert_eq!(report.scenarios[1].std_dev, Some(0.0));
    }

    #[test]
    fn repeated_runs_are_seeded_in_order() {
        let file = constants(ProcedureKind::Gsp);
        let reports = run_repeated_experiments(&file, 3, Some(2), false).expect("runs succeed");

        let seeds: Vec<u64> = reports.iter().map(|report| report.seed).collect();
        assert_eq!(seeds, vec![0, 1, 2]);
        assert_eq!(selection_accuracy(&file, &reports), Some(1.0));
    }

    #[test]
    fn accuracy_of_nothing_is_none() {
        assert_eq!(selection_accuracy(&constants(ProcedureKind::Kn), &[]), None);
    }
}
