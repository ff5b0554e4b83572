//! Compare KN and GSP on the same synthetic problem.
//!
//! Run with `cargo run -p select_experiments --example kn_vs_gsp`.

use select_core::host::Objective;
use select_core::ProcedureKind;
use select_experiments::{
    run_repeated_experiments, selection_accuracy, ExperimentFile, ResponseDistribution,
    ScenarioSpec,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let scenarios: Vec<ScenarioSpec> = (0..25)
        .map(|i| {
            ScenarioSpec::new(
                format!("config_{i:02}"),
                ResponseDistribution::Normal {
                    mean: 20.0 - 0.4 * i as f64,
                    std_dev: 1.0 + 0.1 * i as f64,
                },
            )
        })
        .collect();

    for procedure in [ProcedureKind::Kn, ProcedureKind::Gsp] {
        let mut file = ExperimentFile::new(procedure, Objective::Maximize, scenarios.clone());
        file.experiment_id = format!("kn_vs_gsp_{}", procedure.as_str());
        file.params = file.params.with_indifference_zone(0.4).with_replication_limit(400);
        file.simultaneous_replications = 16;

        let reports = run_repeated_experiments(&file, 20, None, true)?;
        let accuracy = selection_accuracy(&file, &reports).unwrap_or(0.0);
        let replications = reports
            .iter()
            .map(|report| report.outcome.replications_submitted)
            .sum::<usize>() as f64
            / reports.len() as f64;
        println!(
            "{:>3}: correct selection {:5.1}%, {:8.1} replications per run",
            procedure.as_str(),
            accuracy * 100.0,
            replications
        );
    }
    Ok(())
}
