use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use select_core::ProcedureKind;
use select_experiments::{
    export_to_csv, export_to_json, load_experiment_file, run_experiment,
    run_repeated_experiments, selection_accuracy, ExperimentError, SelectionReport,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum ProcedureArg {
    Kn,
    Gsp,
}

impl From<ProcedureArg> for ProcedureKind {
    fn from(arg: ProcedureArg) -> Self {
        match arg {
            ProcedureArg::Kn => ProcedureKind::Kn,
            ProcedureArg::Gsp => ProcedureKind::Gsp,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "select_best",
    about = "Select the best scenario of a synthetic experiment with KN or GSP"
)]
struct Cli {
    /// Experiment file (JSON)
    #[arg(long, env = "SELECT_BEST_CONFIG")]
    config: PathBuf,
    /// Override the procedure named in the file
    #[arg(long, value_enum)]
    procedure: Option<ProcedureArg>,
    /// Worker threads for the synthetic host
    #[arg(long)]
    threads: Option<usize>,
    /// Run the experiment this many times with consecutive seeds
    #[arg(long, default_value_t = 1)]
    repeat: usize,
    /// Write the reports as JSON
    #[arg(long)]
    json: Option<PathBuf>,
    /// Write the reports as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Hide progress bars
    #[arg(long)]
    no_progress: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,select_best=info,select_experiments=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &SelectionReport) {
    let outcome = &report.outcome;
    println!(
        "{} [{} seed {}]: {:?}, guarantee {:?}, {} waves, {} replications",
        report.experiment_id,
        report.procedure.as_str(),
        report.seed,
        outcome.termination,
        outcome.guarantee,
        outcome.waves,
        outcome.replications_submitted,
    );
    println!("  selected: {}", report.selected_name.as_deref().unwrap_or("none"));
    for row in &report.scenarios {
        println!(
            "  {:<20} active={:<5} n={:<5} mean={:<12} sd={}",
            row.name,
            row.active,
            row.replications,
            row.mean.map(|m| format!("{m:.4}")).unwrap_or_else(|| "-".into()),
            row.std_dev.map(|s| format!("{s:.4}")).unwrap_or_else(|| "-".into()),
        );
    }
}

fn run(cli: Cli) -> Result<(), ExperimentError> {
    let mut file = load_experiment_file(&cli.config)?;
    if let Some(procedure) = cli.procedure {
        file.procedure = procedure.into();
    }
    if cli.threads.is_some() {
        file.threads = cli.threads;
    }

    let reports = if cli.repeat <= 1 {
        vec![run_experiment(&file, !cli.no_progress)?]
    } else {
        run_repeated_experiments(&file, cli.repeat, None, !cli.no_progress)?
    };

    if reports.len() == 1 {
        print_report(&reports[0]);
    } else if let Some(accuracy) = selection_accuracy(&file, &reports) {
        let mean_replications = reports
            .iter()
            .map(|report| report.outcome.replications_submitted)
            .sum::<usize>() as f64
            / reports.len() as f64;
        println!(
            "{} runs of {}: selected the best scenario {:.1}% of the time, {:.1} replications on average",
            reports.len(),
            file.procedure.as_str(),
            accuracy * 100.0,
            mean_replications,
        );
    }

    if let Some(path) = &cli.json {
        export_to_json(&reports, path)?;
        println!("wrote {}", path.display());
    }
    if let Some(path) = &cli.csv {
        export_to_csv(&reports, path)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
