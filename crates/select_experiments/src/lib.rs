//! Synthetic experiments for the selection engine.
//!
//! This crate wires `select_core` to an in-process host whose scenarios
//! are response distributions, so the KN and GSP procedures can be run,
//! repeated and compared without a simulation engine.
//!
//! # Quick Start
//!
//! ```no_run
//! use select_experiments::{load_experiment_file, run_experiment, export_to_json};
//!
//! let file = load_experiment_file("experiments/ten_normals.json").unwrap();
//! let report = run_experiment(&file, true).unwrap();
//! println!("selected: {:?}", report.selected_name);
//! export_to_json(&[report], "report.json").unwrap();
//! ```
//!
//! - [`config`]: experiment file format and validation
//! - [`distribution`]: per-scenario response distributions
//! - [`synthetic`]: the threaded [`synthetic::SyntheticHost`]
//! - [`runner`]: single and repeated runs with progress bars
//! - [`export`]: JSON and CSV export of reports

pub mod config;
pub mod distribution;
pub mod error;
pub mod export;
pub mod runner;
pub mod synthetic;

pub use config::{load_experiment_file, ExperimentFile, ScenarioSpec};
pub use distribution::ResponseDistribution;
pub use error::{ExperimentError, Result};
pub use export::{export_to_csv, export_to_json};
pub use runner::{
    run_experiment, run_repeated_experiments, selection_accuracy, ScenarioRow, SelectionReport,
};
pub use synthetic::{CancelHandle, SyntheticHost};
