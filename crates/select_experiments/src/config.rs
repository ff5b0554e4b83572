//! Experiment files.
//!
//! An experiment file describes a synthetic selection problem: the
//! procedure to run, its parameters, the primary response and one
//! distribution per scenario. Files are JSON with defaults for everything
//! except the response objective and the scenarios.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use select_core::host::{Objective, ResponseDef, ResponseId};
use select_core::{GspSettings, ProcedureKind, ProcedureParams, ValidationError};
use serde::{Deserialize, Serialize};

use crate::distribution::ResponseDistribution;
use crate::error::Result;

pub const DEFAULT_SIMULTANEOUS_REPLICATIONS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentFile {
    #[serde(default = "default_experiment_id")]
    pub experiment_id: String,
    #[serde(default)]
    pub procedure: ProcedureKind,
    pub response: ResponseSpec,
    #[serde(default)]
    pub params: ProcedureParams,
    #[serde(default)]
    pub gsp: GspSettings,
    pub scenarios: Vec<ScenarioSpec>,
    /// Worker threads of the synthetic host; rayon's default when absent.
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default = "default_simultaneous_replications")]
    pub simultaneous_replications: usize,
    #[serde(default)]
    pub seed: u64,
    /// Simulate a user cancel after this many finished replications.
    #[serde(default)]
    pub cancel_after: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    #[serde(default = "default_response_name")]
    pub name: String,
    pub objective: Objective,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    pub distribution: ResponseDistribution,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl ScenarioSpec {
    pub fn new(name: impl Into<String>, distribution: ResponseDistribution) -> Self {
        Self {
            name: name.into(),
            distribution,
            active: true,
        }
    }
}

fn default_experiment_id() -> String {
    "experiment".to_string()
}

fn default_response_name() -> String {
    "response".to_string()
}

fn default_active() -> bool {
    true
}

fn default_simultaneous_replications() -> usize {
    DEFAULT_SIMULTANEOUS_REPLICATIONS
}

impl ExperimentFile {
    /// A file with default settings for `scenarios`.
    pub fn new(procedure: ProcedureKind, objective: Objective, scenarios: Vec<ScenarioSpec>) -> Self {
        Self {
            experiment_id: default_experiment_id(),
            procedure,
            response: ResponseSpec {
                name: default_response_name(),
                objective,
            },
            params: ProcedureParams::default(),
            gsp: GspSettings::default(),
            scenarios,
            threads: None,
            simultaneous_replications: DEFAULT_SIMULTANEOUS_REPLICATIONS,
            seed: 0,
            cancel_after: None,
        }
    }

    /// The primary response as the engine sees it.
    pub fn response_def(&self) -> ResponseDef {
        ResponseDef {
            id: ResponseId(0),
            name: self.response.name.clone(),
            objective: self.response.objective,
            primary: true,
        }
    }

    /// Index of the active scenario with the best distribution mean.
    pub fn true_best(&self) -> Option<usize> {
        let objective = self.response.objective;
        self.scenarios
            .iter()
            .enumerate()
            .filter(|(_, scenario)| scenario.active)
            .fold(None, |best: Option<(usize, f64)>, (index, scenario)| {
                let mean = scenario.distribution.mean();
                match best {
                    Some((_, incumbent)) if !objective.is_better(mean, incumbent) => best,
                    _ => Some((index, mean)),
                }
            })
            .map(|(index, _)| index)
    }

    /// Checks the parts of the file the engine does not validate itself.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.scenarios.is_empty() {
            return Err(ValidationError::new("at least one scenario must be defined"));
        }

        let mut names = HashSet::new();
        for scenario in &self.scenarios {
            if !names.insert(scenario.name.as_str()) {
                return Err(ValidationError::new(format!(
                    "duplicate scenario name '{}'",
                    scenario.name
                )));
            }
            scenario.distribution.validate().map_err(|error| {
                ValidationError::new(format!("scenario '{}': {}", scenario.name, error.message()))
            })?;
        }

        if self.simultaneous_replications == 0 {
            return Err(ValidationError::new(
                "simultaneous_replications must be at least 1",
            ));
        }
        if self.threads == Some(0) {
            return Err(ValidationError::new("threads must be at least 1"));
        }
        Ok(())
    }
}

/// Read, parse and validate an experiment file.
pub fn load_experiment_file(path: impl AsRef<Path>) -> Result<ExperimentFile> {
    let text = fs::read_to_string(path)?;
    let file: ExperimentFile = serde_json::from_str(&text)?;
    file.validate()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "response": { "objective": "maximize" },
        "params": { "indifference_zone": 0.5 },
        "scenarios": [
            { "name": "a", "distribution": { "kind": "constant", "value": 1.0 } },
            { "name": "b", "distribution": { "kind": "normal", "mean": 2.0, "std_dev": 1.0 } }
        ]
    }"#;

    #[test]
    fn minimal_file_gets_defaults() {
        let file: ExperimentFile = serde_json::from_str(MINIMAL).expect("valid json");
        assert_eq!(file.procedure, ProcedureKind::Kn);
        assert_eq!(file.params.confidence, 0.95);
        assert_eq!(file.params.indifference_zone, Some(0.5));
        assert_eq!(file.params.replication_limit, 100);
        assert_eq!(file.gsp, GspSettings::default());
        assert_eq!(file.simultaneous_replications, DEFAULT_SIMULTANEOUS_REPLICATIONS);
        assert!(file.scenarios.iter().all(|scenario| scenario.active));
        assert!(file.validate().is_ok());
        assert_eq!(file.true_best(), Some(1));
    }

    #[test]
    fn rejects_duplicate_names_and_empty_sets() {
        let mut file: ExperimentFile = serde_json::from_str(MINIMAL).expect("valid json");
        file.scenarios[1].name = "a".into();
        assert!(file.validate().unwrap_err().message().contains("duplicate"));

        file.scenarios.clear();
        assert!(file.validate().is_err());
    }

    #[test]
    fn rejects_zero_capacity() {
        let mut file: ExperimentFile = serde_json::from_str(MINIMAL).expect("valid json");
        file.simultaneous_replications = 0;
        assert!(file.validate().is_err());
    }

    #[test]
    fn true_best_follows_objective() {
        let mut file: ExperimentFile = serde_json::from_str(MINIMAL).expect("valid json");
        file.response.objective = Objective::Minimize;
        assert_eq!(file.true_best(), Some(0));
    }
}
