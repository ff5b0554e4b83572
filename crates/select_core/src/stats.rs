//! Per-scenario sample statistics.

use crate::error::{Result, SelectionError};
use crate::host::{ExperimentHost, ResponseDef};
use crate::scenario::TrackedScenario;

/// Running statistics of the primary response for one tracked scenario.
///
/// `sample_count` is the number of replications folded into `mean`; for
/// GSP it keeps growing while `variance` stays the first-stage estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioStats {
    pub mean: f64,
    pub variance: f64,
    pub batch_size: usize,
    pub sample_count: usize,
}

impl ScenarioStats {
    /// Mean and sample variance of `samples` with a batch size of one.
    ///
    /// A single sample has zero variance. `samples` must not be empty.
    pub fn from_samples(samples: &[f64]) -> Self {
        debug_assert!(!samples.is_empty());
        let mean = sample_mean(samples);
        Self {
            mean,
            variance: sample_variance(samples, mean),
            batch_size: 1,
            sample_count: samples.len().max(1),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Refresh the mean after more replications completed.
    pub fn update_mean(&mut self, mean: f64, sample_count: usize) {
        self.mean = mean;
        self.sample_count = sample_count.max(1);
    }
}

pub fn sample_mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Unbiased sample variance around `mean`, never negative.
pub fn sample_variance(samples: &[f64], mean: f64) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|x| (x - mean) * (x - mean)).sum();
    (sum_sq / (samples.len() - 1) as f64).max(0.0)
}

/// Fetch replications `1..=count` of `response` for `scenario` from the host.
pub fn replication_values<H: ExperimentHost + ?Sized>(
    host: &H,
    scenario: &TrackedScenario,
    response: &ResponseDef,
    count: usize,
) -> Result<Vec<f64>> {
    (1..=count)
        .map(|replication| {
            host.response_value_for_replication(scenario.id, response.id, replication)
                .ok_or_else(|| SelectionError::MissingReplicationValue {
                    scenario: scenario.name.clone(),
                    response: response.name.clone(),
                    replication,
                })
        })
        .collect()
}

/// Aggregate value of `response` for `scenario` as reported by the host.
pub fn response_mean<H: ExperimentHost + ?Sized>(
    host: &H,
    scenario: &TrackedScenario,
    response: &ResponseDef,
) -> Result<f64> {
    host.response_value(scenario.id, response.id)
        .ok_or_else(|| SelectionError::MissingResponseValue {
            scenario: scenario.name.clone(),
            response: response.name.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variance_matches_textbook_example() {
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = ScenarioStats::from_samples(&samples);
        assert_eq!(stats.mean, 5.0);
        assert!((stats.variance - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(stats.sample_count, 8);
        assert_eq!(stats.batch_size, 1);
    }

    #[test]
    fn single_sample_has_zero_variance() {
        let stats = ScenarioStats::from_samples(&[3.5]);
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.sample_count, 1);
    }

    #[test]
    fn constant_samples_never_go_negative() {
        let samples = vec![1e12 + 0.1; 50];
        let stats = ScenarioStats::from_samples(&samples);
        assert!(stats.variance >= 0.0);
    }

    #[test]
    fn batch_size_is_at_least_one() {
        let stats = ScenarioStats::from_samples(&[1.0, 2.0]).with_batch_size(0);
        assert_eq!(stats.batch_size, 1);
    }
}
