//! Response distributions for synthetic scenarios.
//!
//! Every replication draws from its own RNG seeded by the experiment seed,
//! the scenario index and the replication number, so a replication's value
//! does not depend on which worker ran it or in what order.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use select_core::ValidationError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseDistribution {
    Constant { value: f64 },
    Normal { mean: f64, std_dev: f64 },
    Uniform { low: f64, high: f64 },
    /// Exponential with the given mean (not rate).
    Exponential { mean: f64 },
}

impl ResponseDistribution {
    /// Expected value of the distribution.
    pub fn mean(&self) -> f64 {
        match *self {
            ResponseDistribution::Constant { value } => value,
            ResponseDistribution::Normal { mean, .. } => mean,
            ResponseDistribution::Uniform { low, high } => 0.5 * (low + high),
            ResponseDistribution::Exponential { mean } => mean,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            ResponseDistribution::Constant { value } => value,
            ResponseDistribution::Normal { mean, std_dev } => {
                // Box-Muller
                let u1: f64 = rng.gen::<f64>().max(1e-12);
                let u2: f64 = rng.gen();
                let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                mean + std_dev * z
            }
            ResponseDistribution::Uniform { low, high } => {
                let u: f64 = rng.gen();
                low + (high - low) * u
            }
            ResponseDistribution::Exponential { mean } => {
                let u: f64 = rng.gen();
                let u = u.max(1e-10); // Avoid log(0)
                -u.ln() * mean
            }
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let finite = |value: f64, what: &str| {
            if value.is_finite() {
                Ok(())
            } else {
                Err(ValidationError::new(format!("{what} must be a finite number")))
            }
        };
        match *self {
            ResponseDistribution::Constant { value } => finite(value, "constant value"),
            ResponseDistribution::Normal { mean, std_dev } => {
                finite(mean, "normal mean")?;
                finite(std_dev, "normal std_dev")?;
                if std_dev < 0.0 {
                    return Err(ValidationError::new("normal std_dev must be >= 0"));
                }
                Ok(())
            }
            ResponseDistribution::Uniform { low, high } => {
                finite(low, "uniform low")?;
                finite(high, "uniform high")?;
                if low > high {
                    return Err(ValidationError::new("uniform low must not exceed high"));
                }
                Ok(())
            }
            ResponseDistribution::Exponential { mean } => {
                finite(mean, "exponential mean")?;
                if mean <= 0.0 {
                    return Err(ValidationError::new("exponential mean must be > 0"));
                }
                Ok(())
            }
        }
    }
}

/// RNG for one replication of one scenario.
pub fn replication_rng(seed: u64, scenario: usize, replication: usize) -> StdRng {
    let stream = (scenario as u64)
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(replication as u64);
    StdRng::seed_from_u64(seed ^ stream.rotate_left(17))
}
