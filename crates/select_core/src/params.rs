//! Per-run procedure parameters and their validation.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::host::{Objective, ResponseDef};

pub const DEFAULT_CONFIDENCE: f64 = 0.95;
pub const DEFAULT_REPLICATION_LIMIT: usize = 100;

/// KN needs at least this many replications per scenario for any meaningful screening.
pub const KN_MIN_REPLICATIONS: usize = 10;

/// Default first-stage sample size of GSP.
pub const GSP_FIRST_STAGE_SIZE: usize = 20;
/// Default average batch size of GSP.
pub const GSP_DEFAULT_BATCH_SIZE: usize = 50;
/// Lower bound on the number of stage-2 batch rounds of GSP.
pub const GSP_MIN_BATCH_ROUNDS: usize = 20;

/// Parameters shared by both procedures.
///
/// The indifference zone has no default; a run without one is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureParams {
    /// Target probability of (good) selection, `1 - alpha`.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Smallest difference in the primary response worth detecting.
    #[serde(default)]
    pub indifference_zone: Option<f64>,
    /// Maximum number of replications per scenario.
    #[serde(default = "default_replication_limit")]
    pub replication_limit: usize,
}

impl Default for ProcedureParams {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            indifference_zone: None,
            replication_limit: DEFAULT_REPLICATION_LIMIT,
        }
    }
}

impl ProcedureParams {
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_indifference_zone(mut self, delta: f64) -> Self {
        self.indifference_zone = Some(delta);
        self
    }

    pub fn with_replication_limit(mut self, limit: usize) -> Self {
        self.replication_limit = limit;
        self
    }
}

/// GSP tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GspSettings {
    /// Minimum common sample size of stage 1 (`n1`).
    #[serde(default = "default_first_stage_size")]
    pub first_stage_size: usize,
    /// Average batch size across scenarios.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Lower bound on the number of stage-2 rounds (`rbar`).
    #[serde(default = "default_min_batch_rounds")]
    pub min_batch_rounds: usize,
}

impl Default for GspSettings {
    fn default() -> Self {
        Self {
            first_stage_size: GSP_FIRST_STAGE_SIZE,
            batch_size: GSP_DEFAULT_BATCH_SIZE,
            min_batch_rounds: GSP_MIN_BATCH_ROUNDS,
        }
    }
}

impl GspSettings {
    /// Stage-2 round budget: `max(min_batch_rounds, limit / batch_size / 10)`.
    pub fn batch_rounds(&self, replication_limit: usize) -> usize {
        self.min_batch_rounds
            .max(replication_limit / self.batch_size.max(1) / 10)
    }
}

/// Parameters after validation against the host's response definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedParams {
    pub alpha: f64,
    pub delta: f64,
    pub replication_limit: usize,
    pub primary: ResponseDef,
}

impl ValidatedParams {
    pub fn confidence(&self) -> f64 {
        1.0 - self.alpha
    }

    pub fn objective(&self) -> Objective {
        self.primary.objective
    }
}

pub fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

pub fn default_replication_limit() -> usize {
    DEFAULT_REPLICATION_LIMIT
}

fn default_first_stage_size() -> usize {
    GSP_FIRST_STAGE_SIZE
}

fn default_batch_size() -> usize {
    GSP_DEFAULT_BATCH_SIZE
}

fn default_min_batch_rounds() -> usize {
    GSP_MIN_BATCH_ROUNDS
}

/// Check a run's configuration before anything is submitted.
///
/// `minimum_replications` is the smallest replication limit the calling
/// procedure can work with.
pub fn validate(
    params: &ProcedureParams,
    responses: &[ResponseDef],
    minimum_replications: usize,
) -> Result<ValidatedParams, ValidationError> {
    if responses.is_empty() {
        return Err(ValidationError::new(
            "at least one response must be defined",
        ));
    }

    let mut primaries = responses.iter().filter(|response| response.primary);
    let primary = primaries
        .next()
        .ok_or_else(|| ValidationError::new("a primary response must be set"))?;
    if primaries.next().is_some() {
        return Err(ValidationError::new(
            "exactly one response may be marked primary",
        ));
    }

    if primary.objective == Objective::None {
        return Err(ValidationError::new(format!(
            "primary response '{}' must have an objective of Maximize or Minimize",
            primary.name
        )));
    }

    let delta = params
        .indifference_zone
        .ok_or_else(|| ValidationError::new("a value is required for indifference zone"))?;
    if !delta.is_finite() || delta <= 0.0 {
        return Err(ValidationError::new(
            "indifference zone must be a real number > 0.0",
        ));
    }

    if !(params.confidence > 0.0 && params.confidence < 1.0) {
        return Err(ValidationError::new(
            "confidence level must be a probability between 0.0 and 1.0",
        ));
    }

    if params.replication_limit < minimum_replications {
        return Err(ValidationError::new(format!(
            "replication limit must be at least {minimum_replications}"
        )));
    }

    Ok(ValidatedParams {
        alpha: 1.0 - params.confidence,
        delta,
        replication_limit: params.replication_limit,
        primary: primary.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ResponseId;

    fn response(name: &str, objective: Objective, primary: bool) -> ResponseDef {
        ResponseDef {
            id: ResponseId(0),
            name: name.to_string(),
            objective,
            primary,
        }
    }

    fn params() -> ProcedureParams {
        ProcedureParams::default().with_indifference_zone(1.0)
    }

    #[test]
    fn accepts_complete_configuration() {
        let validated = validate(
            &params(),
            &[
                response("throughput", Objective::Maximize, true),
                response("wip", Objective::None, false),
            ],
            KN_MIN_REPLICATIONS,
        )
        .expect("configuration should pass");

        assert!((validated.alpha - 0.05).abs() < 1e-12);
        assert_eq!(validated.delta, 1.0);
        assert_eq!(validated.primary.name, "throughput");
    }

    #[test]
    fn rejects_missing_responses() {
        let error = validate(&params(), &[], KN_MIN_REPLICATIONS).expect_err("should fail");
        assert_eq!(error.message(), "at least one response must be defined");
    }

    #[test]
    fn rejects_missing_and_duplicate_primary() {
        let none = validate(
            &params(),
            &[response("a", Objective::Maximize, false)],
            KN_MIN_REPLICATIONS,
        )
        .expect_err("should fail");
        assert_eq!(none.message(), "a primary response must be set");

        let two = validate(
            &params(),
            &[
                response("a", Objective::Maximize, true),
                response("b", Objective::Minimize, true),
            ],
            KN_MIN_REPLICATIONS,
        )
        .expect_err("should fail");
        assert_eq!(two.message(), "exactly one response may be marked primary");
    }

    #[test]
    fn rejects_objective_none() {
        let error = validate(
            &params(),
            &[response("a", Objective::None, true)],
            KN_MIN_REPLICATIONS,
        )
        .expect_err("should fail");
        assert!(error.message().contains("Maximize or Minimize"));
    }

    #[test]
    fn rejects_bad_indifference_zone() {
        let responses = [response("a", Objective::Maximize, true)];
        let missing = validate(&ProcedureParams::default(), &responses, 10).expect_err("missing");
        assert_eq!(missing.message(), "a value is required for indifference zone");

        for delta in [0.0, -1.0, f64::NAN] {
            let error = validate(
                &ProcedureParams::default().with_indifference_zone(delta),
                &responses,
                10,
            )
            .expect_err("non-positive delta");
            assert_eq!(error.message(), "indifference zone must be a real number > 0.0");
        }
    }

    #[test]
    fn rejects_confidence_and_limit_out_of_range() {
        let responses = [response("a", Objective::Maximize, true)];
        for confidence in [0.0, 1.0, 1.5] {
            assert!(validate(&params().with_confidence(confidence), &responses, 10).is_err());
        }

        let error = validate(&params().with_replication_limit(15), &responses, GSP_FIRST_STAGE_SIZE)
            .expect_err("limit below first stage");
        assert_eq!(error.message(), "replication limit must be at least 20");
    }

    #[test]
    fn batch_rounds_scale_with_limit() {
        let settings = GspSettings::default();
        assert_eq!(settings.batch_rounds(100), 20);
        assert_eq!(settings.batch_rounds(50_000), 100);
    }
}
