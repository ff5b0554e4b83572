//! Ranking-and-selection engine for simulation experiments.
//!
//! Given a host that can run replications of several scenarios, the
//! procedures here decide which replications to request next and when to
//! stop, returning the scenario with the best primary response.
//!
//! - [`kn::KnProcedure`]: Kim–Nelson fully sequential screening.
//! - [`gsp::GspProcedure`]: multi-stage procedure with batching, grouped
//!   parallel screening and a Rinott confirmation stage.
//!
//! Both drive the host through [`host::ExperimentHost`] and the wave
//! scheduler in [`wave`].

pub mod critical;
pub mod error;
pub mod gsp;
pub mod host;
pub mod kn;
pub mod outcome;
pub mod params;
pub mod procedure;
pub mod scenario;
pub mod stats;
pub mod wave;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use error::{Result, SelectionError, ValidationError};
pub use gsp::GspProcedure;
pub use host::{ExperimentHost, Objective, ResponseDef, ScenarioId};
pub use kn::KnProcedure;
pub use outcome::{Guarantee, ProcedureKind, SelectionOutcome, Termination};
pub use params::{GspSettings, ProcedureParams};
pub use procedure::{build_procedure, run_gsp, run_kn, SelectionProcedure};
