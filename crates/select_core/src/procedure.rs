use crate::critical::CriticalValues;
use crate::error::Result;
use crate::gsp::GspProcedure;
use crate::host::ExperimentHost;
use crate::kn::KnProcedure;
use crate::outcome::{ProcedureKind, SelectionOutcome};
use crate::params::{GspSettings, ProcedureParams};

/// A ranking-and-selection procedure that can drive any host.
///
/// Procedures are chosen at run time by experiment files, so the trait is
/// object safe and takes the host as a trait object.
pub trait SelectionProcedure: Send + Sync {
    fn kind(&self) -> ProcedureKind;

    fn run(&self, host: &mut dyn ExperimentHost) -> Result<SelectionOutcome>;
}

impl SelectionProcedure for KnProcedure {
    fn kind(&self) -> ProcedureKind {
        ProcedureKind::Kn
    }

    fn run(&self, host: &mut dyn ExperimentHost) -> Result<SelectionOutcome> {
        KnProcedure::run(self, host)
    }
}

impl<C: CriticalValues> SelectionProcedure for GspProcedure<C> {
    fn kind(&self) -> ProcedureKind {
        ProcedureKind::Gsp
    }

    fn run(&self, host: &mut dyn ExperimentHost) -> Result<SelectionOutcome> {
        GspProcedure::run(self, host)
    }
}

/// Build the procedure for `kind`. `gsp` is ignored for KN.
pub fn build_procedure(
    kind: ProcedureKind,
    params: ProcedureParams,
    gsp: GspSettings,
) -> Box<dyn SelectionProcedure> {
    match kind {
        ProcedureKind::Kn => Box::new(KnProcedure::new(params)),
        ProcedureKind::Gsp => Box::new(GspProcedure::new(params).with_settings(gsp)),
    }
}

/// Run KN with `params` against `host`.
pub fn run_kn<H: ExperimentHost + ?Sized>(
    host: &mut H,
    params: ProcedureParams,
) -> Result<SelectionOutcome> {
    KnProcedure::new(params).run(host)
}

/// Run GSP with `params` and default settings against `host`.
pub fn run_gsp<H: ExperimentHost + ?Sized>(
    host: &mut H,
    params: ProcedureParams,
) -> Result<SelectionOutcome> {
    GspProcedure::new(params).run(host)
}
