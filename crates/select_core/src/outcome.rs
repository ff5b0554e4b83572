//! What a selection run reports back to its caller.

use serde::{Deserialize, Serialize};

use crate::host::ScenarioId;
use crate::scenario::TrackedScenario;
use crate::wave::WaveLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureKind {
    #[default]
    Kn,
    Gsp,
}

impl ProcedureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcedureKind::Kn => "kn",
            ProcedureKind::Gsp => "gsp",
        }
    }
}

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Fewer than two active scenarios; nothing was submitted.
    NothingToSelect,
    /// Screening left exactly one scenario.
    SingleSurvivor,
    /// The replication cap was reached with several scenarios still in contention.
    ReplicationLimit,
    /// The user cancelled the run.
    Cancelled,
    /// GSP stage 3 picked the best final mean.
    RinottSelection,
}

/// Strength of the statistical statement behind the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guarantee {
    /// The probability-of-good-selection guarantee holds.
    Formal,
    /// A scenario was picked but the replication cap voided the guarantee.
    Void,
    /// The run stopped before any guarantee could be established.
    NotReached,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionOutcome {
    pub procedure: ProcedureKind,
    pub termination: Termination,
    pub selected: Option<ScenarioId>,
    pub survivors: Vec<ScenarioId>,
    pub guarantee: Guarantee,
    pub waves: usize,
    pub replications_submitted: usize,
}

impl SelectionOutcome {
    pub(crate) fn new(
        procedure: ProcedureKind,
        termination: Termination,
        survivors: &[TrackedScenario],
        ledger: WaveLedger,
    ) -> Self {
        Self {
            procedure,
            termination,
            selected: None,
            survivors: survivors.iter().map(|scenario| scenario.id).collect(),
            guarantee: Guarantee::NotReached,
            waves: ledger.waves,
            replications_submitted: ledger.replications_submitted,
        }
    }

    pub(crate) fn selecting(mut self, scenario: ScenarioId, guarantee: Guarantee) -> Self {
        self.selected = Some(scenario);
        self.guarantee = guarantee;
        self
    }

    /// True when a scenario was selected with the formal guarantee intact.
    pub fn is_guaranteed(&self) -> bool {
        self.selected.is_some() && self.guarantee == Guarantee::Formal
    }
}
