#![allow(dead_code)]

use select_core::host::Objective;
use select_core::params::ProcedureParams;
use select_core::test_helpers::{constant, ScriptedHost};

/// Procedure parameters with `confidence = 0.95` and the given indifference zone.
pub fn params(delta: f64) -> ProcedureParams {
    ProcedureParams::default().with_indifference_zone(delta)
}

/// Two constant scenarios: "A" at 10.0 and "B" at 5.0.
pub fn ten_versus_five(objective: Objective) -> ScriptedHost {
    ScriptedHost::new(objective)
        .with_scenario("A", constant(10.0))
        .with_scenario("B", constant(5.0))
}

/// `count` constant scenarios at `100 + i`, except `best` which sits at 0.0.
pub fn many_constants(count: usize, best: usize) -> ScriptedHost {
    (0..count).fold(ScriptedHost::new(Objective::Minimize), |host, i| {
        let value = if i == best { 0.0 } else { 100.0 + i as f64 };
        host.with_scenario(&format!("s{i}"), constant(value))
    })
}
