mod support;

use select_core::critical::FixedCriticalValues;
use select_core::gsp::GspProcedure;
use select_core::host::{Objective, ScenarioId, ScenarioUpdate};
use select_core::outcome::{Guarantee, ProcedureKind, Termination};
use select_core::test_helpers::{alternating, constant, ScriptedHost};
use select_core::{run_gsp, SelectionError};
use support::hosts::{many_constants, params, ten_versus_five};

/// Critical values that never screen anything out.
fn no_screening(rinott_h: f64) -> FixedCriticalValues {
    FixedCriticalValues {
        rinott_h,
        eta: 1e6,
    }
}

/// Critical values whose `eta` lets the noisy pair through stage 1 but
/// separates it after the first stage-2 batch.
fn tight_screening() -> FixedCriticalValues {
    FixedCriticalValues {
        rinott_h: 1.0,
        eta: 0.2,
    }
}

fn deactivations(host: &ScriptedHost) -> usize {
    host.updates()
        .iter()
        .filter(|update| matches!(update, ScenarioUpdate::Deactivate { .. }))
        .count()
}

fn noisy_pair() -> ScriptedHost {
    ScriptedHost::new(Objective::Maximize)
        .with_scenario("A", alternating(10.0, 1.0))
        .with_scenario("B", alternating(9.0, 1.0))
}

#[test]
fn constant_gap_is_settled_in_stage_one() {
    let mut host = ten_versus_five(Objective::Maximize);
    let outcome = run_gsp(&mut host, params(1.0)).expect("run succeeds");

    assert_eq!(outcome.procedure, ProcedureKind::Gsp);
    assert_eq!(outcome.termination, Termination::SingleSurvivor);
    assert_eq!(outcome.selected, Some(ScenarioId(0)));
    assert_eq!(outcome.guarantee, Guarantee::Formal);
    assert_eq!(outcome.waves, 1);
    assert_eq!(outcome.replications_submitted, 40);
    assert!(!host.is_active(1));
}

#[test]
fn single_active_scenario_returns_without_submitting() {
    let mut host = ScriptedHost::new(Objective::Minimize)
        .with_inactive_scenario("parked")
        .with_scenario("only", constant(3.0));
    let outcome = run_gsp(&mut host, params(1.0)).expect("run succeeds");

    assert_eq!(outcome.termination, Termination::NothingToSelect);
    assert_eq!(outcome.selected, Some(ScenarioId(1)));
    assert!(host.submitted().is_empty());
}

#[test]
fn rinott_requirement_above_the_limit_voids_the_guarantee() {
    let mut host = noisy_pair();
    let outcome = GspProcedure::new(params(1.0).with_replication_limit(30))
        .with_critical_values(no_screening(10.0))
        .run(&mut host)
        .expect("run succeeds");

    assert_eq!(outcome.termination, Termination::RinottSelection);
    assert_eq!(outcome.selected, Some(ScenarioId(0)));
    assert_eq!(outcome.guarantee, Guarantee::Void);
    assert!(!outcome.is_guaranteed());
    // Stage 2 pins both at the limit without a wave; stage 3 runs the top-up.
    assert_eq!(outcome.waves, 2);
    assert_eq!(outcome.replications_submitted, 60);
    assert_eq!(host.required(0), 30);
    assert_eq!(host.completed(1), 30);
    assert!(host.is_active(0));
    assert!(host.is_active(1));
}

#[test]
fn rinott_requirement_within_the_limit_keeps_the_guarantee() {
    let mut host = noisy_pair();
    let outcome = GspProcedure::new(params(1.0))
        .with_critical_values(no_screening(1.0))
        .run(&mut host)
        .expect("run succeeds");

    assert_eq!(outcome.termination, Termination::RinottSelection);
    assert_eq!(outcome.selected, Some(ScenarioId(0)));
    assert_eq!(outcome.guarantee, Guarantee::Formal);
    assert_eq!(outcome.survivors, vec![ScenarioId(0)]);
    // Stage 1 (20 each), one stage-2 batch of 50 each, then the pinned top-up to 100.
    assert_eq!(outcome.waves, 3);
    assert_eq!(outcome.replications_submitted, 200);
    assert!(host.is_active(0));
    assert!(!host.is_active(1));
}

#[test]
fn stage_two_batches_separate_a_noisy_pair() {
    let mut host = noisy_pair();
    let outcome = GspProcedure::new(params(1.0))
        .with_critical_values(tight_screening())
        .run(&mut host)
        .expect("run succeeds");

    assert_eq!(outcome.termination, Termination::SingleSurvivor);
    assert_eq!(outcome.selected, Some(ScenarioId(0)));
    assert_eq!(outcome.guarantee, Guarantee::Formal);
    // Stage 1 (20 each) keeps both; the first batch of 50 each splits them.
    assert_eq!(outcome.waves, 2);
    assert_eq!(outcome.replications_submitted, 140);
    assert_eq!(host.completed(0), 70);
    assert_eq!(host.completed(1), 70);
    assert!(host.is_active(0));
    assert!(!host.is_active(1));
}

#[test]
fn cancellation_in_stage_two_leaves_everyone_active() {
    let mut host = noisy_pair().cancel_after(50);
    let outcome = GspProcedure::new(params(1.0))
        .with_critical_values(tight_screening())
        .run(&mut host)
        .expect("cancellation is not an error");

    assert_eq!(outcome.termination, Termination::Cancelled);
    assert_eq!(outcome.selected, None);
    assert_eq!(outcome.waves, 2);
    assert_eq!(outcome.replications_submitted, 140);
    assert_eq!(outcome.survivors, vec![ScenarioId(0), ScenarioId(1)]);
    assert_eq!(deactivations(&host), 0);
    assert!(host.is_active(0) && host.is_active(1));
}

#[test]
fn cancellation_in_stage_three_skips_the_final_selection() {
    let mut host = noisy_pair().cancel_after(150);
    let outcome = GspProcedure::new(params(1.0))
        .with_critical_values(no_screening(1.0))
        .run(&mut host)
        .expect("cancellation is not an error");

    assert_eq!(outcome.termination, Termination::Cancelled);
    assert_eq!(outcome.selected, None);
    assert_eq!(outcome.waves, 3);
    assert_eq!(outcome.replications_submitted, 200);
    assert_eq!(deactivations(&host), 0);
    assert!(host.is_active(0) && host.is_active(1));
}

#[test]
fn pinning_never_lowers_a_requirement_below_completed() {
    let mut host = ScriptedHost::new(Objective::Maximize)
        .with_scenario("A", alternating(10.0, 1.0))
        .with_prior_replications(120)
        .with_scenario("B", alternating(9.0, 1.0));
    let outcome = GspProcedure::new(params(1.0))
        .with_critical_values(no_screening(1.0))
        .run(&mut host)
        .expect("run succeeds");

    assert_eq!(outcome.termination, Termination::RinottSelection);
    assert_eq!(outcome.selected, Some(ScenarioId(0)));
    assert_eq!(outcome.replications_submitted, 120);
    assert_eq!(host.required(0), 120);
    assert!(host.updates().iter().all(|update| match update {
        ScenarioUpdate::RequireReplications { total, .. } => *total == 120,
        ScenarioUpdate::Deactivate { .. } => true,
    }));
    assert!(!host.is_active(1));
}

#[test]
fn grouped_screening_handles_large_scenario_sets() {
    let mut host = many_constants(121, 77);
    let outcome = run_gsp(&mut host, params(1.0)).expect("run succeeds");

    assert_eq!(outcome.termination, Termination::SingleSurvivor);
    assert_eq!(outcome.selected, Some(ScenarioId(77)));
    assert_eq!(outcome.replications_submitted, 121 * 20);
    assert_eq!((0..121).filter(|&i| host.is_active(i)).count(), 1);
}

#[test]
fn cancellation_in_stage_one_returns_cancelled() {
    let mut host = ten_versus_five(Objective::Maximize).cancel_after(5);
    let outcome = run_gsp(&mut host, params(1.0)).expect("cancellation is not an error");

    assert_eq!(outcome.termination, Termination::Cancelled);
    assert_eq!(outcome.selected, None);
    assert_eq!(outcome.waves, 1);
    assert!(host.is_active(0) && host.is_active(1));
}

#[test]
fn replication_limit_below_first_stage_is_rejected() {
    let mut host = ten_versus_five(Objective::Maximize);
    let error = run_gsp(&mut host, params(1.0).with_replication_limit(15)).expect_err("low limit");

    assert!(error.is_config());
    assert!(error.to_string().contains("at least 20"));
    assert!(host.submitted().is_empty());
}

#[test]
fn missing_first_stage_values_abort_the_run() {
    let mut host = ten_versus_five(Objective::Maximize).withhold_values();
    let error = run_gsp(&mut host, params(1.0)).expect_err("host data missing");

    assert!(matches!(
        error,
        SelectionError::MissingReplicationValue { replication: 1, .. }
    ));
}
