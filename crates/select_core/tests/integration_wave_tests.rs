mod support;

use proptest::prelude::*;
use select_core::host::{Objective, ReplicationStatus, ScenarioId};
use select_core::scenario::TrackedScenario;
use select_core::test_helpers::{constant, ScriptedHost};
use select_core::wave::{plan_wave, run_wave, WaveLedger, WaveOutcome};

fn tracked(id: usize, completed: usize, required: usize) -> TrackedScenario {
    TrackedScenario {
        id: ScenarioId(id),
        name: format!("s{id}"),
        required,
        completed,
    }
}

fn two_scenarios() -> ScriptedHost {
    ScriptedHost::new(Objective::Maximize)
        .with_scenario("a", constant(1.0))
        .with_scenario("b", constant(2.0))
}

#[test]
fn wave_drains_and_refreshes_completed_counts() {
    let mut host = two_scenarios();
    let mut scenarios = vec![tracked(0, 0, 3), tracked(1, 0, 2)];
    let outcome = run_wave(&mut host, &mut scenarios);

    assert_eq!(outcome, WaveOutcome::Completed { submitted: 5 });
    assert_eq!(scenarios[0].completed, 3);
    assert_eq!(scenarios[1].completed, 2);
    assert_eq!(host.required(0), 3);
    assert_eq!(host.progress().last(), Some(&100));
}

#[test]
fn running_results_are_recorded_but_not_counted() {
    let mut host = two_scenarios().emit_running();
    let mut scenarios = vec![tracked(0, 0, 2), tracked(1, 0, 2)];
    let outcome = run_wave(&mut host, &mut scenarios);

    assert_eq!(outcome.submitted(), 4);
    assert!(!outcome.is_cancelled());
    assert_eq!(host.recorded().len(), 8);
    assert_eq!(host.progress(), &[25, 50, 75, 100]);
}

#[test]
fn canceled_status_marks_the_wave_cancelled_after_draining() {
    let mut host = two_scenarios().with_status(0, 2, ReplicationStatus::Canceled);
    let mut scenarios = vec![tracked(0, 0, 3), tracked(1, 0, 3)];
    let outcome = run_wave(&mut host, &mut scenarios);

    assert_eq!(
        outcome,
        WaveOutcome::Cancelled {
            submitted: 6,
            completed: 6
        }
    );
    assert_eq!(host.recorded().len(), 6);
}

#[test]
fn failed_replications_still_count_toward_completion() {
    let mut host = two_scenarios().with_status(1, 1, ReplicationStatus::Failed);
    let mut scenarios = vec![tracked(0, 0, 1), tracked(1, 0, 1)];
    let outcome = run_wave(&mut host, &mut scenarios);

    assert_eq!(outcome, WaveOutcome::Completed { submitted: 2 });
    assert_eq!(scenarios[1].completed, 0);
}

#[test]
fn closed_result_channel_cancels_immediately() {
    let mut host = two_scenarios().cancel_after(1);
    let mut scenarios = vec![tracked(0, 0, 5), tracked(1, 0, 5)];
    let outcome = run_wave(&mut host, &mut scenarios);

    assert_eq!(
        outcome,
        WaveOutcome::Cancelled {
            submitted: 10,
            completed: 1
        }
    );
    assert_eq!(host.recorded().len(), 1);
}

#[test]
fn empty_wave_does_not_wait_for_results() {
    let mut host = two_scenarios().cancel_after(0);
    let mut scenarios = vec![tracked(0, 0, 0)];
    let mut ledger = WaveLedger::default();
    let outcome = ledger.run(&mut host, &mut scenarios);

    assert_eq!(outcome, WaveOutcome::Completed { submitted: 0 });
    assert_eq!(ledger.waves, 1);
    assert_eq!(ledger.replications_submitted, 0);
}

proptest! {
    #[test]
    fn plan_preserves_per_scenario_order(
        targets in prop::collection::vec((0usize..15, 0usize..15), 1..8),
    ) {
        let scenarios: Vec<TrackedScenario> = targets
            .iter()
            .enumerate()
            .map(|(id, &(a, b))| tracked(id, a.min(b), a.max(b)))
            .collect();
        let jobs = plan_wave(&scenarios);

        // Replication numbers never decrease across the wave.
        prop_assert!(jobs.windows(2).all(|pair| pair[0].replication <= pair[1].replication));

        // Each scenario gets exactly completed+1..=required, in order.
        for scenario in &scenarios {
            let replications: Vec<usize> = jobs
                .iter()
                .filter(|job| job.scenario == scenario.id)
                .map(|job| job.replication)
                .collect();
            let expected: Vec<usize> = (scenario.completed + 1..=scenario.required).collect();
            prop_assert_eq!(replications, expected);
        }
    }
}
