//! The engine's own view of the scenarios it is still considering.

use tracing::debug;

use crate::host::{ExperimentHost, ScenarioId, ScenarioSnapshot, ScenarioUpdate};

/// A scenario in the active set, with the replication target the engine
/// wants and the completed count last reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedScenario {
    pub id: ScenarioId,
    pub name: String,
    pub required: usize,
    pub completed: usize,
}

impl From<&ScenarioSnapshot> for TrackedScenario {
    fn from(snapshot: &ScenarioSnapshot) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.name.clone(),
            required: snapshot.replications_required,
            completed: snapshot.replications_completed,
        }
    }
}

/// Scenarios the host currently marks active, in host order.
pub fn active_scenarios<H: ExperimentHost + ?Sized>(host: &H) -> Vec<TrackedScenario> {
    host.scenarios()
        .iter()
        .filter(|snapshot| snapshot.active)
        .map(TrackedScenario::from)
        .collect()
}

/// Largest of every scenario's required and completed counts, and `floor`.
pub fn common_sample_size(scenarios: &[TrackedScenario], floor: usize) -> usize {
    scenarios
        .iter()
        .map(|scenario| scenario.required.max(scenario.completed))
        .fold(floor, usize::max)
}

/// Deactivate every entry whose `keep` flag is false and drop it from `items`.
///
/// `keep` must be parallel to `items`. Returns how many were eliminated.
pub fn eliminate<H, T, F>(host: &mut H, items: &mut Vec<T>, keep: &[bool], scenario_of: F) -> usize
where
    H: ExperimentHost + ?Sized,
    F: Fn(&T) -> &TrackedScenario,
{
    debug_assert_eq!(items.len(), keep.len());
    let before = items.len();
    let mut flags = keep.iter();
    items.retain(|item| {
        let kept = flags.next().copied().unwrap_or(true);
        if !kept {
            let scenario = scenario_of(item);
            debug!(scenario = %scenario.name, id = %scenario.id, "scenario screened out");
            host.apply(ScenarioUpdate::Deactivate {
                scenario: scenario.id,
            });
        }
        kept
    });
    before - items.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracked(id: usize, required: usize, completed: usize) -> TrackedScenario {
        TrackedScenario {
            id: ScenarioId(id),
            name: format!("s{id}"),
            required,
            completed,
        }
    }

    #[test]
    fn common_sample_size_respects_floor_and_progress() {
        let scenarios = vec![tracked(0, 0, 0), tracked(1, 4, 12)];
        assert_eq!(common_sample_size(&scenarios, 10), 12);
        assert_eq!(common_sample_size(&scenarios, 20), 20);
        assert_eq!(common_sample_size(&[], 10), 10);
    }
}
