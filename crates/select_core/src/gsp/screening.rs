//! Grouped pairwise screening used by GSP stages 1 and 2.
//!
//! Large scenario sets are split into round-robin groups. Each group
//! first finds its local best, then every scenario is tested against its
//! own group and against every group's best. Both passes run in parallel
//! over groups and only produce verdicts; the caller merges them.

use rayon::prelude::*;

use crate::host::{Objective, ScenarioId};

/// Above this many scenarios screening is split into groups.
pub const GROUPING_THRESHOLD: usize = 100;

/// Statistics of one scenario as seen by a screening pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contender {
    pub id: ScenarioId,
    pub mean: f64,
    pub variance: f64,
    pub batch_size: usize,
    pub sample_count: usize,
}

/// Constants shared by every comparison of one screening pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreeningContext {
    pub objective: Objective,
    /// First-stage sample size.
    pub n1: usize,
    /// Stage-2 round budget.
    pub rbar: usize,
    pub eta: f64,
}

impl ScreeningContext {
    /// Whether `candidate` survives a comparison with `rival`.
    pub fn survives_against(&self, candidate: &Contender, rival: &Contender) -> bool {
        if candidate.variance <= 0.0 && rival.variance <= 0.0 {
            return match self.objective {
                Objective::Maximize => candidate.mean >= rival.mean,
                Objective::Minimize => candidate.mean <= rival.mean,
                Objective::None => true,
            };
        }

        let horizon = |contender: &Contender| (self.n1 + self.rbar * contender.batch_size) as f64;
        let tau_rbar = 1.0
            / (candidate.variance / horizon(candidate) + rival.variance / horizon(rival));
        let threshold = self.eta * ((self.n1.saturating_sub(1)) as f64 * tau_rbar).sqrt();

        let tau = 1.0
            / (candidate.variance / candidate.sample_count.max(1) as f64
                + rival.variance / rival.sample_count.max(1) as f64);
        let y = tau * (candidate.mean - rival.mean);

        match self.objective {
            Objective::Maximize => y >= -threshold,
            Objective::Minimize => y <= threshold,
            Objective::None => true,
        }
    }

    /// Keep flags, parallel to `contenders`, after one screening pass.
    pub fn keep_mask(&self, contenders: &[Contender]) -> Vec<bool> {
        let groups = assign_groups(contenders.len(), group_count(contenders.len()));

        let bests: Vec<usize> = groups
            .par_iter()
            .filter_map(|members| self.group_best(contenders, members))
            .collect();

        let verdicts: Vec<Vec<(usize, bool)>> = groups
            .par_iter()
            .map(|members| {
                members
                    .iter()
                    .map(|&i| {
                        let candidate = &contenders[i];
                        let kept = members
                            .iter()
                            .chain(bests.iter())
                            .filter(|&&j| j != i)
                            .all(|&j| self.survives_against(candidate, &contenders[j]));
                        (i, kept)
                    })
                    .collect()
            })
            .collect();

        let mut keep = vec![true; contenders.len()];
        for (i, kept) in verdicts.into_iter().flatten() {
            keep[i] = kept;
        }
        keep
    }

    fn group_best(&self, contenders: &[Contender], members: &[usize]) -> Option<usize> {
        members.iter().copied().reduce(|best, i| {
            if self.objective.is_better(contenders[i].mean, contenders[best].mean) {
                i
            } else {
                best
            }
        })
    }
}

/// `floor(sqrt(k))` groups above the threshold, otherwise one.
pub fn group_count(k: usize) -> usize {
    if k > GROUPING_THRESHOLD {
        ((k as f64).sqrt().floor() as usize).max(1)
    } else {
        1
    }
}

/// Round-robin assignment of `k` indices to `groups` groups.
pub fn assign_groups(k: usize, groups: usize) -> Vec<Vec<usize>> {
    let groups = groups.max(1);
    let mut assignment = vec![Vec::with_capacity(k / groups + 1); groups];
    for i in 0..k {
        assignment[i % groups].push(i);
    }
    assignment.retain(|members| !members.is_empty());
    assignment
}
