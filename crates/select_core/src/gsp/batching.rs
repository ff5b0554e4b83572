/// Per-scenario batch sizes proportional to `sqrt(S² / T)`.
///
/// `variances` and `weights` are parallel; `weights` are the relative run
/// times of one replication. The average batch size across scenarios is
/// close to `default_batch`. When every scenario has zero variance all of
/// them get `default_batch`. Batch sizes are never below one.
pub fn calc_batch_sizes(variances: &[f64], weights: &[f64], default_batch: usize) -> Vec<usize> {
    debug_assert_eq!(variances.len(), weights.len());
    if variances.is_empty() {
        return Vec::new();
    }

    let spreads: Vec<f64> = variances
        .iter()
        .zip(weights)
        .map(|(&variance, &weight)| scaled_spread(variance, weight))
        .collect();
    let average = spreads.iter().sum::<f64>() / spreads.len() as f64;

    if average <= 0.0 || !average.is_finite() {
        return vec![default_batch.max(1); spreads.len()];
    }

    spreads
        .iter()
        .map(|spread| {
            let size = (default_batch as f64 * spread / average).ceil();
            (size as usize).max(1)
        })
        .collect()
}

fn scaled_spread(variance: f64, weight: f64) -> f64 {
    let weight = if weight > 0.0 { weight } else { 1.0 };
    (variance.max(0.0) / weight).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn equal_variances_get_the_default() {
        assert_eq!(calc_batch_sizes(&[4.0, 4.0, 4.0], &[1.0; 3], 50), vec![50, 50, 50]);
    }

    #[test]
    fn noisier_scenarios_get_bigger_batches() {
        let sizes = calc_batch_sizes(&[1.0, 9.0], &[1.0, 1.0], 50);
        // spreads 1 and 3, average 2
        assert_eq!(sizes, vec![25, 75]);
    }

    #[test]
    fn zero_variance_everywhere_falls_back_to_default() {
        assert_eq!(calc_batch_sizes(&[0.0, 0.0], &[1.0, 1.0], 50), vec![50, 50]);
    }

    #[test]
    fn zero_variance_scenario_still_gets_one() {
        let sizes = calc_batch_sizes(&[0.0, 4.0], &[1.0, 1.0], 50);
        assert_eq!(sizes, vec![1, 100]);
    }

    proptest! {
        #[test]
        fn total_batch_tracks_the_default(
            variances in prop::collection::vec(0.01f64..1_000.0, 1..40),
            default_batch in 1usize..200,
        ) {
            let weights = vec![1.0; variances.len()];
            let sizes = calc_batch_sizes(&variances, &weights, default_batch);
            let spreads: Vec<f64> = variances.iter().map(|v| v.sqrt()).collect();
            let average = spreads.iter().sum::<f64>() / spreads.len() as f64;

            let lhs = sizes.iter().sum::<usize>() as f64 * average;
            let rhs = default_batch as f64 * spreads.iter().sum::<f64>();
            let slack = lhs - rhs;
            let tolerance = 1e-9 * rhs.max(1.0);
            prop_assert!(slack >= -tolerance);
            prop_assert!(slack <= variances.len() as f64 * average + tolerance);
        }
    }
}
