use super::solve_increasing;
use super::special::{chi_square_quantile, normal_sf};

/// GSP screening constant for first-stage size `n1`, error budget `alpha`
/// and `k` scenarios.
///
/// `eta` solves `E[2 (1 - Phi(eta sqrt(R)))] = 1 - (1 - alpha)^(1/(k-1))`
/// where `R` is the minimum of two independent `chi2(n1 - 1)` variables.
pub(crate) fn eta_constant(n1: usize, alpha: f64, k: usize, points: usize) -> f64 {
    if k < 2 {
        return 0.0;
    }
    let dof = n1.saturating_sub(1).max(1) as f64;
    let tail = 1.0 - (1.0 - alpha).powf(1.0 / (k - 1) as f64);

    // P(R <= r) = 1 - (1 - F(r))^2, so R's w-quantile is F^-1(1 - sqrt(1 - w)).
    let m = points.max(1);
    let roots: Vec<f64> = (0..m)
        .map(|i| {
            let w = (i as f64 + 0.5) / m as f64;
            chi_square_quantile(1.0 - (1.0 - w).sqrt(), dof).sqrt()
        })
        .collect();

    let expected_tail = |eta: f64| {
        roots
            .iter()
            .map(|root| 2.0 * normal_sf(eta * root))
            .sum::<f64>()
            / m as f64
    };

    solve_increasing(|eta| 1.0 - expected_tail(eta), 1.0 - tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_is_positive_and_moderate() {
        let eta = eta_constant(20, 0.025, 2, 256);
        assert!(eta > 0.3 && eta < 1.0, "eta = {eta}");
    }

    #[test]
    fn eta_grows_with_scenarios_and_shrinks_with_alpha() {
        let base = eta_constant(20, 0.025, 10, 256);
        assert!(eta_constant(20, 0.025, 100, 256) > base);
        assert!(eta_constant(20, 0.1, 10, 256) < base);
    }
}
