use super::solve_increasing;
use super::special::{chi_square_grid, normal_cdf};

/// Rinott's constant `h` for `k` scenarios, first-stage degrees of freedom
/// `dof` and probability of correct selection `confidence`.
///
/// `h` solves
/// `E_Y[ E_X[ Phi(h / sqrt(dof (1/X + 1/Y))) ]^(k-1) ] = confidence`
/// with `X, Y` independent `chi2(dof)`.
pub(crate) fn rinott_constant(k: usize, confidence: f64, dof: usize, points: usize) -> f64 {
    if k < 2 {
        return 0.0;
    }
    let dof = dof.max(1) as f64;
    let grid = chi_square_grid(dof, points);
    let inverse: Vec<f64> = grid.iter().map(|x| 1.0 / x).collect();
    let m = grid.len() as f64;
    let exponent = (k - 1) as i32;

    let coverage = |h: f64| {
        inverse
            .iter()
            .map(|inv_y| {
                let inner = inverse
                    .iter()
                    .map(|inv_x| normal_cdf(h / (dof * (inv_x + inv_y)).sqrt()))
                    .sum::<f64>()
                    / m;
                inner.powi(exponent)
            })
            .sum::<f64>()
            / m
    };

    solve_increasing(coverage, confidence)
}
