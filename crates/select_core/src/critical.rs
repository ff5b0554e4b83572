//! Critical values that calibrate the GSP thresholds.
//!
//! The procedures only see the [`CriticalValues`] trait. The default
//! [`NumericalCriticalValues`] integrates over chi-square quantile grids
//! and solves for the constant by bisection; [`FixedCriticalValues`] hands
//! out constants, which is what tests and benchmarks use.

mod eta;
mod rinott;
pub mod special;

/// Source of the two GSP critical values.
pub trait CriticalValues: Send + Sync {
    /// Rinott's constant `h(k, confidence, dof)`.
    fn rinott(&self, k: usize, confidence: f64, dof: usize) -> f64;

    /// Screening constant `eta(n1, alpha, k)`.
    fn eta(&self, n1: usize, alpha: f64, k: usize) -> f64;
}

/// Solves the defining integrals numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericalCriticalValues {
    /// Quadrature points per chi-square dimension.
    pub quadrature_points: usize,
}

impl Default for NumericalCriticalValues {
    fn default() -> Self {
        Self {
            quadrature_points: 128,
        }
    }
}

impl CriticalValues for NumericalCriticalValues {
    fn rinott(&self, k: usize, confidence: f64, dof: usize) -> f64 {
        rinott::rinott_constant(k, confidence, dof, self.quadrature_points)
    }

    fn eta(&self, n1: usize, alpha: f64, k: usize) -> f64 {
        eta::eta_constant(n1, alpha, k, self.quadrature_points * 4)
    }
}

/// Constant critical values, independent of the arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedCriticalValues {
    pub rinott_h: f64,
    pub eta: f64,
}

impl CriticalValues for FixedCriticalValues {
    fn rinott(&self, _k: usize, _confidence: f64, _dof: usize) -> f64 {
        self.rinott_h
    }

    fn eta(&self, _n1: usize, _alpha: f64, _k: usize) -> f64 {
        self.eta
    }
}

/// Smallest `x >= 0` with `f(x) >= target` for a nondecreasing `f`.
fn solve_increasing<F: Fn(f64) -> f64>(f: F, target: f64) -> f64 {
    if f(0.0) >= target {
        return 0.0;
    }
    let mut lo = 0.0;
    let mut hi = 1.0;
    while f(hi) < target {
        lo = hi;
        hi *= 2.0;
        if hi > 1e6 {
            return hi;
        }
    }
    for _ in 0..100 {
        let mid = 0.5 * (lo + hi);
        if f(mid) < target {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-9 {
            break;
        }
    }
    0.5 * (lo + hi)
}
