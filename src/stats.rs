//! Statistics not covered by [`u_numflow::stats`].
//!
//! Scalar summaries (`mean`, `variance`, `std_dev`) and the Student-t
//! distribution are taken from `u_numflow` directly; this module adds the
//! column correlation used by orthogonal sampling and prefix-wise running
//! series used by the stochasticity estimators.

use u_numflow::stats::{mean, WelfordAccumulator};

/// Pearson correlation of two equally long columns.
///
/// Returns `0.0` when either column is constant or shorter than two.
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (Some(ma), Some(mb)) = (mean(&a[..n]), mean(&b[..n])) else {
        return 0.0;
    };
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for i in 0..n {
        let (da, db) = (a[i] - ma, b[i] - mb);
        cov += da * db;
        va += da * da;
        vb += db * db;
    }
    if va <= 0.0 || vb <= 0.0 {
        0.0
    } else {
        cov / (va * vb).sqrt()
    }
}

/// Running statistics over growing prefixes.
///
/// Element `i` of each vector describes `values[..=i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningStats {
    pub mean: Vec<f64>,
    /// Population standard deviation of each prefix.
    pub std: Vec<f64>,
}

impl RunningStats {
    /// Feeds `values` one by one through a [`WelfordAccumulator`] and
    /// records its state after each.
    pub fn of(values: &[f64]) -> Self {
        let mut acc = WelfordAccumulator::new();
        let mut mean = Vec::with_capacity(values.len());
        let mut std = Vec::with_capacity(values.len());
        for &x in values {
            acc.update(x);
            mean.push(acc.mean().unwrap_or(f64::NAN));
            std.push(acc.population_std_dev().unwrap_or(f64::NAN));
        }
        Self { mean, std }
    }
}
