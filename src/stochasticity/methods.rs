//! Replicate-count estimators.
//!
//! # References
//!
//! - Lee, J.-S. et al. (2015). "The Complexities of Agent-Based Modeling
//!   Output Analysis", *JASSS* 18(4).
//! - Secchi, D. & Seri, R. (2017). "Controlling for false negatives in
//!   agent-based models: a review of power analysis in organizational
//!   research", *Computational and Mathematical Organization Theory* 23.

use crate::stats::RunningStats;
use std::cmp::Ordering;
use u_numflow::special::t_distribution_quantile;
use u_numflow::stats::{mean, variance};

/// Every estimator needs at least this many replicates.
pub const MIN_REPLICATES: usize = 3;

/// Effect-size bands, relative to the series mean.
pub const EFFECT_SIZE_BANDS: [(&str, f64); 6] = [
    ("ultra-micro", 0.01),
    ("micro", 0.05),
    ("small", 0.1),
    ("medium", 0.2),
    ("large", 0.4),
    ("huge", 0.8),
];

/// `(alpha, beta)` quantile pairs: strict first, then lenient.
pub const CONFIDENCE_PAIRS: [(f64, f64); 2] = [(0.99, 0.95), (0.95, 0.80)];

/// Outcome of a replicate-count estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Recommendation {
    Replicates(usize),
    /// Fewer than [`MIN_REPLICATES`] values were available.
    InsufficientData { available: usize },
}

impl Recommendation {
    pub fn count(self) -> Option<usize> {
        match self {
            Recommendation::Replicates(n) => Some(n),
            Recommendation::InsufficientData { .. } => None,
        }
    }
}

/// What a single-series estimate looks for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Criterion {
    CoefficientOfVariation { threshold: f64 },
    StandardError { threshold: f64 },
    CriticalEffectSize { effect_size: f64, alpha: f64, beta: f64 },
}

/// Running coefficient of variation; element `i` covers `values[..=i]`.
///
/// A prefix with zero spread has a CV of 0 whatever its mean.
pub fn coefficient_of_variation_series(values: &[f64]) -> Vec<f64> {
    let stats = RunningStats::of(values);
    stats
        .std
        .iter()
        .zip(&stats.mean)
        .map(|(s, m)| if *s == 0.0 { 0.0 } else { s / m })
        .collect()
}

/// Running standard error `std / sqrt(i + 1)`.
pub fn standard_error_series(values: &[f64]) -> Vec<f64> {
    RunningStats::of(values)
        .std
        .iter()
        .enumerate()
        .map(|(i, s)| s / ((i + 1) as f64).sqrt())
        .collect()
}

/// Smallest `i >= 2` whose marginal decrease `series[i-1] - series[i]` lies
/// in `[0, min * threshold]`, else the series length.
///
/// The minimum ignores element 0, a single value having no spread.
pub fn find_with_relative_threshold(series: &[f64], threshold: f64) -> usize {
    let min = series
        .iter()
        .skip(1)
        .copied()
        .fold(f64::INFINITY, f64::min);
    let bound = min * threshold;
    (2..series.len())
        .find(|&i| {
            let decrease = series[i - 1] - series[i];
            decrease >= 0.0 && decrease <= bound
        })
        .unwrap_or(series.len())
}

/// Smallest subset size that detects `effect_size × mean` with a two-sample
/// t-test at the given `(alpha, beta)` quantiles.
///
/// The subset starts with the minimum and the maximum, then admits the
/// remaining values by descending distance from the mean. After each
/// addition `n_required = 2 s^2 / ES^2 (t(alpha) + t(beta))^2` with
/// `size - 1` degrees of freedom; the first size reaching it is returned,
/// else the series length.
pub fn critical_effect_size(values: &[f64], effect_size: f64, alpha: f64, beta: f64) -> usize {
    let n = values.len();
    if n < 2 {
        return n;
    }
    let m = mean(values).unwrap_or(f64::NAN);
    let es = effect_size * m;

    let min_at = (0..n)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);
    let max_at = (0..n)
        .filter(|&i| i != min_at)
        .max_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);
    let mut rest: Vec<f64> = (0..n)
        .filter(|&i| i != min_at && i != max_at)
        .map(|i| values[i])
        .collect();
    rest.sort_by(|a, b| {
        (b - m)
            .abs()
            .partial_cmp(&(a - m).abs())
            .unwrap_or(Ordering::Equal)
    });

    let mut subset = vec![values[min_at], values[max_at]];
    for v in rest {
        subset.push(v);
        let df = (subset.len() - 1) as f64;
        let t = t_distribution_quantile(alpha, df) + t_distribution_quantile(beta, df);
        let spread = variance(&subset).unwrap_or(f64::NAN);
        let required = 2.0 * spread / (es * es) * t * t;
        if subset.len() as f64 >= required {
            return subset.len();
        }
    }
    n
}

/// Recommends a replicate count for one series.
///
/// ```
/// use u_explore::stochasticity::{recommend_replicates, Criterion, Recommendation};
///
/// let constant = [4.0; 6];
/// let r = recommend_replicates(&constant, Criterion::CoefficientOfVariation { threshold: 0.01 });
/// assert_eq!(r, Recommendation::Replicates(2));
///
/// let short = [1.0, 2.0];
/// let r = recommend_replicates(&short, Criterion::StandardError { threshold: 0.01 });
/// assert_eq!(r, Recommendation::InsufficientData { available: 2 });
/// ```
pub fn recommend_replicates(series: &[f64], criterion: Criterion) -> Recommendation {
    if series.len() < MIN_REPLICATES {
        return Recommendation::InsufficientData {
            available: series.len(),
        };
    }
    let n = match criterion {
        Criterion::CoefficientOfVariation { threshold } => {
            find_with_relative_threshold(&coefficient_of_variation_series(series), threshold)
        }
        Criterion::StandardError { threshold } => {
            find_with_relative_threshold(&standard_error_series(series), threshold)
        }
        Criterion::CriticalEffectSize {
            effect_size,
            alpha,
            beta,
        } => critical_effect_size(series, effect_size, alpha, beta),
    };
    Recommendation::Replicates(n)
}

/// ANOVA effect size: between-group variance of the group means
/// (denominator `j - 1`) over the within-group variance pooled across all
/// observations.
///
/// `NaN` with fewer than two groups.
pub fn anova_effect_size(groups: &[&[f64]]) -> f64 {
    let groups: Vec<&[f64]> = groups.iter().copied().filter(|g| !g.is_empty()).collect();
    let j = groups.len();
    if j < 2 {
        return f64::NAN;
    }
    let means: Vec<f64> = groups.iter().map(|g| mean(g).unwrap_or(f64::NAN)).collect();
    let overall = mean(&means).unwrap_or(f64::NAN);
    let between = means.iter().map(|m| (m - overall).powi(2)).sum::<f64>() / (j - 1) as f64;
    let observations: usize = groups.iter().map(|g| g.len()).sum();
    let within = groups
        .iter()
        .zip(&means)
        .map(|(g, m)| g.iter().map(|x| (x - m).powi(2)).sum::<f64>())
        .sum::<f64>()
        / observations as f64;
    between / within
}

/// Replicates suggested by the power-test regression
/// `14.091 · j^-0.640 · f^-1.986`.
pub fn power_test_replicates(groups: usize, effect_size: f64) -> f64 {
    14.091 * (groups as f64).powf(-0.640) * effect_size.powf(-1.986)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_constant_series() {
        let series = [7.5; 8];
        assert!(coefficient_of_variation_series(&series).iter().all(|c| *c == 0.0));
        assert!(standard_error_series(&series).iter().all(|s| *s == 0.0));
        for threshold in [0.05, 0.01, 0.001] {
            assert_eq!(
                recommend_replicates(&series, Criterion::CoefficientOfVariation { threshold }),
                Recommendation::Replicates(2)
            );
            assert_eq!(
                recommend_replicates(&series, Criterion::StandardError { threshold }),
                Recommendation::Replicates(2)
            );
        }
    }

    #[test]
    fn test_cv_threshold_search() {
        let series = [10.0, 12.0, 11.0, 11.0, 11.0];
        let cv = coefficient_of_variation_series(&series);
        assert!((cv[1] - 1.0 / 11.0).abs() < 1e-12);
        assert_eq!(find_with_relative_threshold(&cv, 0.5), 2);
        assert_eq!(find_with_relative_threshold(&cv, 0.05), 5);
    }

    #[test]
    fn test_growing_cv_never_settles() {
        let series = [1.0, 2.0, 4.0, 8.0, 16.0];
        assert_eq!(
            recommend_replicates(&series, Criterion::CoefficientOfVariation { threshold: 0.05 }),
            Recommendation::Replicates(5)
        );
    }

    #[test]
    fn test_insufficient_data() {
        for c in [
            Criterion::CoefficientOfVariation { threshold: 0.05 },
            Criterion::StandardError { threshold: 0.05 },
            Criterion::CriticalEffectSize {
                effect_size: 0.2,
                alpha: 0.99,
                beta: 0.95,
            },
        ] {
            assert_eq!(
                recommend_replicates(&[1.0, 2.0], c),
                Recommendation::InsufficientData { available: 2 }
            );
        }
    }

    #[test]
    fn test_critical_effect_size() {
        // no spread: the first admitted value already suffices
        assert_eq!(critical_effect_size(&[3.0; 10], 0.1, 0.99, 0.95), 3);
        // a zero mean makes every effect size zero
        assert_eq!(critical_effect_size(&[-1.0, 1.0, -1.0, 1.0], 0.1, 0.99, 0.95), 4);
        // noisy series, tiny effect: the whole series is not enough
        let noisy = [90.0, 110.0, 95.0, 105.0, 100.0, 98.0];
        assert_eq!(critical_effect_size(&noisy, 0.01, 0.99, 0.95), noisy.len());
        // huge effect: detected early
        assert_eq!(critical_effect_size(&noisy, 0.8, 0.95, 0.80), 3);
    }

    #[test]
    fn test_power_formula() {
        let expected = 14.091 * 10f64.powf(-0.640) * 0.5f64.powf(-1.986);
        assert_eq!(power_test_replicates(10, 0.5), expected);
    }

    #[test]
    fn test_anova_effect_size() {
        let f = anova_effect_size(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);
        assert!((f - 6.75).abs() < 1e-12);
        assert!(anova_effect_size(&[&[1.0, 2.0]]).is_nan());
    }

    proptest! {
        #[test]
        fn prop_recommendation_within_series(values in prop::collection::vec(1.0f64..100.0, 3..30)) {
            for c in [
                Criterion::CoefficientOfVariation { threshold: 0.01 },
                Criterion::StandardError { threshold: 0.01 },
                Criterion::CriticalEffectSize { effect_size: 0.2, alpha: 0.95, beta: 0.80 },
            ] {
                let n = recommend_replicates(&values, c).count();
                prop_assert!(n.is_some_and(|n| n >= 2 && n <= values.len()));
            }
        }
    }
}
