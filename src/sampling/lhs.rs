//! Latin hypercube and orthogonal designs.
//!
//! # References
//!
//! - McKay, M. D., Beckman, R. J. & Conover, W. J. (1979). "A comparison of
//!   three methods for selecting values of input variables in the analysis
//!   of output from a computer code", *Technometrics* 21(2).
//! - Owen, A. B. (1994). "Controlling correlations in Latin hypercube
//!   samples", *JASA* 89(428).

use super::UnitDesign;
use u_numflow::random::shuffle;
use crate::stats::correlation;
use rand::{Rng, RngExt};

/// Latin hypercube in the unit cube: `n` rows, `k` columns.
///
/// Column `j` places one point uniformly inside each of the `n` strata
/// `[i/n, (i+1)/n)` and then shuffles the strata. Columns are drawn in
/// order, each consuming `n` uniforms followed by one shuffle.
pub fn latin_hypercube<R: Rng>(n: usize, k: usize, rng: &mut R) -> UnitDesign {
    let mut rows = vec![vec![0.0; k]; n];
    for j in 0..k {
        let mut column: Vec<f64> = (0..n)
            .map(|i| (i as f64 + rng.random::<f64>()) / n as f64)
            .collect();
        shuffle(&mut column, rng);
        for (row, value) in rows.iter_mut().zip(column) {
            row[j] = value;
        }
    }
    rows
}

/// Largest absolute Pearson correlation between two columns of `design`.
pub fn max_abs_correlation(design: &UnitDesign) -> f64 {
    let k = design.first().map_or(0, Vec::len);
    let columns: Vec<Vec<f64>> = (0..k)
        .map(|j| design.iter().map(|row| row[j]).collect())
        .collect();
    let mut worst = 0.0f64;
    for a in 0..k {
        for b in (a + 1)..k {
            worst = worst.max(correlation(&columns[a], &columns[b]).abs());
        }
    }
    worst
}

/// Draws `iterations` Latin hypercubes and keeps the one whose columns are
/// the least correlated. Ties keep the earlier design.
pub fn orthogonal<R: Rng>(n: usize, k: usize, iterations: usize, rng: &mut R) -> UnitDesign {
    let mut best: Option<(f64, UnitDesign)> = None;
    for _ in 0..iterations.max(1) {
        let design = latin_hypercube(n, k, rng);
        let score = max_abs_correlation(&design);
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, design));
        }
    }
    best.map(|(_, d)| d).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_each_stratum_hit_once(n in 1usize..40, k in 1usize..5, seed in any::<u64>()) {
            let mut rng = create_rng(seed);
            let design = latin_hypercube(n, k, &mut rng);
            prop_assert_eq!(design.len(), n);
            for j in 0..k {
                let mut strata: Vec<usize> = design
                    .iter()
                    .map(|row| ((row[j] * n as f64).floor() as usize).min(n - 1))
                    .collect();
                strata.sort_unstable();
                prop_assert_eq!(strata, (0..n).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn test_orthogonal_not_worse_than_first_candidate() {
        let first = latin_hypercube(20, 3, &mut create_rng(4));
        let chosen = orthogonal(20, 3, 8, &mut create_rng(4));
        assert!(max_abs_correlation(&chosen) <= max_abs_correlation(&first));
    }

    #[test]
    fn test_single_column_correlation_is_zero() {
        let design = latin_hypercube(5, 1, &mut create_rng(1));
        assert_eq!(max_abs_correlation(&design), 0.0);
    }
}
