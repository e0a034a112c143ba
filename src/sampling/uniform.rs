//! Uniform random designs.

use super::exhaustive::cartesian;
use crate::param::{Assignment, Batch, ParameterSpec, Value};
use rand::{Rng, RngExt};

/// `n` assignments, each parameter drawn uniformly and independently.
///
/// Draw order: assignment by assignment, parameters in declaration order.
pub fn uniform<R: Rng>(specs: &[ParameterSpec], n: usize, rng: &mut R) -> Batch {
    if specs.is_empty() {
        return Vec::new();
    }
    (0..n)
        .map(|_| {
            specs
                .iter()
                .map(|s| (s.name.clone(), s.from_unit(rng.random())))
                .collect::<Assignment>()
        })
        .collect()
}

/// Largest `c >= 1` with `c^k <= n`.
pub fn implicit_factor(n: usize, k: usize) -> usize {
    if k == 0 {
        return 1;
    }
    let mut c = ((n as f64).powf(1.0 / k as f64).floor() as usize).max(1);
    while c > 1 && c.checked_pow(k as u32).map_or(true, |p| p > n) {
        c -= 1;
    }
    while (c + 1).checked_pow(k as u32).is_some_and(|p| p <= n) {
        c += 1;
    }
    c
}

/// Per-parameter draw counts: explicit entries first, padded with the
/// implicit factor.
pub fn factor_counts(k: usize, n: usize, explicit: Option<&[usize]>) -> Vec<usize> {
    let fallback = implicit_factor(n, k);
    (0..k)
        .map(|j| {
            explicit
                .and_then(|e| e.get(j).copied())
                .unwrap_or(fallback)
                .max(1)
        })
        .collect()
}

/// Factorial-uniform design.
///
/// Parameter `j` gets `counts[j]` uniform draws (repeated values are
/// kept once), then every combination is emitted with the first parameter
/// varying slowest.
pub fn factorial<R: Rng>(specs: &[ParameterSpec], counts: &[usize], rng: &mut R) -> Batch {
    let columns: Vec<Vec<Value>> = specs
        .iter()
        .zip(counts)
        .map(|(spec, &count)| {
            let mut column: Vec<Value> = Vec::with_capacity(count);
            for _ in 0..count {
                let v = spec.from_unit(rng.random());
                if !column.contains(&v) {
                    column.push(v);
                }
            }
            column
        })
        .collect();
    cartesian(specs, &columns)
}
