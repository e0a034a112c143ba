//! Variance-based (Sobol) sensitivity indices from a Saltelli sample.
//!
//! With `f(A)`, `f(B)` and `f(AB^j)` (row of `A` with column `j` from `B`)
//! and `V` the variance of all `f(A)` and `f(B)` values:
//!
//! - first order: `S_j = mean(f(B) (f(AB^j) - f(A))) / V`
//! - total order: `ST_j = mean((f(A) - f(AB^j))^2) / (2V)`
//!
//! # References
//!
//! - Saltelli, A. et al. (2010). "Variance based sensitivity analysis of
//!   model output. Design and estimator for the total sensitivity index",
//!   *Computer Physics Communications* 181(2).
//! - Jansen, M. J. W. (1999). "Analysis of variance designs for model
//!   output", *Computer Physics Communications* 117.

use super::{distinct, output_value};
use crate::error::{Error, Result};
use crate::evaluator::{evaluate_all, Combination, EvaluationResult, Evaluator};
use crate::param::{active_specs, Assignment, ParameterSpec};
use crate::random::rng_from_seed;
use crate::sampling::{saltelli_sample, SaltelliSample};
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::info;
use u_numflow::stats::{mean, population_variance};

/// Indices of one parameter for one output. `NaN` when the output does not
/// vary.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SobolIndices {
    pub first_order: f64,
    pub total_order: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SobolAnalysis {
    pub parameters: Vec<String>,
    pub outputs: Vec<(String, Vec<SobolIndices>)>,
}

impl SobolAnalysis {
    /// Samples `n` base rows, evaluates every distinct point in one batch
    /// and computes the indices.
    pub fn run<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        n: usize,
        outputs: &[String],
        seed: Option<u64>,
    ) -> Result<Self> {
        if n == 0 {
            return Err(Error::config("sobol needs at least one base row"));
        }
        let specs = active_specs(specs)?;
        let mut rng = rng_from_seed(seed);
        let sample = saltelli_sample(&specs, n, &mut rng);
        let batch = distinct(&sample.assignments);
        info!(parameters = specs.len(), points = batch.len(), "starting sobol analysis");
        let results = evaluate_all(evaluator, &batch)?;
        Self::analyze(&sample, &results, outputs, Combination::Mean)
    }

    pub fn analyze(
        sample: &SaltelliSample,
        results: &HashMap<Assignment, EvaluationResult>,
        outputs: &[String],
        combination: Combination,
    ) -> Result<Self> {
        let n = sample.base_rows;
        let k = sample.parameters.len();
        let mut analysed = Vec::with_capacity(outputs.len());
        for output in outputs {
            let y = sample
                .assignments
                .iter()
                .map(|a| output_value(results, a, output, combination))
                .collect::<Result<Vec<f64>>>()?;
            let fa: Vec<f64> = (0..n).map(|i| y[sample.index_a(i)]).collect();
            let fb: Vec<f64> = (0..n).map(|i| y[sample.index_b(i)]).collect();
            let all: Vec<f64> = fa.iter().chain(&fb).copied().collect();
            let variance = population_variance(&all).unwrap_or(f64::NAN);

            let indices = (0..k)
                .map(|j| {
                    if variance.is_nan() || variance <= 0.0 {
                        return SobolIndices {
                            first_order: f64::NAN,
                            total_order: f64::NAN,
                        };
                    }
                    let fab: Vec<f64> = (0..n).map(|i| y[sample.index_ab(i, j)]).collect();
                    let first: Vec<f64> = (0..n).map(|i| fb[i] * (fab[i] - fa[i])).collect();
                    let total: Vec<f64> = (0..n).map(|i| (fa[i] - fab[i]).powi(2)).collect();
                    SobolIndices {
                        first_order: mean(&first).unwrap_or(f64::NAN) / variance,
                        total_order: mean(&total).unwrap_or(f64::NAN) / (2.0 * variance),
                    }
                })
                .collect();
            analysed.push((output.clone(), indices));
        }
        Ok(Self {
            parameters: sample.parameters.clone(),
            outputs: analysed,
        })
    }

    pub fn get(&self, output: &str, parameter: &str) -> Option<&SobolIndices> {
        let p = self.parameters.iter().position(|n| n == parameter)?;
        self.outputs
            .iter()
            .find(|(o, _)| o == output)
            .and_then(|(_, v)| v.get(p))
    }

    pub fn text_report(&self) -> String {
        let mut out = String::from("SOBOL ANALYSIS\n");
        for (output, indices) in &self.outputs {
            let _ = writeln!(out, "\nResult for output: {output}");
            let _ = writeln!(out, "parameter\tfirst order\ttotal order");
            for (p, s) in self.parameters.iter().zip(indices) {
                let _ = writeln!(out, "{p}\t{:.6}\t{:.6}", s.first_order, s.total_order);
            }
        }
        out
    }
}
