//! Distribution-based sensitivity: the β^KU index.
//!
//! For a parameter θ, the output distribution conditional on each observed
//! value of θ is compared with the unconditional one through the Kuiper
//! distance `max(F_c - F) + |min(F_c - F)|`, both CDFs binned over the
//! output range. The index averages that distance over θ's distinct values.
//!
//! # References
//!
//! - Baucells, M. & Borgonovo, E. (2013). "Invariant probabilistic
//!   sensitivity analysis", *Management Science* 59(11).

use super::distinct;
use crate::error::{Error, Result};
use crate::evaluator::{evaluate_all, EvaluationResult, Evaluator};
use crate::param::{active_specs, Assignment, ParameterSpec, Value};
use crate::random::rng_from_seed;
use crate::sampling::{generate, SamplingConfig};
use crate::table::Table;
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::info;

/// Default number of bins of the empirical CDFs.
pub const DEFAULT_GRANULARITY: usize = 100;

/// Binned empirical CDF over `[lo, hi]`.
fn binned_cdf(values: &[f64], lo: f64, hi: f64, bins: usize) -> Vec<f64> {
    let mut counts = vec![0usize; bins];
    let width = (hi - lo) / bins as f64;
    for &v in values {
        let idx = if width > 0.0 {
            (((v - lo) / width).floor().max(0.0) as usize).min(bins - 1)
        } else {
            bins - 1
        };
        counts[idx] += 1;
    }
    let total = values.len().max(1) as f64;
    let mut cumulative = 0.0;
    counts
        .into_iter()
        .map(|c| {
            cumulative += c as f64 / total;
            cumulative
        })
        .collect()
}

/// Kuiper distance between two CDFs on the same bins.
fn kuiper(conditional: &[f64], unconditional: &[f64]) -> f64 {
    let (lo, hi) = conditional
        .iter()
        .zip(unconditional)
        .map(|(c, u)| c - u)
        .fold((0.0f64, 0.0f64), |(lo, hi), d| (lo.min(d), hi.max(d)));
    hi + lo.abs()
}

/// β^KU of every parameter for one output.
///
/// Every replicate value counts as an observation. Assignments are read in
/// `order`; those without a result are skipped.
///
/// # Errors
///
/// [`Error::Configuration`] for fewer than 2 bins; [`Error::MissingOutput`]
/// when a result lacks `output`.
pub fn beta_indices(
    parameters: &[String],
    order: &[Assignment],
    results: &HashMap<Assignment, EvaluationResult>,
    output: &str,
    granularity: usize,
) -> Result<Vec<f64>> {
    if granularity < 2 {
        return Err(Error::config("beta granularity must be at least 2"));
    }
    let mut observations: Vec<(&Assignment, &[f64])> = Vec::new();
    for a in order {
        let Some(result) = results.get(a) else {
            continue;
        };
        let values = result.get(output).ok_or_else(|| Error::MissingOutput {
            output: output.to_string(),
            assignment: a.clone(),
        })?;
        observations.push((a, values));
    }
    let all: Vec<f64> = observations.iter().flat_map(|(_, v)| v.iter().copied()).collect();
    if all.is_empty() {
        return Ok(vec![f64::NAN; parameters.len()]);
    }
    let lo = all.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = all.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let unconditional = binned_cdf(&all, lo, hi, granularity);

    let betas = parameters
        .iter()
        .map(|p| {
            // Conditional samples per distinct value, in first-seen order.
            let mut groups: Vec<(Option<&Value>, Vec<f64>)> = Vec::new();
            let mut index: HashMap<Option<&Value>, usize> = HashMap::new();
            for (a, values) in &observations {
                let key = a.get(p);
                let slot = *index.entry(key).or_insert_with(|| {
                    groups.push((key, Vec::new()));
                    groups.len() - 1
                });
                groups[slot].1.extend_from_slice(values);
            }
            let distances: Vec<f64> = groups
                .iter()
                .map(|(_, ys)| kuiper(&binned_cdf(ys, lo, hi, granularity), &unconditional))
                .collect();
            distances.iter().sum::<f64>() / distances.len() as f64
        })
        .collect();
    Ok(betas)
}

/// β^KU per output and parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct BetaAnalysis {
    pub parameters: Vec<String>,
    pub outputs: Vec<(String, Vec<f64>)>,
}

impl BetaAnalysis {
    /// Samples with `sampling`, evaluates the distinct points in one batch
    /// and computes the indices.
    ///
    /// The design should repeat parameter values (factorial, Morris or
    /// Saltelli); with continuous uniform draws every conditional sample
    /// holds a single point.
    pub fn run<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        sampling: &SamplingConfig,
        outputs: &[String],
        granularity: usize,
        seed: Option<u64>,
    ) -> Result<Self> {
        let active = active_specs(specs)?;
        let mut rng = rng_from_seed(seed);
        let batch = distinct(&generate(&active, sampling, &mut rng)?);
        info!(
            parameters = active.len(),
            points = batch.len(),
            method = sampling.method.name(),
            "starting beta analysis"
        );
        let results = evaluate_all(evaluator, &batch)?;
        let parameters: Vec<String> = active.iter().map(|s| s.name.clone()).collect();
        Self::analyze(&parameters, &batch, &results, outputs, granularity)
    }

    pub fn analyze(
        parameters: &[String],
        order: &[Assignment],
        results: &HashMap<Assignment, EvaluationResult>,
        outputs: &[String],
        granularity: usize,
    ) -> Result<Self> {
        let outputs = outputs
            .iter()
            .map(|o| Ok((o.clone(), beta_indices(parameters, order, results, o, granularity)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            parameters: parameters.to_vec(),
            outputs,
        })
    }

    pub fn get(&self, output: &str, parameter: &str) -> Option<f64> {
        let p = self.parameters.iter().position(|n| n == parameter)?;
        self.outputs
            .iter()
            .find(|(o, _)| o == output)
            .and_then(|(_, v)| v.get(p).copied())
    }

    /// Parameters as rows, outputs as columns.
    pub fn text_report(&self) -> String {
        let mut out = String::from("BETA Kuiper based estimator\n");
        let names: Vec<&str> = self.outputs.iter().map(|(o, _)| o.as_str()).collect();
        let _ = writeln!(out, "inputs,{}", names.join(","));
        for (p, name) in self.parameters.iter().enumerate() {
            let cells: Vec<String> = self.outputs.iter().map(|(_, b)| b[p].to_string()).collect();
            let _ = writeln!(out, "{name},{}", cells.join(","));
        }
        out
    }

    /// `output,parameter,beta`, one row per pair.
    pub fn csv_table(&self) -> Table {
        let header = vec!["output".to_string(), "parameter".to_string(), "beta".to_string()];
        let rows = self
            .outputs
            .iter()
            .flat_map(|(o, betas)| {
                self.parameters
                    .iter()
                    .zip(betas)
                    .map(move |(p, b)| vec![o.clone(), p.clone(), b.to_string()])
            })
            .collect();
        Table { header, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::FnEvaluator;
    use crate::sampling::SamplingMethod;

    #[test]
    fn test_binned_cdf() {
        let cdf = binned_cdf(&[0.0, 0.5, 1.0, 1.0], 0.0, 1.0, 4);
        assert_eq!(cdf, vec![0.25, 0.25, 0.5, 1.0]);
        // constant sample lands in the last bin
        assert_eq!(binned_cdf(&[2.0, 2.0], 2.0, 2.0, 3), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_kuiper() {
        assert_eq!(kuiper(&[0.5, 1.0], &[0.5, 1.0]), 0.0);
        assert!((kuiper(&[0.8, 1.0], &[0.3, 1.0]) - 0.5).abs() < 1e-12);
        assert!((kuiper(&[0.2, 0.9, 1.0], &[0.5, 0.5, 1.0]) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_influential_parameter_ranks_first() {
        let specs = vec![
            ParameterSpec::int("a", 0, 4).with_step(1),
            ParameterSpec::int("b", 0, 4).with_step(1),
        ];
        let eval = FnEvaluator::new(|a: &Assignment| {
            let x = a.get("a").and_then(Value::as_f64).unwrap_or(0.0);
            Ok(EvaluationResult::new().with_output("y", [10.0 * x]))
        });
        let sampling = SamplingConfig::new(SamplingMethod::Exhaustive);
        let beta = BetaAnalysis::run(&specs, &eval, &sampling, &["y".into()], DEFAULT_GRANULARITY, Some(1)).unwrap();
        let a = beta.get("y", "a").unwrap();
        let b = beta.get("y", "b").unwrap();
        assert!(a > 0.5, "beta_a = {a}");
        assert_eq!(b, 0.0);
        assert_eq!(beta.csv_table().rows.len(), 2);
        assert!(beta.text_report().starts_with("BETA"));
    }

    #[test]
    fn test_granularity_validated() {
        let r = beta_indices(&[], &[], &HashMap::new(), "y", 1);
        assert!(matches!(r, Err(Error::Configuration(_))));
    }
}
