//! Global sensitivity analysis.
//!
//! - [`morris`]: elementary effects screening (µ, µ*, σ)
//! - [`sobol`]: variance-based first and total order indices
//! - [`beta`]: distribution-based β^KU indices
//!
//! Every analysis reads scalar outputs from a map `Assignment ->
//! EvaluationResult`; replicates are collapsed with a
//! [`Combination`] before any statistic is computed.

pub mod beta;
pub mod morris;
pub mod sobol;

pub use beta::{beta_indices, BetaAnalysis, DEFAULT_GRANULARITY};
pub use morris::{MorrisAnalysis, MorrisConfig, MorrisIndices};
pub use sobol::{SobolAnalysis, SobolIndices};

use crate::error::{Error, Result};
use crate::evaluator::{Combination, EvaluationResult};
use crate::param::{Assignment, Batch};
use std::collections::{HashMap, HashSet};

/// Scalar value of `output` for `assignment`.
pub(crate) fn output_value(
    results: &HashMap<Assignment, EvaluationResult>,
    assignment: &Assignment,
    output: &str,
    combination: Combination,
) -> Result<f64> {
    let result = results
        .get(assignment)
        .ok_or_else(|| Error::MissingEvaluation(assignment.clone()))?;
    result
        .aggregate(output, combination)
        .ok_or_else(|| Error::MissingOutput {
            output: output.to_string(),
            assignment: assignment.clone(),
        })
}

/// First occurrence of every assignment, in order.
pub(crate) fn distinct(batch: &[Assignment]) -> Batch {
    let mut seen = HashSet::new();
    batch.iter().filter(|a| seen.insert(*a)).cloned().collect()
}
