//! Evaluator contract.
//!
//! The evaluator runs the simulation model; this crate only decides what to
//! run. Every algorithm hands the evaluator whole batches so it can spread
//! them over its own worker pool.

use crate::error::{Error, Result};
use crate::param::{Assignment, Value};
use std::collections::{BTreeMap, HashMap};

/// Output name read by default as the fitness of an assignment.
pub const FITNESS_OUTPUT: &str = "fitness";

/// Observed outputs for one assignment: output name to one value per
/// replicate, in replicate order.
///
/// Boolean observations are stored as `0.0`/`1.0`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationResult {
    outputs: BTreeMap<String, Vec<f64>>,
}

impl EvaluationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: sets the replicate values of one output.
    pub fn with_output(mut self, name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        self.outputs.insert(name.into(), values.into_iter().collect());
        self
    }

    /// Appends one replicate observation of `name`.
    pub fn push(&mut self, name: &str, value: f64) {
        self.outputs.entry(name.to_string()).or_default().push(value);
    }

    /// Appends a typed observation; booleans become `0.0`/`1.0`.
    ///
    /// Returns `false` when the value has no numeric form.
    pub fn push_value(&mut self, name: &str, value: &Value) -> bool {
        match value.as_f64() {
            Some(v) => {
                self.push(name, v);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.outputs.get(name).map(Vec::as_slice)
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.outputs.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Replicate count shared by every output, or `None` if they differ.
    pub fn replicate_count(&self) -> Option<usize> {
        let mut counts = self.outputs.values().map(Vec::len);
        let first = counts.next()?;
        counts.all(|c| c == first).then_some(first)
    }

    /// Collapses the replicates of one output into a scalar.
    pub fn aggregate(&self, name: &str, combination: Combination) -> Option<f64> {
        self.get(name).and_then(|v| combination.apply(v))
    }
}

/// How replicate values of the fitness output collapse into one fitness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Combination {
    Max,
    Min,
    #[default]
    Mean,
}

impl Combination {
    /// Returns `None` for an empty slice.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(match self {
            Combination::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Combination::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Combination::Mean => values.iter().sum::<f64>() / values.len() as f64,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Combination::Max => "maximum",
            Combination::Min => "minimum",
            Combination::Mean => "average",
        }
    }
}

/// Runs the model for batches of assignments.
///
/// Implementations may run a batch in parallel but must return a result
/// for every submitted assignment. They must not retry on their own: a
/// failure is reported as [`Error::Evaluation`] carrying the assignment.
///
/// # Thread Safety
///
/// `Evaluator` is `Send + Sync` so a run can be driven from any thread and
/// cancelled from another.
pub trait Evaluator: Send + Sync {
    /// Evaluates every assignment of `batch`.
    fn evaluate(&self, batch: &[Assignment]) -> Result<HashMap<Assignment, EvaluationResult>>;

    /// Evaluates a single assignment.
    ///
    /// The default implementation submits a batch of one.
    fn evaluate_one(&self, assignment: &Assignment) -> Result<EvaluationResult> {
        let mut results = self.evaluate(std::slice::from_ref(assignment))?;
        results
            .remove(assignment)
            .ok_or_else(|| Error::MissingEvaluation(assignment.clone()))
    }

    /// Called once when the driving run observes a cancellation request.
    ///
    /// The default implementation is a no-op.
    fn on_cancel(&self) {}
}

/// Evaluates `batch` and checks that no assignment was dropped.
pub fn evaluate_all<E: Evaluator + ?Sized>(
    evaluator: &E,
    batch: &[Assignment],
) -> Result<HashMap<Assignment, EvaluationResult>> {
    if batch.is_empty() {
        return Ok(HashMap::new());
    }
    let results = evaluator.evaluate(batch)?;
    if let Some(missing) = batch.iter().find(|a| !results.contains_key(*a)) {
        return Err(Error::MissingEvaluation(missing.clone()));
    }
    Ok(results)
}

/// An [`Evaluator`] built from a per-assignment function.
///
/// With the `parallel` feature and [`with_parallel`](Self::with_parallel)
/// enabled, batches are spread over the rayon pool.
///
/// ```
/// use u_explore::evaluator::{EvaluationResult, Evaluator, FnEvaluator};
/// use u_explore::param::Assignment;
///
/// let eval = FnEvaluator::new(|a: &Assignment| {
///     let x = a.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0);
///     Ok(EvaluationResult::new().with_output("fitness", [x * x]))
/// });
/// let r = eval.evaluate_one(&Assignment::from_pairs([("x", 3.0)])).unwrap();
/// assert_eq!(r.get("fitness"), Some(&[9.0][..]));
/// ```
pub struct FnEvaluator<F> {
    func: F,
    parallel: bool,
}

impl<F> FnEvaluator<F>
where
    F: Fn(&Assignment) -> Result<EvaluationResult> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            parallel: false,
        }
    }

    /// Enables parallel batch evaluation (no effect without the `parallel`
    /// feature).
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl<F> Evaluator for FnEvaluator<F>
where
    F: Fn(&Assignment) -> Result<EvaluationResult> + Send + Sync,
{
    fn evaluate(&self, batch: &[Assignment]) -> Result<HashMap<Assignment, EvaluationResult>> {
        #[cfg(feature = "parallel")]
        if self.parallel {
            use rayon::prelude::*;
            return batch
                .par_iter()
                .map(|a| (self.func)(a).map(|r| (a.clone(), r)))
                .collect();
        }
        batch
            .iter()
            .map(|a| (self.func)(a).map(|r| (a.clone(), r)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combination() {
        let v = [1.0, 4.0, 2.5];
        assert_eq!(Combination::Max.apply(&v), Some(4.0));
        assert_eq!(Combination::Min.apply(&v), Some(1.0));
        assert_eq!(Combination::Mean.apply(&v), Some(2.5));
        assert_eq!(Combination::Mean.apply(&[]), None);
    }

    #[test]
    fn test_replicate_count() {
        let r = EvaluationResult::new()
            .with_output("a", [1.0, 2.0])
            .with_output("b", [3.0, 4.0]);
        assert_eq!(r.replicate_count(), Some(2));
        let r = r.with_output("c", [1.0]);
        assert_eq!(r.replicate_count(), None);
    }

    #[test]
    fn test_push_value_normalises_bool() {
        let mut r = EvaluationResult::new();
        assert!(r.push_value("alive", &Value::Bool(true)));
        assert!(r.push_value("alive", &Value::Bool(false)));
        assert!(!r.push_value("alive", &Value::Point(Default::default())));
        assert_eq!(r.get("alive"), Some(&[1.0, 0.0][..]));
    }

    struct DroppingEvaluator;

    impl Evaluator for DroppingEvaluator {
        fn evaluate(&self, batch: &[Assignment]) -> Result<HashMap<Assignment, EvaluationResult>> {
            Ok(batch
                .iter()
                .skip(1)
                .map(|a| (a.clone(), EvaluationResult::new()))
                .collect())
        }
    }

    #[test]
    fn test_evaluate_all_detects_dropped_assignment() {
        let batch = vec![
            Assignment::from_pairs([("x", 1)]),
            Assignment::from_pairs([("x", 2)]),
        ];
        match evaluate_all(&DroppingEvaluator, &batch) {
            Err(Error::MissingEvaluation(a)) => assert_eq!(a, batch[0]),
            other => panic!("expected MissingEvaluation, got {other:?}"),
        }
    }

    #[test]
    fn test_fn_evaluator_propagates_failure() {
        let eval = FnEvaluator::new(|a: &Assignment| {
            if a.get("x") == Some(&Value::Int(2)) {
                Err(Error::evaluation(a.clone(), "boom"))
            } else {
                Ok(EvaluationResult::new().with_output(FITNESS_OUTPUT, [1.0]))
            }
        })
        .with_parallel(true);
        let batch = vec![
            Assignment::from_pairs([("x", 1)]),
            Assignment::from_pairs([("x", 2)]),
        ];
        assert!(matches!(eval.evaluate(&batch), Err(Error::Evaluation { .. })));
    }
}
