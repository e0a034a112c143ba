//! Deduplicating fitness store.
//!
//! Every algorithm that calls the evaluator goes through a [`FitnessCache`]
//! so that an assignment is run at most once per cache, whichever phase
//! (initial population, offspring, local search) asked for it.

use crate::error::{Error, Result};
use crate::evaluator::{evaluate_all, Combination, EvaluationResult, Evaluator, FITNESS_OUTPUT};
use crate::param::Assignment;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Turns an evaluation result into a scalar fitness.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitnessReader {
    /// Output holding the fitness observations.
    pub output: String,
    /// How replicate observations collapse into one value.
    pub combination: Combination,
}

impl Default for FitnessReader {
    fn default() -> Self {
        Self {
            output: FITNESS_OUTPUT.to_string(),
            combination: Combination::Mean,
        }
    }
}

impl FitnessReader {
    pub fn new(output: impl Into<String>, combination: Combination) -> Self {
        Self {
            output: output.into(),
            combination,
        }
    }

    /// Reads the fitness of `assignment` from its result.
    ///
    /// A negative zero reads as `0.0`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingOutput`] when the output is absent or has no values.
    pub fn read(&self, assignment: &Assignment, result: &EvaluationResult) -> Result<f64> {
        result
            .aggregate(&self.output, self.combination)
            .map(|f| if f == 0.0 { 0.0 } else { f })
            .ok_or_else(|| Error::MissingOutput {
                output: self.output.clone(),
                assignment: assignment.clone(),
            })
    }
}

/// A cached evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedEvaluation {
    pub fitness: f64,
    pub result: EvaluationResult,
}

/// Append-only map `Assignment -> (fitness, outputs)`.
///
/// Inserts are first-writer-wins: once an assignment is stored its entry
/// never changes. The cache is `Send + Sync`; reads after a batch returns
/// see every entry of that batch.
#[derive(Debug, Default)]
pub struct FitnessCache {
    entries: RwLock<HashMap<Assignment, CachedEvaluation>>,
    requested: AtomicUsize,
    executed: AtomicUsize,
}

impl FitnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, assignment: &Assignment) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(assignment)
    }

    pub fn fitness(&self, assignment: &Assignment) -> Option<f64> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(assignment)
            .map(|e| e.fitness)
    }

    pub fn get(&self, assignment: &Assignment) -> Option<CachedEvaluation> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(assignment)
            .cloned()
    }

    /// Stores an entry unless the assignment is already present.
    ///
    /// Returns `true` if this call inserted it.
    pub fn insert(&self, assignment: Assignment, entry: CachedEvaluation) -> bool {
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if map.contains_key(&assignment) {
            return false;
        }
        map.insert(assignment, entry);
        true
    }

    /// Assignments of `batch` not yet cached, deduplicated, in first-seen
    /// order.
    pub fn missing(&self, batch: &[Assignment]) -> Vec<Assignment> {
        let map = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut seen = HashSet::new();
        batch
            .iter()
            .filter(|a| !map.contains_key(*a) && seen.insert(*a))
            .cloned()
            .collect()
    }

    /// Returns the fitness of every member of `batch`, in batch order.
    ///
    /// Uncached assignments are sent to the evaluator as a single batch; an
    /// empty remainder makes no evaluator call at all.
    pub fn evaluate_batch<E: Evaluator + ?Sized>(
        &self,
        evaluator: &E,
        reader: &FitnessReader,
        batch: &[Assignment],
    ) -> Result<Vec<f64>> {
        self.requested.fetch_add(batch.len(), Ordering::Relaxed);
        let missing = self.missing(batch);
        if !missing.is_empty() {
            debug!(requested = batch.len(), submitted = missing.len(), "evaluating batch");
            let results = evaluate_all(evaluator, &missing)?;
            self.executed.fetch_add(missing.len(), Ordering::Relaxed);
            // Fitness is read for every member before anything is stored, so
            // a bad result leaves the cache untouched.
            let mut fresh = Vec::with_capacity(missing.len());
            for a in &missing {
                if let Some(result) = results.get(a) {
                    fresh.push((a.clone(), reader.read(a, result)?, result.clone()));
                }
            }
            for (a, fitness, result) in fresh {
                self.insert(a, CachedEvaluation { fitness, result });
            }
        }
        let map = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        batch
            .iter()
            .map(|a| {
                map.get(a)
                    .map(|e| e.fitness)
                    .ok_or_else(|| Error::MissingEvaluation(a.clone()))
            })
            .collect()
    }

    /// Fitness of one assignment, evaluating it if needed.
    pub fn evaluate_one<E: Evaluator + ?Sized>(
        &self,
        evaluator: &E,
        reader: &FitnessReader,
        assignment: &Assignment,
    ) -> Result<f64> {
        let fitness = self.evaluate_batch(evaluator, reader, std::slice::from_ref(assignment))?;
        fitness
            .first()
            .copied()
            .ok_or_else(|| Error::MissingEvaluation(assignment.clone()))
    }

    /// Fitness lookups made through [`evaluate_batch`](Self::evaluate_batch).
    pub fn requested(&self) -> usize {
        self.requested.load(Ordering::Relaxed)
    }

    /// Assignments actually sent to the evaluator.
    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::Relaxed)
    }

    /// Snapshot of every entry.
    pub fn entries(&self) -> HashMap<Assignment, CachedEvaluation> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::FnEvaluator;
    use crate::param::Value;
    use std::sync::Arc;

    fn counting_evaluator(
        calls: Arc<AtomicUsize>,
    ) -> FnEvaluator<impl Fn(&Assignment) -> Result<EvaluationResult> + Send + Sync> {
        FnEvaluator::new(move |a: &Assignment| {
            calls.fetch_add(1, Ordering::SeqCst);
            let x = a.get("x").and_then(Value::as_f64).unwrap_or(0.0);
            Ok(EvaluationResult::new().with_output(FITNESS_OUTPUT, [x, x + 2.0]))
        })
    }

    #[test]
    fn test_each_assignment_evaluated_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let eval = counting_evaluator(calls.clone());
        let cache = FitnessCache::new();
        let reader = FitnessReader::default();
        let a = Assignment::from_pairs([("x", 1)]);
        let b = Assignment::from_pairs([("x", 3)]);

        let f = cache
            .evaluate_batch(&eval, &reader, &[a.clone(), b.clone(), a.clone()])
            .unwrap_or_default();
        assert_eq!(f, vec![2.0, 4.0, 2.0]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let again = cache.evaluate_batch(&eval, &reader, &[b, a]).unwrap_or_default();
        assert_eq!(again, vec![4.0, 2.0]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.executed(), 2);
        assert_eq!(cache.requested(), 5);
    }

    #[test]
    fn test_first_writer_wins() {
        let cache = FitnessCache::new();
        let a = Assignment::from_pairs([("x", 1)]);
        let entry = |f| CachedEvaluation {
            fitness: f,
            result: EvaluationResult::new(),
        };
        assert!(cache.insert(a.clone(), entry(1.0)));
        assert!(!cache.insert(a.clone(), entry(9.0)));
        assert_eq!(cache.fitness(&a), Some(1.0));
    }

    #[test]
    fn test_missing_output_is_reported() {
        let eval = FnEvaluator::new(|_: &Assignment| {
            Ok(EvaluationResult::new().with_output("other", [1.0]))
        });
        let cache = FitnessCache::new();
        let a = Assignment::from_pairs([("x", 1)]);
        let err = cache.evaluate_one(&eval, &FitnessReader::default(), &a);
        assert!(matches!(err, Err(Error::MissingOutput { .. })));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_combination_max() {
        let calls = Arc::new(AtomicUsize::new(0));
        let eval = counting_evaluator(calls);
        let cache = FitnessCache::new();
        let reader = FitnessReader::new(FITNESS_OUTPUT, Combination::Max);
        let a = Assignment::from_pairs([("x", 1)]);
        assert_eq!(cache.evaluate_one(&eval, &reader, &a).ok(), Some(3.0));
    }

    #[test]
    fn test_negative_zero_reads_as_zero() {
        let result = EvaluationResult::new().with_output(FITNESS_OUTPUT, [-0.0]);
        let a = Assignment::from_pairs([("x", 0)]);
        let f = FitnessReader::default().read(&a, &result).unwrap_or(f64::NAN);
        assert_eq!(f, 0.0);
        assert!(f.is_sign_positive());
    }

    #[test]
    fn test_concurrent_inserts_keep_first_writer() {
        let cache = FitnessCache::new();
        let a = Assignment::from_pairs([("x", 7)]);
        let winners: Vec<usize> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let (cache, a) = (&cache, a.clone());
                    s.spawn(move || {
                        let entry = CachedEvaluation {
                            fitness: i as f64,
                            result: EvaluationResult::new(),
                        };
                        cache.insert(a, entry).then_some(i)
                    })
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|h| h.join().ok().flatten())
                .collect()
        });
        assert_eq!(winners.len(), 1);
        assert_eq!(cache.fitness(&a), Some(winners[0] as f64));
        assert_eq!(cache.len(), 1);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_evaluator_runs_each_distinct_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let eval = counting_evaluator(calls.clone()).with_parallel(true);
        let cache = FitnessCache::new();
        let reader = FitnessReader::default();
        let batch: Vec<Assignment> = (0..200)
            .map(|i| Assignment::from_pairs([("x", i % 50)]))
            .collect();

        let f = cache.evaluate_batch(&eval, &reader, &batch).unwrap_or_default();
        assert_eq!(f.len(), 200);
        for (a, fit) in batch.iter().zip(&f) {
            let x = a.get("x").and_then(Value::as_f64).unwrap_or(f64::NAN);
            assert_eq!(*fit, x + 1.0);
        }
        assert_eq!(cache.executed(), 50);
        assert_eq!(calls.load(Ordering::SeqCst), 50);

        // a second pass, split across threads, finds everything cached
        std::thread::scope(|s| {
            for chunk in batch.chunks(40) {
                let (cache, eval, reader) = (&cache, &eval, &reader);
                s.spawn(move || cache.evaluate_batch(eval, reader, chunk).map(|v| v.len()));
            }
        });
        assert_eq!(cache.executed(), 50);
        assert_eq!(calls.load(Ordering::SeqCst), 50);
        assert_eq!(cache.requested(), 400);
    }
}
