//! Steepest-ascent hill climbing over one-step neighbourhoods.

use super::config::HillClimbingConfig;
use super::search::{fitness_of, Search, SearchResult};
use crate::cache::FitnessCache;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::param::ParameterSpec;
use crate::random::rng_from_seed;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info};

/// Moves to the best one-step neighbour while it strictly improves.
///
/// The whole neighbourhood of the current point is evaluated as one cached
/// batch per move, so it can be spread over threads by the evaluator.
///
/// ```
/// use u_explore::evaluator::{EvaluationResult, FnEvaluator};
/// use u_explore::optim::{HillClimbingConfig, HillClimbingRunner, SearchConfig};
/// use u_explore::param::{Assignment, ParameterSpec};
///
/// let specs = vec![ParameterSpec::int("x", 0, 20)];
/// let eval = FnEvaluator::new(|a: &Assignment| {
///     let x = a.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0);
///     Ok(EvaluationResult::new().with_output("fitness", [-(x - 7.0).powi(2)]))
/// });
/// let search = SearchConfig::default().with_initial(Assignment::from_pairs([("x", 0i64)]));
/// let config = HillClimbingConfig::default().with_search(search);
/// let result = HillClimbingRunner::run(&specs, &eval, &config).unwrap();
/// assert_eq!(result.best, Assignment::from_pairs([("x", 7i64)]));
/// assert_eq!(result.iterations, 7);
/// ```
pub struct HillClimbingRunner;

impl HillClimbingRunner {
    pub fn run<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &HillClimbingConfig,
    ) -> Result<SearchResult> {
        Self::run_with_cancel(specs, evaluator, config, None)
    }

    /// Runs with an optional cancellation token, checked before every move.
    pub fn run_with_cancel<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &HillClimbingConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SearchResult> {
        Self::run_with(specs, evaluator, config, &FitnessCache::new(), cancel)
    }

    /// Runs against a caller-supplied cache.
    pub fn run_with<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &HillClimbingConfig,
        cache: &FitnessCache,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SearchResult> {
        config.validate()?;
        let mut search = Search::new(specs, evaluator, &config.search, cache, cancel)?;
        let mut rng = rng_from_seed(config.search.seed);
        let objective = config.search.objective;

        info!(parameters = search.specs.len(), "starting hill climbing");
        let mut current = search.start(&mut rng)?;
        let mut iterations = 0;
        let mut cancelled = false;

        while config.max_iterations == 0 || iterations < config.max_iterations {
            if search.cancelled() {
                cancelled = true;
                break;
            }
            let neighbors = search.neighbors(&current);
            if neighbors.is_empty() {
                break;
            }
            let evaluated = search.evaluate(neighbors)?;
            match search.best_of(evaluated) {
                Some(b) if objective.is_better(fitness_of(&b), fitness_of(&current)) => current = b,
                _ => break,
            }
            iterations += 1;
            search.record();
            debug!(iteration = iterations, fitness = fitness_of(&current), "moved");
        }

        let result = search.finish(iterations, cancelled)?;
        info!(
            best = result.best_fitness,
            iterations = result.iterations,
            executed = result.evaluations_executed,
            "hill climbing finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::testing::{bowl, grid_specs, RecordingEvaluator};
    use crate::optim::SearchConfig;
    use crate::param::Assignment;
    use std::collections::HashSet;

    fn from(x: i64, y: i64) -> HillClimbingConfig {
        let start = Assignment::from_pairs([("x", x), ("y", y)]);
        HillClimbingConfig::default().with_search(SearchConfig::default().with_initial(start))
    }

    #[test]
    fn test_climbs_to_bowl_peak() {
        let eval = RecordingEvaluator::new();
        let result = HillClimbingRunner::run(&grid_specs(), &eval, &from(0, 0)).unwrap();
        assert_eq!(result.best, Assignment::from_pairs([("x", 7i64), ("y", 12i64)]));
        assert_eq!(result.best_fitness, 0.0);
        // one unit step per move: 7 along x and 12 along y
        assert_eq!(result.iterations, 19);
        assert_eq!(result.fitness_history.len(), 20);
        assert_eq!(result.fitness_history[0], bowl(&Assignment::from_pairs([("x", 0i64), ("y", 0i64)])));
        for w in result.fitness_history.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn test_each_assignment_evaluated_once() {
        let eval = RecordingEvaluator::new();
        let result = HillClimbingRunner::run(&grid_specs(), &eval, &from(20, 0)).unwrap();
        let submitted = eval.submitted();
        let unique: HashSet<&Assignment> = submitted.iter().collect();
        assert_eq!(unique.len(), submitted.len());
        assert_eq!(result.evaluations_executed, submitted.len());
        assert!(result.evaluations_requested > result.evaluations_executed);
    }

    #[test]
    fn test_iteration_cap() {
        let eval = RecordingEvaluator::new();
        let config = from(0, 0).with_max_iterations(3);
        let result = HillClimbingRunner::run(&grid_specs(), &eval, &config).unwrap();
        assert_eq!(result.iterations, 3);
        assert!(result.best_fitness < 0.0);
    }

    #[test]
    fn test_starts_at_optimum() {
        let eval = RecordingEvaluator::new();
        let result = HillClimbingRunner::run(&grid_specs(), &eval, &from(7, 12)).unwrap();
        assert_eq!(result.iterations, 0);
        // the start and its four neighbours
        assert_eq!(eval.submitted().len(), 5);
    }

    #[test]
    fn test_initial_must_cover_parameters() {
        let eval = RecordingEvaluator::new();
        let search = SearchConfig::default().with_initial(Assignment::from_pairs([("x", 1i64)]));
        let config = HillClimbingConfig::default().with_search(search);
        assert!(HillClimbingRunner::run(&grid_specs(), &eval, &config).is_err());
        assert!(eval.submitted().is_empty());
    }

    #[test]
    fn test_random_start_is_seeded() {
        let eval = RecordingEvaluator::new();
        let config = HillClimbingConfig::default()
            .with_search(SearchConfig::default().with_seed(4))
            .with_max_iterations(2);
        let a = HillClimbingRunner::run(&grid_specs(), &eval, &config).unwrap();
        let b = HillClimbingRunner::run(&grid_specs(), &eval, &config).unwrap();
        assert_eq!(a.best, b.best);
        assert_eq!(a.fitness_history, b.fitness_history);
    }

    #[test]
    fn test_cancelled_before_first_move() {
        let eval = RecordingEvaluator::new();
        let cancel = Arc::new(AtomicBool::new(true));
        let result =
            HillClimbingRunner::run_with_cancel(&grid_specs(), &eval, &from(0, 0), Some(cancel)).unwrap();
        assert!(result.cancelled);
        assert_eq!(result.iterations, 0);
        assert_eq!(eval.submitted().len(), 1);
        assert!(eval.was_cancelled());
    }
}
