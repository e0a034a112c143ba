//! Simulated annealing over one-step neighbourhoods.

use super::config::{CoolingSchedule, SaConfig};
use super::search::{fitness_of, Search, SearchResult};
use crate::cache::FitnessCache;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::ga::Objective;
use crate::param::ParameterSpec;
use crate::random::rng_from_seed;
use rand::RngExt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info};

/// Executes simulated annealing.
///
/// At each temperature `iterations_per_temperature` neighbours of the
/// current point are drawn uniformly and evaluated through the cache. A
/// neighbour at least as good as the current point is always accepted; a
/// worse one with probability `exp(-|Δ| / T)` (Metropolis criterion). The
/// best point seen is returned, not the last accepted one.
///
/// # References
///
/// Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated
/// Annealing", *Science* 220(4598), 671-680.
pub struct SaRunner;

impl SaRunner {
    pub fn run<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &SaConfig,
    ) -> Result<SearchResult> {
        Self::run_with_cancel(specs, evaluator, config, None)
    }

    /// Runs with an optional cancellation token, checked at every
    /// temperature step.
    pub fn run_with_cancel<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &SaConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SearchResult> {
        Self::run_with(specs, evaluator, config, &FitnessCache::new(), cancel)
    }

    pub fn run_with<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &SaConfig,
        cache: &FitnessCache,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SearchResult> {
        config.validate()?;
        let mut search = Search::new(specs, evaluator, &config.search, cache, cancel)?;
        let mut rng = rng_from_seed(config.search.seed);
        let objective = config.search.objective;

        info!(
            parameters = search.specs.len(),
            temperature = config.initial_temperature,
            "starting simulated annealing"
        );
        let mut current = search.start(&mut rng)?;
        let mut temperature = config.initial_temperature;
        let mut iterations = 0usize;
        let mut accepted = 0usize;
        let mut cancelled = false;
        let over_budget = |n: usize| config.max_iterations > 0 && n >= config.max_iterations;

        'cooling: while temperature > config.min_temperature {
            if search.cancelled() {
                cancelled = true;
                break;
            }

            let inner = match config.cooling {
                CoolingSchedule::LundyMees { .. } => 1,
                CoolingSchedule::Geometric { .. } => config.iterations_per_temperature,
            };
            for _ in 0..inner {
                if over_budget(iterations) {
                    break;
                }
                let mut neighbors = search.neighbors(&current);
                if neighbors.is_empty() {
                    break 'cooling;
                }
                let pick = rng.random_range(0..neighbors.len());
                let candidate = search.evaluate_one(neighbors.swap_remove(pick))?;
                iterations += 1;

                let loss = worsening(objective, fitness_of(&current), fitness_of(&candidate));
                let accept = if loss.is_nan() {
                    false
                } else if loss <= 0.0 {
                    true
                } else {
                    rng.random_range(0.0..1.0) < (-loss / temperature).exp()
                };
                if accept {
                    current = candidate;
                    accepted += 1;
                }
            }

            search.record();
            debug!(temperature, best = search.best_fitness(), accepted, "temperature step");
            if over_budget(iterations) {
                break;
            }
            temperature = match config.cooling {
                CoolingSchedule::Geometric { alpha } => temperature * alpha,
                CoolingSchedule::LundyMees { beta } => temperature / (1.0 + beta * temperature),
            };
        }

        let result = search.finish(iterations, cancelled)?;
        info!(
            best = result.best_fitness,
            iterations = result.iterations,
            accepted,
            final_temperature = temperature,
            executed = result.evaluations_executed,
            "simulated annealing finished"
        );
        Ok(result)
    }
}

/// How much worse `candidate` is than `current`; negative when better.
/// `NaN` candidates are never accepted; a `NaN` current point is left for
/// any real candidate.
fn worsening(objective: Objective, current: f64, candidate: f64) -> f64 {
    if current.is_nan() && !candidate.is_nan() {
        return f64::NEG_INFINITY;
    }
    match objective {
        Objective::Maximize => current - candidate,
        Objective::Minimize => candidate - current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::testing::{grid_specs, RecordingEvaluator};
    use crate::optim::SearchConfig;
    use crate::param::Assignment;
    use std::collections::HashSet;

    fn seeded(seed: u64) -> SaConfig {
        let start = Assignment::from_pairs([("x", 0i64), ("y", 0i64)]);
        SaConfig::default().with_search(SearchConfig::default().with_initial(start).with_seed(seed))
    }

    #[test]
    fn test_default_schedule_length() {
        // 100 -> 50 -> 25 -> 12.5 -> 6.25 -> 3.125 -> 1.5625, then 0.78 stops
        let eval = RecordingEvaluator::new();
        let result = SaRunner::run(&grid_specs(), &eval, &seeded(1)).unwrap();
        assert_eq!(result.iterations, 7 * 5);
        assert_eq!(result.fitness_history.len(), 1 + 7);
        for w in result.fitness_history.windows(2) {
            assert!(w[1] >= w[0]);
        }
    }

    #[test]
    fn test_slow_cooling_reaches_peak() {
        let eval = RecordingEvaluator::new();
        let config = seeded(7)
            .with_initial_temperature(10.0)
            .with_min_temperature(0.01)
            .with_cooling(CoolingSchedule::Geometric { alpha: 0.95 })
            .with_iterations_per_temperature(40);
        let result = SaRunner::run(&grid_specs(), &eval, &config).unwrap();
        assert_eq!(result.best, Assignment::from_pairs([("x", 7i64), ("y", 12i64)]));
        assert_eq!(result.best_fitness, 0.0);
    }

    #[test]
    fn test_each_assignment_evaluated_once() {
        let eval = RecordingEvaluator::new();
        let config = seeded(3).with_min_temperature(0.001).with_iterations_per_temperature(20);
        let result = SaRunner::run(&grid_specs(), &eval, &config).unwrap();
        let submitted = eval.submitted();
        let unique: HashSet<&Assignment> = submitted.iter().collect();
        assert_eq!(unique.len(), submitted.len());
        assert_eq!(result.evaluations_executed, submitted.len());
        assert_eq!(result.evaluations_requested, result.iterations + 1);
    }

    #[test]
    fn test_iteration_budget_and_lundy_mees() {
        let eval = RecordingEvaluator::new();
        let config = seeded(2)
            .with_cooling(CoolingSchedule::LundyMees { beta: 0.001 })
            .with_max_iterations(25);
        let result = SaRunner::run(&grid_specs(), &eval, &config).unwrap();
        assert_eq!(result.iterations, 25);
        // one neighbour per temperature step
        assert_eq!(result.fitness_history.len(), 26);
    }

    #[test]
    fn test_deterministic_with_seed() {
        let eval = RecordingEvaluator::new();
        let a = SaRunner::run(&grid_specs(), &eval, &seeded(9)).unwrap();
        let b = SaRunner::run(&grid_specs(), &eval, &seeded(9)).unwrap();
        assert_eq!(a.best, b.best);
        assert_eq!(a.fitness_history, b.fitness_history);
    }

    #[test]
    fn test_worsening_sign() {
        assert!(worsening(Objective::Maximize, 1.0, 2.0) < 0.0);
        assert!(worsening(Objective::Minimize, 1.0, 2.0) > 0.0);
        assert!(worsening(Objective::Maximize, 1.0, f64::NAN).is_nan());
        assert_eq!(worsening(Objective::Minimize, f64::NAN, 3.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_invalid_config_rejected_before_evaluation() {
        let eval = RecordingEvaluator::new();
        let config = seeded(1).with_min_temperature(500.0);
        assert!(SaRunner::run(&grid_specs(), &eval, &config).is_err());
        assert!(eval.submitted().is_empty());
    }

    #[test]
    fn test_cancellation() {
        let eval = RecordingEvaluator::new();
        let cancel = Arc::new(AtomicBool::new(true));
        let result = SaRunner::run_with_cancel(&grid_specs(), &eval, &seeded(1), Some(cancel)).unwrap();
        assert!(result.cancelled);
        assert_eq!(result.iterations, 0);
        assert!(eval.was_cancelled());
    }
}
