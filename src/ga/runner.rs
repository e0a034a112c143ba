//! GA evolutionary loop execution.
//!
//! [`GaRunner`] orchestrates the complete evolutionary process:
//! initialization → crossover → mutation → evaluation → selection →
//! optional local search → repeat.

use super::config::GaConfig;
use super::operators::{one_step_neighbors, GeneticOperators, StandardOperators};
use super::types::Chromosome;
use crate::cache::FitnessCache;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::param::{active_specs, Assignment, ParameterSpec};
use crate::random::rng_from_seed;
use rand::{Rng, RngExt};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a GA optimization run.
///
/// Contains the best assignment observed, along with statistics about the
/// evolutionary process.
#[derive(Debug, Clone)]
pub struct GaResult {
    /// The best assignment evaluated during the entire run, including
    /// chromosomes that did not survive selection.
    pub best: Assignment,

    /// Fitness of `best`.
    pub best_fitness: f64,

    /// Number of generations completed.
    pub generations: usize,

    /// Whether the run was cancelled externally.
    pub cancelled: bool,

    /// Best fitness so far: the initial population, then one entry per
    /// completed generation.
    pub fitness_history: Vec<f64>,

    /// Fitness lookups made during this run.
    pub evaluations_requested: usize,

    /// Assignments this run actually sent to the evaluator.
    pub evaluations_executed: usize,

    /// Survivors of the last generation, best first.
    pub population: Vec<Chromosome>,
}

/// Executes the GA evolutionary loop.
///
/// # Usage
///
/// ```
/// use u_explore::evaluator::{EvaluationResult, FnEvaluator};
/// use u_explore::ga::{GaConfig, GaRunner};
/// use u_explore::param::{Assignment, ParameterSpec};
///
/// let specs = vec![ParameterSpec::int("x", 0, 20)];
/// let eval = FnEvaluator::new(|a: &Assignment| {
///     let x = a.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0);
///     Ok(EvaluationResult::new().with_output("fitness", [-(x - 7.0).powi(2)]))
/// });
/// let config = GaConfig::default()
///     .with_population_dim(4)
///     .with_improve_solution(true)
///     .with_seed(42);
/// let result = GaRunner::run(&specs, &eval, &config).unwrap();
/// assert_eq!(result.best_fitness, 0.0);
/// ```
pub struct GaRunner;

impl GaRunner {
    /// Runs the GA with the standard operators and a fresh cache.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] for an invalid config or an empty parameter
    /// set (before any evaluator call); evaluator failures are propagated.
    pub fn run<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &GaConfig,
    ) -> Result<GaResult> {
        Self::run_with_cancel(specs, evaluator, config, None)
    }

    /// Runs the GA with an optional cancellation token.
    ///
    /// If `cancel` is `Some` and the flag is set to `true`, the GA stops at
    /// the next generation boundary, calls [`Evaluator::on_cancel`] and
    /// returns the best solution found so far.
    pub fn run_with_cancel<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &GaConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<GaResult> {
        let operators = StandardOperators::new(config.selection);
        let cache = FitnessCache::new();
        Self::run_with(specs, evaluator, config, &operators, &cache, cancel)
    }

    /// Runs the GA with caller-supplied operators and cache.
    ///
    /// Entries already in `cache` are reused; the evaluation counters in the
    /// result only cover this run.
    pub fn run_with<E, O>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &GaConfig,
        operators: &O,
        cache: &FitnessCache,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<GaResult>
    where
        E: Evaluator + ?Sized,
        O: GeneticOperators,
    {
        config.validate()?;
        let specs = active_specs(specs)?;
        if specs.is_empty() {
            return Err(Error::config("no parameter to optimize"));
        }

        let requested_before = cache.requested();
        let executed_before = cache.executed();
        let mut rng = rng_from_seed(config.seed);
        let mut run = Run {
            specs: &specs,
            evaluator,
            config,
            cache,
            best: None,
        };

        info!(
            parameters = specs.len(),
            population = config.population_dim,
            generations = config.max_generations,
            "starting genetic algorithm"
        );

        // 1. Initial population
        let mut population = run.initial_population(&mut rng)?;
        let mut fitness_history = Vec::with_capacity(config.max_generations + 1);
        fitness_history.push(run.best_fitness());

        let mut generations = 0;
        let mut cancelled = false;

        // 2. Evolutionary loop
        for gen in 0..config.max_generations {
            if cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                evaluator.on_cancel();
                cancelled = true;
                break;
            }

            population = run.generation(population, operators, &mut rng)?;
            generations = gen + 1;
            fitness_history.push(run.best_fitness());

            debug!(
                generation = generations,
                population = population.len(),
                best = run.best_fitness(),
                cached = cache.len(),
                "generation complete"
            );
        }

        population.sort_by(|a, b| config.objective.compare(fitness_of(a), fitness_of(b)));
        let best = match run.best.take() {
            Some(best) => best,
            None => population
                .first()
                .cloned()
                .ok_or_else(|| Error::config("empty population"))?,
        };

        let result = GaResult {
            best_fitness: fitness_of(&best),
            best: best.assignment().clone(),
            generations,
            cancelled,
            fitness_history,
            evaluations_requested: cache.requested() - requested_before,
            evaluations_executed: cache.executed() - executed_before,
            population,
        };
        info!(
            best = result.best_fitness,
            generations = result.generations,
            executed = result.evaluations_executed,
            cancelled = result.cancelled,
            "genetic algorithm finished"
        );
        Ok(result)
    }
}

fn fitness_of(c: &Chromosome) -> f64 {
    c.fitness().unwrap_or(f64::NAN)
}

/// Keeps the first occurrence of every assignment.
fn dedup(population: Vec<Chromosome>) -> Vec<Chromosome> {
    let mut seen = HashSet::new();
    population
        .into_iter()
        .filter(|c| seen.insert(c.assignment().clone()))
        .collect()
}

/// State shared by the phases of one run.
struct Run<'a, E: ?Sized> {
    specs: &'a [ParameterSpec],
    evaluator: &'a E,
    config: &'a GaConfig,
    cache: &'a FitnessCache,
    best: Option<Chromosome>,
}

impl<E: Evaluator + ?Sized> Run<'_, E> {
    fn best_fitness(&self) -> f64 {
        self.best
            .as_ref()
            .map_or(self.config.objective.worst(), fitness_of)
    }

    /// Evaluates every chromosome without a fitness as one cached batch and
    /// records the best seen.
    fn evaluate(&mut self, chromosomes: Vec<Chromosome>) -> Result<Vec<Chromosome>> {
        let batch: Vec<Assignment> = chromosomes
            .iter()
            .filter(|c| c.fitness().is_none())
            .map(|c| c.assignment().clone())
            .collect();
        let mut fitness = self
            .cache
            .evaluate_batch(self.evaluator, &self.config.fitness, &batch)?
            .into_iter();
        let chromosomes: Vec<Chromosome> = chromosomes
            .into_iter()
            .map(|c| {
                if c.fitness().is_some() {
                    return c;
                }
                match fitness.next() {
                    Some(f) => c.with_fitness(f),
                    None => c,
                }
            })
            .collect();
        for c in &chromosomes {
            let f = fitness_of(c);
            let improves = match &self.best {
                Some(best) => self.config.objective.is_better(f, fitness_of(best)),
                None => !f.is_nan(),
            };
            if improves {
                self.best = Some(c.clone());
            }
        }
        Ok(chromosomes)
    }

    /// `nb_prelim_generations × population_dim` random chromosomes, best
    /// `population_dim` kept.
    fn initial_population<R: Rng>(&mut self, rng: &mut R) -> Result<Vec<Chromosome>> {
        let size = self.config.nb_prelim_generations * self.config.population_dim;
        let mut initial = Vec::with_capacity(size);
        for _ in 0..size {
            let c = Chromosome::random(self.specs, self.config.slices, rng)
                .ok_or_else(|| Error::config("a parameter has no value to draw"))?;
            initial.push(c);
        }
        let mut population = self.evaluate(dedup(initial))?;
        population.sort_by(|a, b| self.config.objective.compare(fitness_of(a), fitness_of(b)));
        population.truncate(self.config.population_dim);
        Ok(population)
    }

    fn generation<O, R>(&mut self, mut population: Vec<Chromosome>, operators: &O, rng: &mut R) -> Result<Vec<Chromosome>>
    where
        O: GeneticOperators,
        R: Rng,
    {
        let mut seen: HashSet<Assignment> = population.iter().map(|c| c.assignment().clone()).collect();

        // Crossover against a uniformly chosen mate
        let mut children = Vec::new();
        for i in 0..population.len() {
            if rng.random_bool(self.config.crossover_prob) {
                let mate = rng.random_range(0..population.len());
                for child in operators.crossover(self.specs, &population[i], &population[mate], rng) {
                    if seen.insert(child.assignment().clone()) {
                        children.push(child);
                    }
                }
            }
        }
        population.extend(children);

        // Mutation over parents and children
        let mut mutants = Vec::new();
        for c in &population {
            if rng.random_bool(self.config.mutation_prob) {
                let mutant = operators.mutate(self.specs, self.config.slices, c, rng);
                if seen.insert(mutant.assignment().clone()) {
                    mutants.push(mutant);
                }
            }
        }
        population.extend(mutants);

        let population = dedup(self.evaluate(population)?);
        let mut survivors = operators.select(population, self.config.population_dim, self.config.objective, rng);

        if self.config.improve_solution {
            let mut improved = Vec::with_capacity(survivors.len());
            for c in survivors {
                improved.push(self.hill_climb(c)?);
            }
            survivors = dedup(improved);
        }
        Ok(survivors)
    }

    /// Moves to the best one-step neighbour while it strictly improves.
    fn hill_climb(&mut self, start: Chromosome) -> Result<Chromosome> {
        let objective = self.config.objective;
        let mut current = start;
        loop {
            let neighbors = one_step_neighbors(self.specs, self.config.slices, &current);
            if neighbors.is_empty() {
                return Ok(current);
            }
            let evaluated = self.evaluate(neighbors)?;
            let best = evaluated
                .into_iter()
                .min_by(|a, b| objective.compare(fitness_of(a), fitness_of(b)));
            match best {
                Some(b) if objective.is_better(fitness_of(&b), fitness_of(&current)) => current = b,
                _ => return Ok(current),
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FitnessReader;
    use crate::evaluator::{EvaluationResult, FnEvaluator, FITNESS_OUTPUT};
    use crate::ga::{Objective, Selection};
    use crate::param::Value;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn grid_specs() -> Vec<ParameterSpec> {
        vec![ParameterSpec::int("x", 0, 20), ParameterSpec::int("y", 0, 20)]
    }

    fn coord(a: &Assignment, name: &str) -> f64 {
        a.get(name).and_then(Value::as_f64).unwrap_or(f64::NAN)
    }

    /// Concave bowl peaking at (7, 12).
    fn bowl(a: &Assignment) -> f64 {
        -(coord(a, "x") - 7.0).powi(2) - (coord(a, "y") - 12.0).powi(2)
    }

    /// Records every assignment the engine submits.
    struct RecordingEvaluator {
        seen: Mutex<Vec<Assignment>>,
        cancelled: AtomicBool,
    }

    impl RecordingEvaluator {
        fn new() -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                cancelled: AtomicBool::new(false),
            }
        }

        fn submitted(&self) -> Vec<Assignment> {
            self.seen.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    impl Evaluator for RecordingEvaluator {
        fn evaluate(&self, batch: &[Assignment]) -> Result<HashMap<Assignment, EvaluationResult>> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.extend(batch.iter().cloned());
            }
            Ok(batch
                .iter()
                .map(|a| (a.clone(), EvaluationResult::new().with_output(FITNESS_OUTPUT, [bowl(a)])))
                .collect())
        }

        fn on_cancel(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_zero_generations_returns_best_initial() {
        let eval = RecordingEvaluator::new();
        let config = GaConfig::default()
            .with_population_dim(5)
            .with_nb_prelim_generations(2)
            .with_max_generations(0)
            .with_seed(42);
        let result = GaRunner::run(&grid_specs(), &eval, &config).unwrap();

        let submitted = eval.submitted();
        assert!(!submitted.is_empty() && submitted.len() <= 10);
        let expected = submitted.iter().map(bowl).fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(result.best_fitness, expected);
        assert_eq!(bowl(&result.best), expected);
        assert_eq!(result.generations, 0);
        assert_eq!(result.fitness_history, vec![expected]);
        assert!(result.population.len() <= 5);
    }

    #[test]
    fn test_each_assignment_evaluated_once() {
        let eval = RecordingEvaluator::new();
        let config = GaConfig::default()
            .with_population_dim(6)
            .with_max_generations(15)
            .with_mutation_prob(0.5)
            .with_improve_solution(true)
            .with_seed(3);
        let result = GaRunner::run(&grid_specs(), &eval, &config).unwrap();

        let submitted = eval.submitted();
        let unique: HashSet<&Assignment> = submitted.iter().collect();
        assert_eq!(unique.len(), submitted.len(), "an assignment was evaluated twice");
        assert_eq!(result.evaluations_executed, submitted.len());
        assert!(result.evaluations_requested >= result.evaluations_executed);
    }

    #[test]
    fn test_maximize_with_local_search() {
        let eval = FnEvaluator::new(|a: &Assignment| {
            Ok(EvaluationResult::new().with_output(FITNESS_OUTPUT, [bowl(a)]))
        });
        let config = GaConfig::default()
            .with_population_dim(4)
            .with_max_generations(3)
            .with_improve_solution(true)
            .with_seed(11);
        let result = GaRunner::run(&grid_specs(), &eval, &config).unwrap();
        assert_eq!(result.best_fitness, 0.0);
        // the bowl peaks at -(0.0), reported as a plain zero
        assert!(result.best_fitness.is_sign_positive());
        assert_eq!(result.best, Assignment::from_pairs([("x", 7i64), ("y", 12i64)]));
    }

    #[test]
    fn test_minimize_named_output() {
        let eval = FnEvaluator::new(|a: &Assignment| {
            let x = coord(a, "x");
            Ok(EvaluationResult::new().with_output("cost", [(x - 3.0).powi(2), (x - 3.0).powi(2) + 2.0]))
        });
        let specs = vec![ParameterSpec::int("x", 0, 20)];
        let config = GaConfig::default()
            .minimize("cost")
            .with_population_dim(3)
            .with_max_generations(5)
            .with_improve_solution(true)
            .with_seed(5);
        let result = GaRunner::run(&specs, &eval, &config).unwrap();
        assert_eq!(result.best, Assignment::from_pairs([("x", 3i64)]));
        // mean of the two replicates
        assert_eq!(result.best_fitness, 1.0);
    }

    #[test]
    fn test_history_never_worsens() {
        let eval = RecordingEvaluator::new();
        let config = GaConfig::default()
            .with_population_dim(5)
            .with_max_generations(30)
            .with_selection(Selection::Roulette)
            .with_seed(9);
        let result = GaRunner::run(&grid_specs(), &eval, &config).unwrap();
        assert_eq!(result.fitness_history.len(), 31);
        for w in result.fitness_history.windows(2) {
            assert!(w[1] >= w[0], "history worsened: {} -> {}", w[0], w[1]);
        }
        assert_eq!(result.fitness_history.last().copied(), Some(result.best_fitness));
    }

    #[test]
    fn test_cancellation() {
        let eval = RecordingEvaluator::new();
        let config = GaConfig::default().with_max_generations(1000).with_seed(1);
        let cancel = Arc::new(AtomicBool::new(true));
        let result = GaRunner::run_with_cancel(&grid_specs(), &eval, &config, Some(cancel)).unwrap();
        assert!(result.cancelled);
        assert_eq!(result.generations, 0);
        assert!(eval.cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn test_deterministic_with_seed() {
        let config = GaConfig::default()
            .with_population_dim(4)
            .with_max_generations(10)
            .with_seed(77);
        let a = GaRunner::run(&grid_specs(), &RecordingEvaluator::new(), &config).unwrap();
        let b = GaRunner::run(&grid_specs(), &RecordingEvaluator::new(), &config).unwrap();
        assert_eq!(a.best, b.best);
        assert_eq!(a.fitness_history, b.fitness_history);
        assert_eq!(a.evaluations_executed, b.evaluations_executed);
    }

    #[test]
    fn test_shared_cache_is_reused() {
        let eval = RecordingEvaluator::new();
        let config = GaConfig::default().with_max_generations(5).with_seed(4);
        let cache = FitnessCache::new();
        let ops = StandardOperators::new(Selection::Best);
        GaRunner::run_with(&grid_specs(), &eval, &config, &ops, &cache, None).unwrap();
        let first = eval.submitted().len();
        let again = GaRunner::run_with(&grid_specs(), &eval, &config, &ops, &cache, None).unwrap();
        assert_eq!(eval.submitted().len(), first);
        assert_eq!(again.evaluations_executed, 0);
    }

    #[test]
    fn test_empty_specs_rejected() {
        let eval = RecordingEvaluator::new();
        let err = GaRunner::run(&[], &eval, &GaConfig::default());
        assert!(matches!(err, Err(Error::Configuration(_))));
        assert!(eval.submitted().is_empty());
    }

    #[test]
    fn test_missing_fitness_output() {
        let eval = FnEvaluator::new(|_: &Assignment| Ok(EvaluationResult::new().with_output("other", [1.0])));
        let config = GaConfig::default().with_seed(1);
        let err = GaRunner::run(&grid_specs(), &eval, &config);
        assert!(matches!(err, Err(Error::MissingOutput { .. })));
    }

    #[test]
    fn test_objective_reader_defaults() {
        let config = GaConfig::default();
        assert_eq!(config.objective, Objective::Maximize);
        assert_eq!(config.fitness, FitnessReader::default());
    }
}
