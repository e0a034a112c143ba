//! Run state shared by the local-search runners.

use super::config::SearchConfig;
use crate::cache::FitnessCache;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::ga::operators::one_step_neighbors;
use crate::ga::Chromosome;
use crate::param::{active_specs, Assignment, ParameterSpec};
use rand::Rng;
use std::cmp::Ordering;
use std::sync::atomic::{self, AtomicBool};
use std::sync::Arc;

/// Result of a local-search run.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The best assignment evaluated during the run.
    pub best: Assignment,

    /// Fitness of `best`.
    pub best_fitness: f64,

    /// Moves made (hill climbing, tabu) or neighbours drawn (annealing).
    pub iterations: usize,

    /// Whether the run was cancelled externally.
    pub cancelled: bool,

    /// Best fitness after the starting point, then after every iteration
    /// (every temperature step for annealing).
    pub fitness_history: Vec<f64>,

    /// Fitness lookups made during this run.
    pub evaluations_requested: usize,

    /// Assignments this run actually sent to the evaluator.
    pub evaluations_executed: usize,
}

pub(crate) struct Search<'a, E: ?Sized> {
    pub specs: Vec<ParameterSpec>,
    pub config: &'a SearchConfig,
    evaluator: &'a E,
    cache: &'a FitnessCache,
    cancel: Option<Arc<AtomicBool>>,
    requested_before: usize,
    executed_before: usize,
    best: Option<Chromosome>,
    pub history: Vec<f64>,
}

impl<'a, E: Evaluator + ?Sized> Search<'a, E> {
    /// Resolves the active parameters. Fails before any evaluator call.
    pub fn new(
        specs: &[ParameterSpec],
        evaluator: &'a E,
        config: &'a SearchConfig,
        cache: &'a FitnessCache,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<Self> {
        let specs = active_specs(specs)?;
        if specs.is_empty() {
            return Err(Error::config("no parameter to optimize"));
        }
        Ok(Self {
            specs,
            config,
            evaluator,
            cache,
            cancel,
            requested_before: cache.requested(),
            executed_before: cache.executed(),
            best: None,
            history: Vec::new(),
        })
    }

    /// The configured starting point, or a random one. Not yet evaluated.
    pub fn starting_point<R: Rng>(&self, rng: &mut R) -> Result<Chromosome> {
        let Some(initial) = &self.config.initial else {
            return Chromosome::random(&self.specs, self.config.slices, rng)
                .ok_or_else(|| Error::config("a parameter has no value to draw"));
        };
        let mut genes = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            let value = initial
                .get(&spec.name)
                .ok_or_else(|| Error::config(format!("initial solution lacks '{}'", spec.name)))?;
            let gene = spec
                .coerce_value(value.clone())
                .map_err(|e| Error::config(format!("initial solution, '{}': {e}", spec.name)))?;
            genes.push(gene);
        }
        Ok(Chromosome::new(&self.specs, genes))
    }

    /// Evaluates the starting point and opens the history with it.
    pub fn start<R: Rng>(&mut self, rng: &mut R) -> Result<Chromosome> {
        let start = self.starting_point(rng)?;
        let start = self.evaluate_one(start)?;
        if self.best.is_none() {
            // NaN start: still the incumbent until something real turns up
            self.best = Some(start.clone());
        }
        self.record();
        Ok(start)
    }

    pub fn neighbors(&self, c: &Chromosome) -> Vec<Chromosome> {
        one_step_neighbors(&self.specs, self.config.slices, c)
    }

    /// Evaluates the chromosomes without a fitness as one cached batch and
    /// tracks the best seen.
    pub fn evaluate(&mut self, chromosomes: Vec<Chromosome>) -> Result<Vec<Chromosome>> {
        let batch: Vec<Assignment> = chromosomes
            .iter()
            .filter(|c| c.fitness().is_none())
            .map(|c| c.assignment().clone())
            .collect();
        let mut fitness = self
            .cache
            .evaluate_batch(self.evaluator, &self.config.fitness, &batch)?
            .into_iter();
        let evaluated: Vec<Chromosome> = chromosomes
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
        for c in &evaluated {
            self.offer(c);
        }
        Ok(evaluated)
    }

    pub fn evaluate_one(&mut self, c: Chromosome) -> Result<Chromosome> {
        self.evaluate(vec![c.clone()])?
            .pop()
            .ok_or_else(|| Error::MissingEvaluation(c.assignment().clone()))
    }

    fn offer(&mut self, c: &Chromosome) {
        let objective = self.config.objective;
        let f = fitness_of(c);
        let improves = match &self.best {
            Some(best) => objective.compare(f, fitness_of(best)) == Ordering::Less,
            None => !f.is_nan(),
        };
        if improves {
            self.best = Some(c.clone());
        }
    }

    /// The best of `chromosomes`, `NaN` fitness last.
    pub fn best_of(&self, chromosomes: Vec<Chromosome>) -> Option<Chromosome> {
        let objective = self.config.objective;
        chromosomes
            .into_iter()
            .min_by(|a, b| objective.compare(fitness_of(a), fitness_of(b)))
    }

    pub fn best_fitness(&self) -> f64 {
        self.best
            .as_ref()
            .map_or(self.config.objective.worst(), fitness_of)
    }

    pub fn record(&mut self) {
        self.history.push(self.best_fitness());
    }

    /// Whether the cancellation flag is set; notifies the evaluator if so.
    pub fn cancelled(&self) -> bool {
        let set = self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(atomic::Ordering::Relaxed));
        if set {
            self.evaluator.on_cancel();
        }
        set
    }

    pub fn finish(self, iterations: usize, cancelled: bool) -> Result<SearchResult> {
        let best = self
            .best
            .ok_or_else(|| Error::config("search finished without a starting point"))?;
        Ok(SearchResult {
            best_fitness: fitness_of(&best),
            best: best.assignment().clone(),
            iterations,
            cancelled,
            fitness_history: self.history,
            evaluations_requested: self.cache.requested() - self.requested_before,
            evaluations_executed: self.cache.executed() - self.executed_before,
        })
    }
}

pub(crate) fn fitness_of(c: &Chromosome) -> f64 {
    c.fitness().unwrap_or(f64::NAN)
}
