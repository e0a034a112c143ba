//! Reactive tabu search: the tabu list size follows how often the walk
//! runs into assignments it has already visited.
//!
//! Revisits grow the list, quiet stretches shrink it. When the chosen
//! neighbour keeps being an old one and the walk closes a loop, a short
//! random walk of non-tabu moves is made to leave the basin.

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::config::ReactiveTabuConfig;
use super::search::{Search, SearchResult};
use super::tabu::TabuList;
use crate::cache::FitnessCache;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::ga::Chromosome;
use crate::param::{Assignment, ParameterSpec};
use crate::random::rng_from_seed;
use rand::{Rng, RngExt};
use tracing::{debug, info};

/// Tabu list size driven by collisions.
#[derive(Debug, Clone, PartialEq)]
struct AdaptiveSize {
    current: usize,
    min: usize,
    max: usize,
    quiet: usize,
    patience: usize,
}

impl AdaptiveSize {
    fn new(config: &ReactiveTabuConfig) -> Self {
        Self {
            current: config.initial_list_size,
            min: config.min_list_size,
            max: config.max_list_size,
            quiet: 0,
            patience: config.max_tests_without_collision,
        }
    }

    /// `n` neighbours of this iteration were already visited.
    fn collide(&mut self, n: usize) {
        if n > 0 {
            self.quiet = 0;
            self.current = (self.current + n).min(self.max);
        }
    }

    /// Shrinks by one after `patience` iterations without a collision.
    fn end_iteration(&mut self) {
        self.quiet += 1;
        if self.quiet >= self.patience {
            self.quiet = 0;
            self.current = self.current.saturating_sub(1).max(self.min);
        }
    }
}

/// Reactive tabu search runner.
///
/// # References
///
/// Battiti & Tecchiolli (1994), "The Reactive Tabu Search", *ORSA Journal
/// on Computing* 6(2), 126-140.
pub struct ReactiveTabuRunner;

impl ReactiveTabuRunner {
    pub fn run<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &ReactiveTabuConfig,
    ) -> Result<SearchResult> {
        Self::run_with_cancel(specs, evaluator, config, None)
    }

    pub fn run_with_cancel<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &ReactiveTabuConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SearchResult> {
        Self::run_with(specs, evaluator, config, &FitnessCache::new(), cancel)
    }

    pub fn run_with<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &ReactiveTabuConfig,
        cache: &FitnessCache,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SearchResult> {
        config.validate()?;
        let mut search = Search::new(specs, evaluator, &config.search, cache, cancel)?;
        let mut rng = rng_from_seed(config.search.seed);

        info!(
            parameters = search.specs.len(),
            list_size = config.initial_list_size,
            "starting reactive tabu search"
        );
        let mut current = search.start(&mut rng)?;
        let mut size = AdaptiveSize::new(config);
        let mut tabu = TabuList::default();
        tabu.push(current.assignment().clone(), size.current);
        let mut visited: HashSet<Assignment> = HashSet::from([current.assignment().clone()]);

        // consecutive moves onto already visited assignments
        let mut revisits = 0usize;
        let mut cycle_start: Option<Assignment> = None;
        let mut cycle_len = 0usize;

        let mut iterations = 0;
        let mut escapes = 0;
        let mut cancelled = false;

        while iterations < config.max_iterations {
            if search.cancelled() {
                cancelled = true;
                break;
            }

            let neighbors: Vec<Chromosome> = search
                .neighbors(&current)
                .into_iter()
                .filter(|c| !tabu.contains(c.assignment()))
                .collect();
            if neighbors.is_empty() {
                break;
            }
            let seen: HashSet<Assignment> = neighbors
                .iter()
                .map(|c| c.assignment())
                .filter(|a| visited.contains(*a))
                .cloned()
                .collect();
            size.collide(seen.len());
            visited.extend(neighbors.iter().map(|c| c.assignment().clone()));

            let evaluated = search.evaluate(neighbors)?;
            let Some(next) = search.best_of(evaluated) else {
                break;
            };

            if seen.contains(next.assignment()) {
                revisits += 1;
            } else {
                revisits = 0;
                cycle_start = None;
                cycle_len = 0;
            }

            let mut escaped = false;
            if revisits == config.cycle_size_min {
                cycle_start = Some(next.assignment().clone());
            } else if revisits > config.cycle_size_min && revisits <= config.cycle_size_max {
                if cycle_start.as_ref().is_some_and(|s| s != next.assignment()) {
                    cycle_len += 1;
                } else {
                    // back at the start of the loop
                    let steps = 1 + (rng.random::<f64>() * cycle_len as f64 / 2.0) as usize;
                    current = random_walk(&search, current, steps, &mut tabu, size.current, &mut rng);
                    current = search.evaluate_one(current)?;
                    visited.insert(current.assignment().clone());
                    escapes += 1;
                    escaped = true;
                    debug!(steps, iteration = iterations, "escaping cycle");
                }
            }
            if !escaped {
                tabu.push(next.assignment().clone(), size.current);
                current = next;
            }

            size.end_iteration();
            tabu.truncate(size.current);
            iterations += 1;
            search.record();
            debug!(
                iteration = iterations,
                best = search.best_fitness(),
                list_size = size.current,
                "moved"
            );
        }

        let result = search.finish(iterations, cancelled)?;
        info!(
            best = result.best_fitness,
            iterations = result.iterations,
            escapes,
            list_size = size.current,
            executed = result.evaluations_executed,
            "reactive tabu search finished"
        );
        Ok(result)
    }
}

/// Up to `steps` uniformly drawn non-tabu moves, each made tabu.
fn random_walk<E, R>(
    search: &Search<'_, E>,
    mut current: Chromosome,
    steps: usize,
    tabu: &mut TabuList,
    capacity: usize,
    rng: &mut R,
) -> Chromosome
where
    E: Evaluator + ?Sized,
    R: Rng,
{
    for _ in 0..steps {
        let mut options: Vec<Chromosome> = search
            .neighbors(&current)
            .into_iter()
            .filter(|c| !tabu.contains(c.assignment()))
            .collect();
        if options.is_empty() {
            break;
        }
        current = options.swap_remove(rng.random_range(0..options.len()));
        tabu.push(current.assignment().clone(), capacity);
    }
    current
}
