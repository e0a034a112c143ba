//! Tabu search with a fixed-size tabu list.
//!
//! # Algorithm
//!
//! 1. Evaluate the starting point and put it on the tabu list
//! 2. At each iteration:
//!    a. Generate the one-step neighbourhood, minus tabu positions
//!    b. If every neighbour is tabu, fall back to one random tabu member
//!    c. Evaluate the remainder as one cached batch
//!    d. Move to the best of them, even when it is worse than the current
//!       point, and append it to the tabu list (oldest entry dropped)
//! 3. Terminate after `max_iterations`, on stagnation, or when nothing is
//!    left to move to
//!
//! # Reference
//!
//! Glover, F. (1989). "Tabu Search - Part I", *ORSA Journal on Computing* 1(3), 190-206.
//! Glover, F. (1990). "Tabu Search - Part II", *ORSA Journal on Computing* 2(1), 4-32.

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::config::TabuConfig;
use super::search::{Search, SearchResult};
use crate::cache::FitnessCache;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::ga::Chromosome;
use crate::param::{Assignment, ParameterSpec};
use crate::random::rng_from_seed;
use rand::{Rng, RngExt};
use tracing::{debug, info};

/// FIFO of recently visited assignments.
#[derive(Debug, Default)]
pub(crate) struct TabuList {
    entries: VecDeque<Assignment>,
}

impl TabuList {
    pub fn contains(&self, a: &Assignment) -> bool {
        self.entries.contains(a)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Appends `a`, then drops the oldest entries beyond `capacity`.
    pub fn push(&mut self, a: Assignment, capacity: usize) {
        self.entries.push_back(a);
        self.truncate(capacity);
    }

    pub fn truncate(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
    }

    /// A uniformly drawn member.
    pub fn choose<R: Rng>(&self, rng: &mut R) -> Option<&Assignment> {
        if self.entries.is_empty() {
            return None;
        }
        self.entries.get(rng.random_range(0..self.entries.len()))
    }
}

/// Tabu search runner.
pub struct TabuRunner;

impl TabuRunner {
    pub fn run<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &TabuConfig,
    ) -> Result<SearchResult> {
        Self::run_with_cancel(specs, evaluator, config, None)
    }

    pub fn run_with_cancel<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &TabuConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SearchResult> {
        Self::run_with(specs, evaluator, config, &FitnessCache::new(), cancel)
    }

    pub fn run_with<E: Evaluator + ?Sized>(
        specs: &[ParameterSpec],
        evaluator: &E,
        config: &TabuConfig,
        cache: &FitnessCache,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SearchResult> {
        config.validate()?;
        let mut search = Search::new(specs, evaluator, &config.search, cache, cancel)?;
        let mut rng = rng_from_seed(config.search.seed);

        info!(
            parameters = search.specs.len(),
            tabu_list_size = config.tabu_list_size,
            "starting tabu search"
        );
        let mut current = search.start(&mut rng)?;
        let mut tabu = TabuList::default();
        tabu.push(current.assignment().clone(), config.tabu_list_size);

        let mut iterations = 0;
        let mut no_improve = 0;
        let mut cancelled = false;

        while iterations < config.max_iterations {
            if search.cancelled() {
                cancelled = true;
                break;
            }

            let Some(next) = best_admissible(&mut search, &current, &tabu, &mut rng)? else {
                break;
            };
            let before = search.best_fitness();
            tabu.push(next.assignment().clone(), config.tabu_list_size);
            current = next;
            iterations += 1;
            search.record();

            if search.best_fitness() == before {
                no_improve += 1;
            } else {
                no_improve = 0;
            }
            debug!(iteration = iterations, best = search.best_fitness(), tabu = tabu.len(), "moved");
            if config.max_no_improve > 0 && no_improve >= config.max_no_improve {
                break;
            }
        }

        let result = search.finish(iterations, cancelled)?;
        info!(
            best = result.best_fitness,
            iterations = result.iterations,
            executed = result.evaluations_executed,
            "tabu search finished"
        );
        Ok(result)
    }
}

/// Best non-tabu neighbour of `current`, or a random tabu member when the
/// whole neighbourhood is tabu. `None` only for a point with no neighbours.
pub(crate) fn best_admissible<E, R>(
    search: &mut Search<'_, E>,
    current: &Chromosome,
    tabu: &TabuList,
    rng: &mut R,
) -> Result<Option<Chromosome>>
where
    E: Evaluator + ?Sized,
    R: Rng,
{
    let neighbors = search.neighbors(current);
    if neighbors.is_empty() {
        return Ok(None);
    }
    let mut admissible: Vec<Chromosome> = neighbors
        .into_iter()
        .filter(|c| !tabu.contains(c.assignment()))
        .collect();
    if admissible.is_empty() {
        if let Some(a) = tabu.choose(rng) {
            let genes = search
                .specs
                .iter()
                .filter_map(|s| a.get(&s.name).cloned())
                .collect();
            admissible.push(Chromosome::new(&search.specs, genes));
        }
    }
    let evaluated = search.evaluate(admissible)?;
    Ok(search.best_of(evaluated))
}
