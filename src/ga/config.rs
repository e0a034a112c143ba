//! GA configuration.
//!
//! [`GaConfig`] holds all parameters that control the evolutionary loop.

use super::selection::Selection;
use super::types::Objective;
use crate::cache::FitnessReader;
use crate::error::{Error, Result};
use crate::evaluator::Combination;
use crate::param::DEFAULT_SLICES;

/// Configuration for the Genetic Algorithm.
///
/// # Defaults
///
/// ```
/// use u_explore::ga::GaConfig;
///
/// let config = GaConfig::default();
/// assert_eq!(config.population_dim, 3);
/// assert_eq!(config.max_generations, 20);
/// assert!((config.crossover_prob - 0.7).abs() < 1e-12);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_explore::ga::{GaConfig, Objective, Selection};
///
/// let config = GaConfig::default()
///     .with_population_dim(10)
///     .with_objective(Objective::Minimize)
///     .with_selection(Selection::Roulette)
///     .with_improve_solution(true)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaConfig {
    /// Number of chromosomes kept after each selection.
    pub population_dim: usize,

    /// Probability that a chromosome is crossed with a random partner
    /// (0.0 to 1.0).
    pub crossover_prob: f64,

    /// Probability that a chromosome yields a one-gene mutant (0.0 to 1.0).
    pub mutation_prob: f64,

    /// Multiplier on the initial population: `nb_prelim_generations ×
    /// population_dim` random chromosomes are drawn and the best
    /// `population_dim` kept.
    pub nb_prelim_generations: usize,

    /// Number of generations. `0` returns the best initial chromosome.
    pub max_generations: usize,

    /// Hill-climb every survivor after selection.
    pub improve_solution: bool,

    /// Survivor selection. `Selection::Roulette` is the stochastic variant.
    pub selection: Selection,

    pub objective: Objective,

    /// Output read as fitness and how its replicates are combined.
    pub fitness: FitnessReader,

    /// Slice count used to derive steps for unstepped ranges.
    pub slices: usize,

    /// Random seed for reproducibility.
    ///
    /// `None` uses a random seed.
    pub seed: Option<u64>,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_dim: 3,
            crossover_prob: 0.7,
            mutation_prob: 0.1,
            nb_prelim_generations: 1,
            max_generations: 20,
            improve_solution: false,
            selection: Selection::Best,
            objective: Objective::Maximize,
            fitness: FitnessReader::default(),
            slices: DEFAULT_SLICES,
            seed: None,
        }
    }
}

impl GaConfig {
    /// Sets the number of survivors per generation.
    pub fn with_population_dim(mut self, n: usize) -> Self {
        self.population_dim = n;
        self
    }

    /// Sets the crossover probability.
    pub fn with_crossover_prob(mut self, p: f64) -> Self {
        self.crossover_prob = p.clamp(0.0, 1.0);
        self
    }

    /// Sets the mutation probability.
    pub fn with_mutation_prob(mut self, p: f64) -> Self {
        self.mutation_prob = p.clamp(0.0, 1.0);
        self
    }

    /// Sets the initial population multiplier.
    pub fn with_nb_prelim_generations(mut self, n: usize) -> Self {
        self.nb_prelim_generations = n;
        self
    }

    /// Sets the number of generations.
    pub fn with_max_generations(mut self, n: usize) -> Self {
        self.max_generations = n;
        self
    }

    /// Enables or disables local search on survivors.
    pub fn with_improve_solution(mut self, improve: bool) -> Self {
        self.improve_solution = improve;
        self
    }

    /// Sets the selection strategy.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Shorthand: `true` selects [`Selection::Roulette`], `false`
    /// [`Selection::Best`].
    pub fn with_stochastic_selection(self, stochastic: bool) -> Self {
        self.with_selection(if stochastic {
            Selection::Roulette
        } else {
            Selection::Best
        })
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    /// Maximizes `output`.
    pub fn maximize(mut self, output: impl Into<String>) -> Self {
        self.objective = Objective::Maximize;
        self.fitness.output = output.into();
        self
    }

    /// Minimizes `output`.
    pub fn minimize(mut self, output: impl Into<String>) -> Self {
        self.objective = Objective::Minimize;
        self.fitness.output = output.into();
        self
    }

    /// Sets how replicate fitness values are combined.
    pub fn with_combination(mut self, combination: Combination) -> Self {
        self.fitness.combination = combination;
        self
    }

    /// Sets the slice count (at least 2).
    pub fn with_slices(mut self, slices: usize) -> Self {
        self.slices = slices.max(2);
        self
    }

    /// Sets the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    ///
    /// Returns [`Error::Configuration`] if any parameter is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.population_dim == 0 {
            return Err(Error::config("population_dim must be at least 1"));
        }
        if self.nb_prelim_generations == 0 {
            return Err(Error::config("nb_prelim_generations must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.crossover_prob) {
            return Err(Error::config("crossover_prob must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.mutation_prob) {
            return Err(Error::config("mutation_prob must be within [0, 1]"));
        }
        if self.fitness.output.is_empty() {
            return Err(Error::config("fitness output name must not be empty"));
        }
        if self.slices < 2 {
            return Err(Error::config("slices must be at least 2"));
        }
        Ok(())
    }
}
