//! Settings shared by every local-search runner.

use crate::cache::FitnessReader;
use crate::error::{Error, Result};
use crate::evaluator::Combination;
use crate::ga::Objective;
use crate::param::{Assignment, DEFAULT_SLICES};

/// What to optimize and where to start.
///
/// Embedded as `search` in every runner config.
///
/// ```
/// use u_explore::optim::SearchConfig;
/// use u_explore::param::Assignment;
///
/// let search = SearchConfig::default()
///     .minimize("cost")
///     .with_initial(Assignment::from_pairs([("x", 3i64)]))
///     .with_seed(7);
/// assert!(search.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchConfig {
    pub objective: Objective,

    /// Output read as fitness and how its replicates are combined.
    pub fitness: FitnessReader,

    /// Slice count used to derive steps for unstepped ranges.
    pub slices: usize,

    /// Starting point. `None` draws one at random; otherwise every active
    /// parameter must be present.
    pub initial: Option<Assignment>,

    /// Random seed for reproducibility. `None` uses a random seed.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            objective: Objective::Maximize,
            fitness: FitnessReader::default(),
            slices: DEFAULT_SLICES,
            initial: None,
            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objective = objective;
        self
    }

    /// Maximizes the named output.
    pub fn maximize(mut self, output: impl Into<String>) -> Self {
        self.objective = Objective::Maximize;
        self.fitness.output = output.into();
        self
    }

    /// Minimizes the named output.
    pub fn minimize(mut self, output: impl Into<String>) -> Self {
        self.objective = Objective::Minimize;
        self.fitness.output = output.into();
        self
    }

    pub fn with_combination(mut self, combination: Combination) -> Self {
        self.fitness.combination = combination;
        self
    }

    pub fn with_slices(mut self, slices: usize) -> Self {
        self.slices = slices;
        self
    }

    pub fn with_initial(mut self, initial: Assignment) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.fitness.output.is_empty() {
            return Err(Error::config("fitness output name must not be empty"));
        }
        if self.slices < 2 {
            return Err(Error::config("slices must be at least 2"));
        }
        Ok(())
    }
}

/// Configuration for [`HillClimbingRunner`](super::HillClimbingRunner).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HillClimbingConfig {
    pub search: SearchConfig,

    /// Maximum number of moves. `0` = until no neighbour improves.
    pub max_iterations: usize,
}

impl HillClimbingConfig {
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.search.validate()
    }
}

/// Cooling schedule for temperature reduction.
///
/// # References
///
/// - Geometric: standard textbook approach
/// - LundyMees: Lundy & Mees (1986), with convergence proof
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoolingSchedule {
    /// `T_{k+1} = alpha * T_k`.
    Geometric {
        /// Cooling factor in (0, 1).
        alpha: f64,
    },

    /// `T_{k+1} = T_k / (1 + beta * T_k)`, one move per temperature.
    LundyMees { beta: f64 },
}

impl Default for CoolingSchedule {
    fn default() -> Self {
        CoolingSchedule::Geometric { alpha: 0.5 }
    }
}

/// Configuration for [`SaRunner`](super::SaRunner).
///
/// ```
/// use u_explore::optim::{CoolingSchedule, SaConfig};
///
/// let config = SaConfig::default();
/// assert_eq!(config.initial_temperature, 100.0);
/// assert_eq!(config.min_temperature, 1.0);
/// assert_eq!(config.cooling, CoolingSchedule::Geometric { alpha: 0.5 });
/// assert_eq!(config.iterations_per_temperature, 5);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SaConfig {
    pub search: SearchConfig,

    pub initial_temperature: f64,

    /// The run stops once the temperature is no longer above this.
    pub min_temperature: f64,

    pub cooling: CoolingSchedule,

    /// Neighbours drawn at each temperature. Ignored by `LundyMees`.
    pub iterations_per_temperature: usize,

    /// Hard budget on drawn neighbours. `0` = no limit.
    pub max_iterations: usize,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            initial_temperature: 100.0,
            min_temperature: 1.0,
            cooling: CoolingSchedule::default(),
            iterations_per_temperature: 5,
            max_iterations: 0,
        }
    }
}

impl SaConfig {
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    pub fn with_min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = t;
        self
    }

    pub fn with_cooling(mut self, cooling: CoolingSchedule) -> Self {
        self.cooling = cooling;
        self
    }

    pub fn with_iterations_per_temperature(mut self, n: usize) -> Self {
        self.iterations_per_temperature = n;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        if !(self.initial_temperature.is_finite() && self.initial_temperature > 0.0) {
            return Err(Error::config("initial_temperature must be positive"));
        }
        // cooling only approaches zero, so a zero floor would never stop
        if !(self.min_temperature > 0.0 && self.min_temperature < self.initial_temperature) {
            return Err(Error::config("min_temperature must be within (0, initial_temperature)"));
        }
        if self.iterations_per_temperature == 0 {
            return Err(Error::config("iterations_per_temperature must be at least 1"));
        }
        match self.cooling {
            CoolingSchedule::Geometric { alpha } if !(alpha > 0.0 && alpha < 1.0) => {
                Err(Error::config("geometric cooling alpha must be within (0, 1)"))
            }
            CoolingSchedule::LundyMees { beta } if !(beta > 0.0 && beta.is_finite()) => {
                Err(Error::config("Lundy-Mees beta must be positive"))
            }
            _ => Ok(()),
        }
    }
}

/// Configuration for [`TabuRunner`](super::TabuRunner).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TabuConfig {
    pub search: SearchConfig,

    /// Number of recent positions that may not be revisited.
    pub tabu_list_size: usize,

    pub max_iterations: usize,

    /// Stop after this many moves without a new best. `0` = never.
    pub max_no_improve: usize,
}

impl Default for TabuConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            tabu_list_size: 5,
            max_iterations: 50,
            max_no_improve: 0,
        }
    }
}

impl TabuConfig {
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn with_tabu_list_size(mut self, n: usize) -> Self {
        self.tabu_list_size = n;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_max_no_improve(mut self, n: usize) -> Self {
        self.max_no_improve = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        if self.tabu_list_size == 0 {
            return Err(Error::config("tabu_list_size must be at least 1"));
        }
        Ok(())
    }
}

/// Configuration for [`ReactiveTabuRunner`](super::ReactiveTabuRunner).
///
/// The tabu list starts at `initial_list_size`, grows by one (up to
/// `max_list_size`) whenever a neighbour was already visited, and shrinks by
/// one (down to `min_list_size`) after `max_tests_without_collision`
/// iterations without such a revisit.
///
/// # References
///
/// Battiti & Tecchiolli (1994), "The Reactive Tabu Search", *ORSA Journal
/// on Computing* 6(2), 126-140.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReactiveTabuConfig {
    pub search: SearchConfig,
    pub initial_list_size: usize,
    pub min_list_size: usize,
    pub max_list_size: usize,
    pub max_tests_without_collision: usize,

    /// Consecutive revisits after which a cycle is suspected.
    pub cycle_size_min: usize,

    /// Consecutive revisits beyond which no escape is attempted.
    pub cycle_size_max: usize,

    pub max_iterations: usize,
}

impl Default for ReactiveTabuConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            initial_list_size: 5,
            min_list_size: 2,
            max_list_size: 10,
            max_tests_without_collision: 20,
            cycle_size_min: 2,
            cycle_size_max: 20,
            max_iterations: 100,
        }
    }
}

impl ReactiveTabuConfig {
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Sets the initial, minimum and maximum tabu list sizes.
    pub fn with_list_sizes(mut self, initial: usize, min: usize, max: usize) -> Self {
        self.initial_list_size = initial;
        self.min_list_size = min;
        self.max_list_size = max;
        self
    }

    pub fn with_max_tests_without_collision(mut self, n: usize) -> Self {
        self.max_tests_without_collision = n;
        self
    }

    pub fn with_cycle_sizes(mut self, min: usize, max: usize) -> Self {
        self.cycle_size_min = min;
        self.cycle_size_max = max;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        if self.min_list_size == 0 {
            return Err(Error::config("min_list_size must be at least 1"));
        }
        if !(self.min_list_size..=self.max_list_size).contains(&self.initial_list_size) {
            return Err(Error::config(
                "initial_list_size must be within [min_list_size, max_list_size]",
            ));
        }
        if self.max_tests_without_collision == 0 {
            return Err(Error::config("max_tests_without_collision must be at least 1"));
        }
        if self.cycle_size_min > self.cycle_size_max {
            return Err(Error::config("cycle_size_min must not exceed cycle_size_max"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::FITNESS_OUTPUT;

    #[test]
    fn test_search_defaults() {
        let s = SearchConfig::default();
        assert_eq!(s.objective, Objective::Maximize);
        assert_eq!(s.fitness.output, FITNESS_OUTPUT);
        assert!(s.initial.is_none());
        assert!(s.validate().is_ok());
        assert!(s.with_slices(1).validate().is_err());
        assert!(SearchConfig::default().minimize("").validate().is_err());
    }

    #[test]
    fn test_sa_validation() {
        assert!(SaConfig::default().validate().is_ok());
        assert!(SaConfig::default().with_min_temperature(100.0).validate().is_err());
        assert!(SaConfig::default().with_initial_temperature(0.0).validate().is_err());
        assert!(SaConfig::default().with_min_temperature(0.0).validate().is_err());
        assert!(SaConfig::default().with_iterations_per_temperature(0).validate().is_err());
        let bad = SaConfig::default().with_cooling(CoolingSchedule::Geometric { alpha: 1.0 });
        assert!(bad.validate().is_err());
        let lm = SaConfig::default().with_cooling(CoolingSchedule::LundyMees { beta: 0.01 });
        assert!(lm.validate().is_ok());
    }

    #[test]
    fn test_tabu_defaults_and_validation() {
        let t = TabuConfig::default();
        assert_eq!((t.tabu_list_size, t.max_iterations), (5, 50));
        assert!(t.validate().is_ok());
        assert!(TabuConfig::default().with_tabu_list_size(0).validate().is_err());

        let r = ReactiveTabuConfig::default();
        assert_eq!((r.min_list_size, r.initial_list_size, r.max_list_size), (2, 5, 10));
        assert!(r.validate().is_ok());
        assert!(r.clone().with_list_sizes(11, 2, 10).validate().is_err());
        assert!(r.clone().with_list_sizes(1, 0, 10).validate().is_err());
        assert!(r.with_cycle_sizes(5, 4).validate().is_err());
    }
}
