//! Sampling configuration.
//!
//! [`SamplingConfig`] selects the design and holds its size options.

use crate::error::{Error, Result};
use crate::param::{Value, DEFAULT_SLICES};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default number of points for randomized designs.
pub const DEFAULT_SAMPLE_SIZE: usize = 132;

/// Default number of Morris grid levels.
pub const DEFAULT_LEVELS: usize = 4;

/// Default number of candidate designs tried by orthogonal sampling.
pub const DEFAULT_ITERATIONS: usize = 5;

/// Design used to build a batch.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SamplingMethod {
    /// Cartesian product of every parameter's value list.
    #[default]
    Exhaustive,
    /// `sample_size` independent uniform draws.
    Uniform,
    /// Per-parameter uniform draws combined by cartesian product.
    Factorial,
    /// One draw per stratum, strata shuffled per parameter.
    LatinHypercube,
    /// Best of `iterations` Latin hypercubes by column correlation.
    Orthogonal,
    /// `sample_size` one-at-a-time trajectories on a `levels` grid.
    Morris,
    /// `sample_size` base rows expanded into `2k + 2` points each.
    Saltelli,
    /// One assignment per row of a CSV file.
    FromFile(PathBuf),
    /// One assignment per record.
    FromList(Vec<BTreeMap<String, Value>>),
}

impl SamplingMethod {
    /// Short lowercase name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            SamplingMethod::Exhaustive => "exhaustive",
            SamplingMethod::Uniform => "uniform",
            SamplingMethod::Factorial => "factorial",
            SamplingMethod::LatinHypercube => "latinhypercube",
            SamplingMethod::Orthogonal => "orthogonal",
            SamplingMethod::Morris => "morris",
            SamplingMethod::Saltelli => "saltelli",
            SamplingMethod::FromFile(_) => "fromfile",
            SamplingMethod::FromList(_) => "fromlist",
        }
    }
}

/// Configuration for batch generation.
///
/// # Defaults
///
/// ```
/// use u_explore::sampling::{SamplingConfig, SamplingMethod};
///
/// let config = SamplingConfig::default();
/// assert_eq!(config.method, SamplingMethod::Exhaustive);
/// assert_eq!(config.sample_size, 132);
/// assert_eq!(config.levels, 4);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_explore::sampling::{SamplingConfig, SamplingMethod};
///
/// let config = SamplingConfig::default()
///     .with_method(SamplingMethod::Morris)
///     .with_sample_size(10)
///     .with_levels(6);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplingConfig {
    pub method: SamplingMethod,

    /// Number of points (uniform, LHS, orthogonal), trajectories (Morris)
    /// or base rows (Saltelli).
    pub sample_size: usize,

    /// Morris grid levels; must be even and at least 2.
    pub levels: usize,

    /// Candidate designs tried by orthogonal sampling.
    pub iterations: usize,

    /// Per-parameter draw counts for factorial sampling.
    ///
    /// Missing entries take the implicit count `⌊N^(1/k)⌋`; extra entries
    /// are ignored. `None` gives every parameter the implicit count.
    pub factorial_slices: Option<Vec<usize>>,

    /// Slice count used to derive a step for unstepped ranges.
    pub slices: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            method: SamplingMethod::default(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            levels: DEFAULT_LEVELS,
            iterations: DEFAULT_ITERATIONS,
            factorial_slices: None,
            slices: DEFAULT_SLICES,
        }
    }
}

impl SamplingConfig {
    /// Shorthand for `SamplingConfig::default().with_method(method)`.
    pub fn new(method: SamplingMethod) -> Self {
        Self::default().with_method(method)
    }

    pub fn with_method(mut self, method: SamplingMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.sample_size = n;
        self
    }

    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_factorial_slices(mut self, slices: Vec<usize>) -> Self {
        self.factorial_slices = Some(slices);
        self
    }

    /// Sets the slice count (at least 2).
    pub fn with_slices(mut self, slices: usize) -> Self {
        self.slices = slices.max(2);
        self
    }

    /// Validates the options the selected method reads.
    pub fn validate(&self) -> Result<()> {
        if self.slices < 2 {
            return Err(Error::config("slices must be at least 2"));
        }
        match self.method {
            SamplingMethod::Uniform
            | SamplingMethod::LatinHypercube
            | SamplingMethod::Orthogonal
            | SamplingMethod::Saltelli
            | SamplingMethod::Factorial
                if self.sample_size == 0 =>
            {
                Err(Error::config(format!(
                    "{} sampling needs a positive sample size",
                    self.method.name()
                )))
            }
            SamplingMethod::Orthogonal if self.iterations == 0 => {
                Err(Error::config("orthogonal sampling needs at least one iteration"))
            }
            SamplingMethod::Morris if self.sample_size == 0 => {
                Err(Error::config("morris sampling needs at least one trajectory"))
            }
            SamplingMethod::Morris if self.levels < 2 || self.levels % 2 != 0 => Err(Error::config(
                format!("morris levels must be even and at least 2, got {}", self.levels),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SamplingConfig::default();
        assert_eq!(config.sample_size, 132);
        assert_eq!(config.levels, 4);
        assert_eq!(config.iterations, 5);
        assert_eq!(config.slices, DEFAULT_SLICES);
        assert!(config.factorial_slices.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_odd_levels() {
        let config = SamplingConfig::new(SamplingMethod::Morris).with_levels(5);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
        let config = SamplingConfig::new(SamplingMethod::Morris).with_levels(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_sample() {
        let config = SamplingConfig::new(SamplingMethod::LatinHypercube).with_sample_size(0);
        assert!(config.validate().is_err());
        // exhaustive ignores the sample size
        let config = SamplingConfig::default().with_sample_size(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_orthogonal_iterations() {
        let config = SamplingConfig::new(SamplingMethod::Orthogonal).with_iterations(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_slices_clamped() {
        assert_eq!(SamplingConfig::default().with_slices(0).slices, 2);
    }
}
