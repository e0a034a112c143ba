//! Sampling engine: parameter domains to batches of assignments.
//!
//! # Designs
//!
//! - Exhaustive: cartesian product of value ladders
//! - Uniform and factorial-uniform random draws
//! - Latin hypercube and orthogonal (decorrelated) Latin hypercube
//! - Morris trajectories ([`morris_sample`])
//! - Saltelli cross-sampling ([`saltelli_sample`])
//! - Rows of a CSV file or in-memory records
//!
//! Randomized designs are built in the unit cube and mapped into each
//! domain with [`ParameterSpec::from_unit`]. Given the same generator
//! state, [`generate`] returns the same batch.

mod config;
mod exhaustive;
mod lhs;
mod morris;
mod saltelli;
mod uniform;

pub use config::{
    SamplingConfig, SamplingMethod, DEFAULT_ITERATIONS, DEFAULT_LEVELS, DEFAULT_SAMPLE_SIZE,
};
pub use exhaustive::{cartesian, exhaustive};
pub use lhs::{latin_hypercube, max_abs_correlation, orthogonal};
pub use morris::{morris_delta, morris_sample, MorrisSample, Trajectory};
pub use saltelli::{saltelli_sample, SaltelliSample};
pub use uniform::{factor_counts, factorial, implicit_factor, uniform};

use crate::error::Result;
use crate::param::{active_specs, exploration_dimension, Assignment, Batch, ParameterSpec};
use crate::table;
use rand::Rng;
use tracing::{debug, info};

/// Rows of unit-cube coordinates, one column per parameter.
pub type UnitDesign = Vec<Vec<f64>>;

/// Maps unit-cube rows into assignments.
pub fn map_unit_design(specs: &[ParameterSpec], design: &UnitDesign) -> Batch {
    design
        .iter()
        .map(|row| {
            specs
                .iter()
                .zip(row)
                .map(|(s, u)| (s.name.clone(), s.from_unit(*u)))
                .collect::<Assignment>()
        })
        .collect()
}

/// Builds the batch described by `config`.
///
/// The configuration is validated first, and degenerate parameters are
/// dropped. An empty parameter list yields an empty batch.
///
/// # Errors
///
/// - [`Error::Configuration`](crate::Error::Configuration) for invalid
///   options or declarations
/// - [`Error::MalformedInput`](crate::Error::MalformedInput) for a bad file
///   row or list record
///
/// # Examples
///
/// ```
/// use u_explore::param::ParameterSpec;
/// use u_explore::random::create_rng;
/// use u_explore::sampling::{generate, SamplingConfig, SamplingMethod};
///
/// let specs = vec![
///     ParameterSpec::float("rate", 0.0, 1.0),
///     ParameterSpec::int("agents", 10, 100),
/// ];
/// let config = SamplingConfig::new(SamplingMethod::LatinHypercube).with_sample_size(20);
/// let batch = generate(&specs, &config, &mut create_rng(42)).unwrap();
/// assert_eq!(batch.len(), 20);
/// ```
pub fn generate<R: Rng>(specs: &[ParameterSpec], config: &SamplingConfig, rng: &mut R) -> Result<Batch> {
    config.validate()?;
    let specs = active_specs(specs)?;
    if specs.is_empty() {
        debug!(method = config.method.name(), "no active parameter, empty batch");
        return Ok(Vec::new());
    }
    let k = specs.len();
    let n = config.sample_size;
    let batch = match &config.method {
        SamplingMethod::Exhaustive => {
            debug!(
                points = exploration_dimension(&specs, config.slices),
                "exhaustive exploration"
            );
            exhaustive(&specs, config.slices)
        }
        SamplingMethod::Uniform => uniform(&specs, n, rng),
        SamplingMethod::Factorial => {
            let counts = factor_counts(k, n, config.factorial_slices.as_deref());
            factorial(&specs, &counts, rng)
        }
        SamplingMethod::LatinHypercube => map_unit_design(&specs, &latin_hypercube(n, k, rng)),
        SamplingMethod::Orthogonal => {
            map_unit_design(&specs, &orthogonal(n, k, config.iterations, rng))
        }
        SamplingMethod::Morris => morris_sample(&specs, config.levels, n, rng)?.batch(),
        SamplingMethod::Saltelli => saltelli_sample(&specs, n, rng).assignments,
        SamplingMethod::FromFile(path) => table::read_assignments(path, &specs)?,
        SamplingMethod::FromList(records) => table::assignments_from_list(records, &specs)?,
    };
    info!(
        method = config.method.name(),
        parameters = k,
        assignments = batch.len(),
        "batch generated"
    );
    Ok(batch)
}
