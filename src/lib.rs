//! Parameter-space exploration for stochastic simulation models.
//!
//! A model is seen only through an [`Evaluator`](evaluator::Evaluator): it
//! receives batches of [`Assignment`](param::Assignment)s and returns named
//! output series, one value per replicate. On top of that the crate
//! provides:
//!
//! - **Sampling** ([`sampling`]): exhaustive grids, uniform, factorial,
//!   Latin hypercube, orthogonal, Morris trajectories, Saltelli matrices and
//!   designs read from CSV files or record lists.
//! - **Calibration** ([`ga`]): a genetic algorithm over the discretized
//!   parameter space, with an explicit [`FitnessCache`](cache::FitnessCache)
//!   guaranteeing that no assignment is evaluated twice within a run, and
//!   local search ([`optim`]): hill climbing, simulated annealing, tabu and
//!   reactive tabu search over the same cache.
//! - **Sensitivity analysis** ([`sensitivity`]): Morris elementary effects,
//!   Sobol indices and the β^KU distribution-based index.
//! - **Stochasticity analysis** ([`stochasticity`]): how many replicates an
//!   output needs, by coefficient of variation, standard error, critical
//!   effect size and power test.
//!
//! # Architecture
//!
//! Everything is a library call; no logging subscriber, thread pool or
//! global state is installed. Randomness flows from one seeded generator per
//! run (see [`random`]), so a fixed seed and a deterministic evaluator
//! reproduce a run exactly. Batch evaluation may run in parallel inside an
//! evaluator (`parallel` feature), never inside the engine.

pub mod cache;
pub mod error;
pub mod evaluator;
pub mod ga;
pub mod optim;
pub mod param;
pub mod random;
pub mod sampling;
pub mod sensitivity;
pub mod stats;
pub mod stochasticity;
pub mod table;

pub use error::{Error, Result};
